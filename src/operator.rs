//! Discrete Poisson operator construction.
//!
//! The base operator is the negated 5-point Laplacian over an H x W grid,
//! flattened row-major (`k = x + y * W`):
//!
//! ```text
//! A[k, k]     =  4
//! A[k, k - 1] = -1   if x > 0
//! A[k, k + 1] = -1   if x < W - 1
//! A[k, k - W] = -1   if y > 0
//! A[k, k + W] = -1   if y < H - 1
//! ```
//!
//! Horizontal neighbors never couple across the end of a grid row, so the
//! matrix is block-tridiagonal rather than toroidal.
//!
//! Specialization rewrites the rows of unselected pixels into identity rows
//! so those pixels are pinned to the target. Only strictly interior pixels are
//! rewritten by default; see [`EdgePolicy`].

use tracing::debug;

use crate::error::{Error, Result};
use crate::mask::Mask;
use crate::sparse::CsrMatrix;

/// How unselected pixels on the outermost ring of the canvas are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EdgePolicy {
    /// Border-ring rows always keep the Laplacian, whatever the mask says.
    ///
    /// Unselected edge pixels therefore solve `4x - neighbors = target`
    /// instead of copying the target, which can shift edge values when the
    /// canvas is small or the mask runs up to the border.
    #[default]
    Laplacian,
    /// Unselected border-ring pixels are pinned to the target like every
    /// other unselected pixel.
    PinUnmasked,
}

/// Build the Laplacian operator for a `height` x `width` grid.
///
/// # Errors
///
/// Returns [`Error::InvalidDimensions`] if either dimension is zero.
pub fn build_base_operator(height: u32, width: u32) -> Result<CsrMatrix> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }

    let w = width as usize;
    let h = height as usize;
    let n = w * h;

    let rows = (0..n).map(|k| {
        let (x, y) = (k % w, k / w);
        let mut row = Vec::with_capacity(5);
        if y > 0 {
            row.push((k - w, -1.0));
        }
        if x > 0 {
            row.push((k - 1, -1.0));
        }
        row.push((k, 4.0));
        if x + 1 < w {
            row.push((k + 1, -1.0));
        }
        if y + 1 < h {
            row.push((k + w, -1.0));
        }
        row
    });

    let a = CsrMatrix::from_rows(n, rows);
    debug!(width, height, nnz = a.nnz(), "built base Poisson operator");
    Ok(a)
}

/// Return a copy of `base` with unselected pixels turned into identity rows.
///
/// # Panics
///
/// Panics if `base` does not have one row per mask cell.
#[must_use]
pub fn specialize_for_mask(base: &CsrMatrix, mask: &Mask, policy: EdgePolicy) -> CsrMatrix {
    let mut a = base.clone();
    specialize_in_place(&mut a, mask, policy);
    a
}

/// In-place variant of [`specialize_for_mask`].
///
/// # Panics
///
/// Panics if `a` does not have one row per mask cell.
pub fn specialize_in_place(a: &mut CsrMatrix, mask: &Mask, policy: EdgePolicy) {
    let (width, height) = mask.dimensions();
    assert_eq!(
        a.rows(),
        width as usize * height as usize,
        "operator rows must match mask cells"
    );

    let mut pinned = 0usize;
    for y in 0..height {
        for x in 0..width {
            if mask.contains(x, y) {
                continue;
            }
            let on_ring = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
            if on_ring && policy == EdgePolicy::Laplacian {
                continue;
            }
            a.pin_row(y as usize * width as usize + x as usize);
            pinned += 1;
        }
    }
    debug!(pinned, ?policy, "specialized operator for mask");
}

/// The pair of operators one blend needs, built once and shared by every
/// channel.
///
/// `base` produces the guidance field from the source; `specialized` is the
/// system actually solved.
#[derive(Debug, Clone)]
pub struct PoissonSystem<'a> {
    mask: &'a Mask,
    base: CsrMatrix,
    specialized: CsrMatrix,
}

impl<'a> PoissonSystem<'a> {
    /// Build both operators for `mask`'s canvas.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if the mask has a zero dimension.
    pub fn new(mask: &'a Mask, policy: EdgePolicy) -> Result<Self> {
        let base = build_base_operator(mask.height(), mask.width())?;
        let specialized = specialize_for_mask(&base, mask, policy);
        Ok(Self {
            mask,
            base,
            specialized,
        })
    }

    /// The unspecialized Laplacian.
    #[must_use]
    pub fn base(&self) -> &CsrMatrix {
        &self.base
    }

    /// The mask-specialized system matrix.
    #[must_use]
    pub fn specialized(&self) -> &CsrMatrix {
        &self.specialized
    }

    /// The mask the system was specialized for.
    #[must_use]
    pub fn mask(&self) -> &Mask {
        self.mask
    }

    /// Number of unknowns (`H * W`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.base.rows()
    }

    /// Always false; a system has at least one pixel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base.rows() == 0
    }
}
