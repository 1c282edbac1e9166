//! Per-channel Poisson solve and compositing.
//!
//! For every channel the right-hand side is the unspecialized Laplacian of the
//! aligned source (scaled by the blend strength) inside the mask, and the raw
//! target value outside it:
//!
//! ```text
//! b = strength * (A0 * source)
//! b[i] = target[i]            where mask[i] is false
//! A x = b
//! ```
//!
//! The solution is clamped to `[0, 255]`, rounded, and written back into the
//! matching channel of a copy of the target.

use image::{ImageBuffer, Pixel};
use tracing::debug;

use crate::error::{Error, Result};
use crate::mask::Mask;
use crate::operator::{EdgePolicy, PoissonSystem};
use crate::solver::{self, SolveError, SolverConfig, SolverKind};

/// Integer translation applied to the source before blending.
///
/// A source pixel at `(x, y)` lands on target pixel `(x + dx, y + dy)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Offset {
    /// Horizontal shift in pixels.
    pub dx: i32,
    /// Vertical shift in pixels.
    pub dy: i32,
}

impl Offset {
    /// Create an offset.
    #[must_use]
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

impl From<(i32, i32)> for Offset {
    fn from((dx, dy): (i32, i32)) -> Self {
        Self { dx, dy }
    }
}

/// Numerical parameters of a blend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendParams {
    /// Scale applied to the source's Laplacian. `1.0` clones the source
    /// gradients as-is; `0.0` yields a membrane interpolating the boundary.
    pub strength: f64,
    /// Treatment of unselected pixels on the canvas edge.
    pub edge_policy: EdgePolicy,
    /// Linear solver settings.
    pub solver: SolverConfig,
}

impl Default for BlendParams {
    fn default() -> Self {
        Self {
            strength: 1.0,
            edge_policy: EdgePolicy::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl BlendParams {
    /// Check every parameter is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStrength`] for a non-finite strength and
    /// [`Error::InvalidOption`] for out-of-range solver settings.
    pub fn validate(&self) -> Result<()> {
        if !self.strength.is_finite() {
            return Err(Error::InvalidStrength(self.strength));
        }
        if !(self.solver.tolerance.is_finite() && self.solver.tolerance > 0.0) {
            return Err(Error::InvalidOption(format!(
                "tolerance must be positive, got {}",
                self.solver.tolerance
            )));
        }
        if self.solver.max_iterations == 0 {
            return Err(Error::InvalidOption(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if let SolverKind::GaussSeidel { omega } = self.solver.kind {
            if !(omega > 0.0 && omega < 2.0) {
                return Err(Error::InvalidOption(format!(
                    "relaxation factor must lie in (0, 2), got {omega}"
                )));
            }
        }
        Ok(())
    }
}

/// Translate `source` onto a `width` x `height` canvas.
///
/// Canvas pixels with no source pixel behind them are zero.
#[must_use]
pub fn align_source<P>(
    source: &ImageBuffer<P, Vec<u8>>,
    width: u32,
    height: u32,
    offset: Offset,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let zeros = [0u8; 16];
    let empty = *P::from_slice(&zeros[..usize::from(P::CHANNEL_COUNT)]);
    let (sw, sh) = (i64::from(source.width()), i64::from(source.height()));

    ImageBuffer::from_fn(width, height, |x, y| {
        let sx = i64::from(x) - i64::from(offset.dx);
        let sy = i64::from(y) - i64::from(offset.dy);
        if (0..sw).contains(&sx) && (0..sh).contains(&sy) {
            // Both coordinates were just bounds-checked against u32 dimensions.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let (sx, sy) = (sx as u32, sy as u32);
            *source.get_pixel(sx, sy)
        } else {
            empty
        }
    })
}

/// Right-hand side for one channel.
///
/// # Panics
///
/// Panics if `source` or `target` is not one value per pixel.
#[must_use]
pub fn guidance(
    system: &PoissonSystem<'_>,
    source: &[f64],
    target: &[f64],
    strength: f64,
) -> Vec<f64> {
    assert_eq!(
        target.len(),
        system.len(),
        "target plane length must match the grid"
    );
    let mut b = system.base().mul_vec(source);
    for ((bi, &ti), &inside) in b.iter_mut().zip(target).zip(system.mask().as_slice()) {
        *bi = if inside { strength * *bi } else { ti };
    }
    b
}

/// Solve one channel and return the unclamped solution.
///
/// `source` must already be aligned to the target canvas. The initial guess
/// is the source inside the mask and the target outside it.
///
/// # Errors
///
/// Returns a [`SolveError`] if the planes have the wrong length or the solver
/// fails to converge.
pub fn solve_channel(
    system: &PoissonSystem<'_>,
    source: &[f64],
    target: &[f64],
    strength: f64,
    config: &SolverConfig,
) -> std::result::Result<Vec<f64>, SolveError> {
    let n = system.len();
    for len in [source.len(), target.len()] {
        if len != n {
            return Err(SolveError::DimensionMismatch {
                rows: n,
                cols: n,
                len,
            });
        }
    }

    let b = guidance(system, source, target, strength);
    let x0: Vec<f64> = system
        .mask()
        .as_slice()
        .iter()
        .zip(source.iter().zip(target))
        .map(|(&inside, (&s, &t))| if inside { s } else { t })
        .collect();

    solver::solve(system.specialized(), &b, Some(&x0), config).map(|sol| sol.x)
}

/// Blend `source` into `target` over the pixels selected by `mask`.
///
/// Returns a new image with the target's dimensions and pixel type. Every
/// channel is solved independently against the same pair of operators.
///
/// # Errors
///
/// - [`Error::InvalidDimensions`] if the target has a zero dimension.
/// - [`Error::ShapeMismatch`] if the mask does not match the target.
/// - [`Error::InvalidStrength`] / [`Error::InvalidOption`] for bad parameters.
/// - [`Error::Solve`] if any channel's solve fails.
///
/// All checks run before any matrix is built.
#[tracing::instrument(
    skip_all,
    fields(width = target.width(), height = target.height(), channels = P::CHANNEL_COUNT)
)]
pub fn blend<P>(
    source: &ImageBuffer<P, Vec<u8>>,
    target: &ImageBuffer<P, Vec<u8>>,
    mask: &Mask,
    offset: Offset,
    params: &BlendParams,
) -> Result<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8> + Sync,
{
    let (width, height) = target.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    if mask.dimensions() != (width, height) {
        return Err(Error::ShapeMismatch {
            mask_width: mask.width(),
            mask_height: mask.height(),
            target_width: width,
            target_height: height,
        });
    }
    params.validate()?;

    let aligned = align_source(source, width, height, offset);
    let system = PoissonSystem::new(mask, params.edge_policy)?;
    let channels = usize::from(P::CHANNEL_COUNT);
    debug!(selected = mask.count(), ?offset, "blending");

    let solve_one = |c: usize| -> Result<Vec<u8>> {
        let src = channel_plane(&aligned, c);
        let tgt = channel_plane(target, c);
        let x = solve_channel(&system, &src, &tgt, params.strength, &params.solver)
            .map_err(|source| Error::Solve { channel: c, source })?;
        debug!(channel = c, "channel solved");
        Ok(quantize(&x))
    };

    let planes = solve_planes(channels, solve_one)?;
    Ok(recombine(target, &planes))
}

#[cfg(feature = "parallel")]
fn solve_planes<F>(channels: usize, solve_one: F) -> Result<Vec<Vec<u8>>>
where
    F: Fn(usize) -> Result<Vec<u8>> + Send + Sync,
{
    use rayon::prelude::*;
    (0..channels).into_par_iter().map(solve_one).collect()
}

#[cfg(not(feature = "parallel"))]
fn solve_planes<F>(channels: usize, solve_one: F) -> Result<Vec<Vec<u8>>>
where
    F: Fn(usize) -> Result<Vec<u8>>,
{
    solve_planes_sequential(channels, solve_one)
}

/// Solves channels in order and stops at the first failure.
#[cfg_attr(all(feature = "parallel", not(test)), allow(dead_code))]
fn solve_planes_sequential<F>(channels: usize, solve_one: F) -> Result<Vec<Vec<u8>>>
where
    F: Fn(usize) -> Result<Vec<u8>>,
{
    (0..channels).map(solve_one).collect()
}

/// Writes each plane into its channel of a copy of `target`.
fn recombine<P>(target: &ImageBuffer<P, Vec<u8>>, planes: &[Vec<u8>]) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let channels = usize::from(P::CHANNEL_COUNT);
    let mut out = target.clone();
    let raw: &mut [u8] = &mut out;
    for (c, plane) in planes.iter().enumerate() {
        for (px, &v) in raw.chunks_exact_mut(channels).zip(plane) {
            px[c] = v;
        }
    }
    out
}

fn channel_plane<P>(img: &ImageBuffer<P, Vec<u8>>, c: usize) -> Vec<f64>
where
    P: Pixel<Subpixel = u8>,
{
    img.pixels().map(|p| f64::from(p.channels()[c])).collect()
}

fn quantize(x: &[f64]) -> Vec<u8> {
    // Clamped to [0, 255] first, so the cast is exact.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let to_u8 = |v: f64| v.clamp(0.0, 255.0).round() as u8;
    x.iter().map(|&v| to_u8(v)).collect()
}
