//! Binary selection masks.
//!
//! A mask marks which target pixels are re-synthesized from the source's
//! gradients. Grayscale and alpha inputs are thresholded: any value above the
//! threshold (non-zero by default) counts as inside.

use image::{GrayImage, RgbaImage};

/// An H x W grid of "inside selection" flags, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Mask {
    /// Create an empty mask (nothing selected).
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, false)
    }

    /// Create a mask with every cell set to `value`.
    #[must_use]
    pub fn filled(width: u32, height: u32, value: bool) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    /// Create a mask from a predicate over `(x, y)`.
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Threshold a grayscale image: any non-zero pixel is inside.
    #[must_use]
    pub fn from_luma(img: &GrayImage) -> Self {
        Self::from_luma_threshold(img, 0)
    }

    /// Threshold a grayscale image: pixels strictly above `threshold` are inside.
    #[must_use]
    pub fn from_luma_threshold(img: &GrayImage, threshold: u8) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            data: img.pixels().map(|p| p[0] > threshold).collect(),
        }
    }

    /// Use an RGBA image's alpha channel: any non-zero alpha is inside.
    #[must_use]
    pub fn from_alpha(img: &RgbaImage) -> Self {
        Self::from_alpha_threshold(img, 0)
    }

    /// Use an RGBA image's alpha channel: alpha strictly above `threshold` is inside.
    #[must_use]
    pub fn from_alpha_threshold(img: &RgbaImage, threshold: u8) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            data: img.pixels().map(|p| p[3] > threshold).collect(),
        }
    }

    /// Mask width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Mask height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether `(x, y)` is inside the selection. Out-of-bounds reads are outside.
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.data[self.index(x, y)]
    }

    /// Set the flag at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the mask.
    pub fn set(&mut self, x: u32, y: u32, inside: bool) {
        assert!(
            x < self.width && y < self.height,
            "({x}, {y}) outside {}x{} mask",
            self.width,
            self.height
        );
        let i = self.index(x, y);
        self.data[i] = inside;
    }

    /// Row-major flags, one per pixel.
    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.data
    }

    /// Number of selected pixels.
    #[must_use]
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}
