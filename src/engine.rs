//! File-level blending front end.

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, ImageFormat, Pixel, RgbImage, RgbaImage};
use tracing::{debug, info};

use crate::blend::{self, BlendParams, Offset};
use crate::error::{Error, Result};
use crate::mask::Mask;

/// Options controlling how a blend job is assembled and solved.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Numerical parameters passed to the core.
    pub params: BlendParams,
    /// Translation applied to the source.
    pub offset: Offset,
    /// Resize the target onto the source canvas when their sizes differ.
    pub resize_target: bool,
    /// Mask and alpha values strictly above this count as selected.
    pub mask_threshold: u8,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            params: BlendParams::default(),
            offset: Offset::default(),
            resize_target: true,
            mask_threshold: 0,
            verbose: false,
            quiet: false,
        }
    }
}

/// Input and output paths of one blend.
#[derive(Debug, Clone)]
pub struct BlendJob {
    /// Source image. Its alpha channel is the mask when `mask` is `None`.
    pub source: PathBuf,
    /// Target image.
    pub target: PathBuf,
    /// Optional grayscale mask image.
    pub mask: Option<PathBuf>,
    /// Where to write the composite.
    pub output: PathBuf,
}

/// Result of processing a single blend job.
#[derive(Debug)]
pub struct ProcessResult {
    /// Output path of the job.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Whether the job was skipped (mask selects nothing).
    pub skipped: bool,
    /// Number of selected pixels.
    pub selected: usize,
    /// Human-readable status message.
    pub message: String,
}

/// Runs blends with a fixed set of options.
///
/// The engine holds no per-image state; one instance can serve any number of
/// jobs, from any number of threads.
#[derive(Debug, Clone)]
pub struct BlendEngine {
    options: ProcessOptions,
}

impl BlendEngine {
    /// Create an engine after validating `options`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStrength`] or [`Error::InvalidOption`] if the
    /// blend parameters are unusable.
    pub fn new(options: ProcessOptions) -> Result<Self> {
        options.params.validate()?;
        Ok(Self { options })
    }

    /// The options this engine was built with.
    #[must_use]
    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    /// Blend in memory with the engine's offset and parameters.
    ///
    /// # Errors
    ///
    /// See [`blend::blend`].
    pub fn blend<P>(
        &self,
        source: &ImageBuffer<P, Vec<u8>>,
        target: &ImageBuffer<P, Vec<u8>>,
        mask: &Mask,
    ) -> Result<ImageBuffer<P, Vec<u8>>>
    where
        P: Pixel<Subpixel = u8> + Sync,
    {
        blend::blend(source, target, mask, self.options.offset, &self.options.params)
    }

    /// Blend a cut-out layer onto a background.
    ///
    /// The layer's alpha channel is the mask and its color channels are the
    /// source. The background is resized to the layer's canvas first unless
    /// [`ProcessOptions::resize_target`] is off.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] when sizes differ and resizing is off,
    /// otherwise whatever [`blend::blend`] returns.
    pub fn blend_layer(&self, layer: &RgbaImage, background: &RgbImage) -> Result<RgbImage> {
        let mask = Mask::from_alpha_threshold(layer, self.options.mask_threshold);
        self.blend_layer_masked(layer, background, &mask)
    }

    /// Blend the layer's color channels over `mask`, with the background
    /// fitted to the mask's canvas.
    fn blend_layer_masked(
        &self,
        layer: &RgbaImage,
        background: &RgbImage,
        mask: &Mask,
    ) -> Result<RgbImage> {
        let source = RgbImage::from_fn(layer.width(), layer.height(), |x, y| {
            layer.get_pixel(x, y).to_rgb()
        });
        let target = self.fit_target(background, mask.width(), mask.height())?;
        self.blend(&source, &target, mask)
    }

    /// Load, blend, and save one job.
    ///
    /// Returns a [`ProcessResult`] indicating success, skip, or failure.
    #[must_use]
    pub fn process_files(&self, job: &BlendJob) -> ProcessResult {
        let mut result = ProcessResult {
            path: job.output.clone(),
            success: false,
            skipped: false,
            selected: 0,
            message: String::new(),
        };

        let started = Instant::now();
        let blended = match self.run_job(job, &mut result) {
            Ok(Some(img)) => img,
            Ok(None) => return result,
            Err(e) => {
                result.message = e.to_string();
                return result;
            }
        };

        if let Some(parent) = job.output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    result.message = format!("Failed to create output directory: {e}");
                    return result;
                }
            }
        }

        match save_image(&blended, &job.output) {
            Ok(()) => {
                result.success = true;
                result.message = format!("Blended in {:.2?}", started.elapsed());
                info!(output = %job.output.display(), selected = result.selected, "blend saved");
            }
            Err(e) => {
                result.message = format!("Failed to save: {e}");
            }
        }

        result
    }

    /// Load inputs and blend. `Ok(None)` means the job was skipped.
    fn run_job(&self, job: &BlendJob, result: &mut ProcessResult) -> Result<Option<RgbImage>> {
        if !is_supported_image(&job.output) {
            return Err(Error::UnsupportedFormat(format!(
                "{} (expected jpg, png, webp or bmp)",
                job.output.display()
            )));
        }

        let layer = image::open(&job.source)?.to_rgba8();
        let background = image::open(&job.target)?.to_rgb8();
        debug!(
            source = %job.source.display(),
            target = %job.target.display(),
            "inputs loaded"
        );

        let mask = match &job.mask {
            Some(path) => load_mask(path, self.options.mask_threshold)?,
            None => Mask::from_alpha_threshold(&layer, self.options.mask_threshold),
        };
        result.selected = mask.count();
        if result.selected == 0 {
            result.skipped = true;
            result.success = true;
            result.message = "Mask selects no pixels".to_string();
            return Ok(None);
        }

        self.blend_layer_masked(&layer, &background, &mask).map(Some)
    }

    fn fit_target(&self, background: &RgbImage, width: u32, height: u32) -> Result<RgbImage> {
        if background.dimensions() == (width, height) {
            return Ok(background.clone());
        }
        if !self.options.resize_target {
            return Err(Error::ShapeMismatch {
                mask_width: width,
                mask_height: height,
                target_width: background.width(),
                target_height: background.height(),
            });
        }
        debug!(
            from_width = background.width(),
            from_height = background.height(),
            width,
            height,
            "resizing target"
        );
        Ok(imageops::resize(background, width, height, FilterType::CatmullRom))
    }
}

/// Load a grayscale mask image; values above `threshold` are selected.
///
/// # Errors
///
/// Returns [`Error::Image`] if the file cannot be decoded.
pub fn load_mask(path: &Path, threshold: u8) -> Result<Mask> {
    let img = image::open(path)?.to_luma8();
    Ok(Mask::from_luma_threshold(&img, threshold))
}

/// Check if a path has an extension [`save_image`] can write.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Save an RGB image with format-specific quality settings.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &RgbImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    match format {
        ImageFormat::Jpeg => {
            let file = std::fs::File::create(path)?;
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 100);
            encoder.encode_image(&DynamicImage::ImageRgb8(img.clone()))?;
        }
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => {
            img.save_with_format(path, format)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}

/// Generate a default output path from a target path.
///
/// Example: `"beach.jpg"` becomes `"beach_blended.jpg"`.
#[must_use]
pub fn default_output_path(target: &Path) -> PathBuf {
    let stem = target.file_stem().unwrap_or_default().to_string_lossy();
    let ext = target.extension().unwrap_or_default().to_string_lossy();
    let parent = target.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_blended.{ext}"))
}
