//! Error types for the poisson-blend crate.

use crate::solver::SolveError;

/// Errors that can occur while building, solving, or compositing a blend.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The canvas has a zero dimension.
    #[error("invalid canvas dimensions {width}x{height}")]
    InvalidDimensions {
        /// Canvas width in pixels.
        width: u32,
        /// Canvas height in pixels.
        height: u32,
    },

    /// The mask does not cover the target canvas exactly.
    #[error(
        "mask is {mask_width}x{mask_height} but target is {target_width}x{target_height}"
    )]
    ShapeMismatch {
        /// Mask width in pixels.
        mask_width: u32,
        /// Mask height in pixels.
        mask_height: u32,
        /// Target width in pixels.
        target_width: u32,
        /// Target height in pixels.
        target_height: u32,
    },

    /// The blend strength is NaN or infinite.
    #[error("blend strength must be finite, got {0}")]
    InvalidStrength(f64),

    /// A blend or solver option is out of range.
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// The linear solve for one channel failed.
    #[error("solve failed on channel {channel}")]
    Solve {
        /// Zero-based channel index.
        channel: usize,
        /// What the solver reported.
        #[source]
        source: SolveError,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn error_display_messages() {
        let io_err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io_err.to_string().contains("gone"));

        let unsupported = Error::UnsupportedFormat("tiff".to_string());
        assert!(unsupported.to_string().contains("tiff"));

        let mismatch = Error::ShapeMismatch {
            mask_width: 3,
            mask_height: 5,
            target_width: 4,
            target_height: 4,
        };
        let msg = mismatch.to_string();
        assert!(msg.contains("3x5"));
        assert!(msg.contains("4x4"));

        let dims = Error::InvalidDimensions {
            width: 0,
            height: 7,
        };
        assert!(dims.to_string().contains("0x7"));
    }

    #[test]
    fn solve_error_is_exposed_as_source() {
        let err = Error::Solve {
            channel: 2,
            source: SolveError::NotConverged {
                iterations: 10,
                residual: 0.5,
            },
        };
        assert!(err.to_string().contains("channel 2"));
        let source = err.source().unwrap();
        assert!(source.to_string().contains("10 iterations"));
    }
}
