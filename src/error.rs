//! Error types for video-metrics operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for video-metrics operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while measuring a sequence.
///
/// Running out of input is not an error: a short or empty read ends the
/// sequence and is reported through [`crate::reader::ReadOutcome`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Pixel format code is not one this crate can lay out.
    #[error("Unsupported format: {0} (only 1 = 4:2:0 planar is supported)")]
    UnsupportedFormat(i64),

    /// Frame geometry cannot be allocated for the requested format.
    #[error("Invalid dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        /// Requested luma width.
        width: usize,
        /// Requested luma height.
        height: usize,
        /// Why the geometry was rejected.
        reason: &'static str,
    },

    /// One of the input streams could not be opened.
    #[error("Couldn't open stream {path}: {source}")]
    StreamOpen {
        /// Path of the stream that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration enables no metric at all.
    #[error("No metric selected (available: psnr, ssim, ms_ssim, mse)")]
    NoMetricSelected,

    /// Two sample buffers handed to a metric differ in geometry.
    #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        /// Reference dimensions (width, height).
        expected: (usize, usize),
        /// Test dimensions (width, height).
        actual: (usize, usize),
    },

    /// I/O error wrapper.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
