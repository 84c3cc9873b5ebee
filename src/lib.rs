//! # video-metrics
//!
//! Objective quality metrics (PSNR, SSIM, MS-SSIM, MSE) between two raw
//! planar YUV video streams of identical geometry.
//!
//! Each frame is measured per plane and the three plane scores are combined
//! by sample count, so that 4:2:0 chroma weighs in proportion to its size.
//! Per-frame scores are averaged over the sequence.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use video_metrics::{MetricKind, Sequence, SequenceConfig, VerbosePrinter};
//!
//! let config = SequenceConfig::builder()
//!     .dimensions(1920, 1080)
//!     .metrics([MetricKind::Psnr, MetricKind::Ssim])
//!     .build();
//!
//! let sequence = Sequence::open(&config, "reference.yuv", "encoded.yuv")?;
//! let report = sequence.run(VerbosePrinter::new(std::io::stdout()))?;
//! for line in report.summary_lines() {
//!     println!("{line}");
//! }
//! # Ok::<(), video_metrics::Error>(())
//! ```
//!
//! ## Modules
//!
//! - [`error`]: Error types for the library
//! - [`picture`]: Plane and picture buffers
//! - [`metrics`]: The metric functions and catalogue
//! - [`registry`]: Selected metrics and their running accumulators
//! - [`reader`]: Raw frame reading
//! - [`eval`]: Frame evaluation, the sequence driver and reports

pub mod error;
pub mod eval;
pub mod metrics;
pub mod picture;
pub mod reader;
pub mod registry;

// Re-export commonly used types
pub use error::{Error, Result};
pub use eval::{
    CsvFrameWriter, FrameEvaluation, FrameObserver, FrameScore, MetricSummary, Sequence,
    SequenceConfig, SequenceReport, SequenceState, StopReason, Stream, VerbosePrinter,
};
pub use metrics::{MetricKind, UnknownMetric};
pub use picture::{Picture, PixelFormat, Plane, PlaneKind};
pub use reader::{FrameReader, ReadOutcome, open_stream};
pub use registry::{MetricEntry, MetricRegistry, parse_metric_list};
