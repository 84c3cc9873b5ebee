//! Frame evaluation, sequence driving and reporting.
//!
//! - [`frame::evaluate`]: weighted per-frame scores for a picture pair
//! - [`session::Sequence`]: reads two streams in lockstep and accumulates
//! - [`session::SequenceConfig`]: geometry, format, metrics and frame ceiling
//! - [`report`]: summaries, stop reasons and frame observers

pub mod frame;
pub mod report;
pub mod session;

pub use frame::{FrameEvaluation, FrameScore, evaluate};
pub use report::{
    CsvFrameWriter, FrameObserver, MetricSummary, SequenceReport, StopReason, Stream,
    VerbosePrinter,
};
pub use session::{Sequence, SequenceConfig, SequenceConfigBuilder, SequenceState};
