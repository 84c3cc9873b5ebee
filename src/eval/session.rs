//! Sequence driver: reads aligned frame pairs and accumulates metrics.
//!
//! A [`Sequence`] moves through three states. It starts in
//! [`SequenceState::Init`] with both pictures allocated, enters
//! [`SequenceState::Streaming`] on the first call to
//! [`Sequence::next_frame`], and is consumed by [`Sequence::finalize`], which
//! yields the [`SequenceReport`].

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::eval::frame::{FrameEvaluation, evaluate};
use crate::eval::report::{FrameObserver, SequenceReport, StopReason, Stream};
use crate::metrics::MetricKind;
use crate::picture::{Picture, PixelFormat};
use crate::reader::{FrameReader, open_stream};
use crate::registry::MetricRegistry;

/// Configuration for measuring one pair of streams.
#[derive(Debug, Clone)]
pub struct SequenceConfig {
    /// Pixel layout of both streams.
    pub format: PixelFormat,

    /// Luma width.
    pub width: usize,

    /// Luma height.
    pub height: usize,

    /// Metrics to compute. At least one is required.
    pub metrics: Vec<MetricKind>,

    /// Stop after this many frames. `None` reads until a stream ends.
    pub max_frames: Option<u64>,
}

impl SequenceConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> SequenceConfigBuilder {
        SequenceConfigBuilder::default()
    }

    /// Check everything that can be checked without touching the streams.
    pub fn validate(&self) -> Result<()> {
        if self.metrics.is_empty() {
            return Err(Error::NoMetricSelected);
        }
        self.format.validate(self.width, self.height)
    }

    /// Bytes per frame in each stream.
    #[must_use]
    pub fn frame_size(&self) -> usize {
        self.format.frame_size(self.width, self.height)
    }
}

/// Builder for [`SequenceConfig`].
#[derive(Debug, Default)]
pub struct SequenceConfigBuilder {
    format: Option<PixelFormat>,
    width: usize,
    height: usize,
    metrics: Vec<MetricKind>,
    max_frames: Option<u64>,
}

impl SequenceConfigBuilder {
    /// Set the pixel format (default 4:2:0 planar).
    #[must_use]
    pub fn format(mut self, format: PixelFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the luma geometry.
    #[must_use]
    pub fn dimensions(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Add a metric.
    #[must_use]
    pub fn metric(mut self, metric: MetricKind) -> Self {
        if !self.metrics.contains(&metric) {
            self.metrics.push(metric);
        }
        self
    }

    /// Add several metrics.
    #[must_use]
    pub fn metrics(self, metrics: impl IntoIterator<Item = MetricKind>) -> Self {
        metrics.into_iter().fold(self, Self::metric)
    }

    /// Set the frame ceiling.
    #[must_use]
    pub fn max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> SequenceConfig {
        SequenceConfig {
            format: self.format.unwrap_or(PixelFormat::Yuv420),
            width: self.width,
            height: self.height,
            metrics: self.metrics,
            max_frames: self.max_frames,
        }
    }
}

/// Lifecycle of a [`Sequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    /// Pictures allocated, nothing read yet.
    Init,
    /// Frames are being read and evaluated.
    Streaming,
    /// A stream ended or the frame ceiling was reached.
    Stopped(StopReason),
}

/// Reads two synchronized streams and accumulates metrics over them.
///
/// Both pictures are allocated once and overwritten for every frame.
#[derive(Debug)]
pub struct Sequence<A, B> {
    reader_a: FrameReader<A>,
    reader_b: FrameReader<B>,
    picture_a: Picture,
    picture_b: Picture,
    registry: MetricRegistry,
    max_frames: Option<u64>,
    frames: u64,
    state: SequenceState,
}

impl Sequence<BufReader<File>, BufReader<File>> {
    /// Validate `config`, then open both stream files.
    ///
    /// Configuration errors are reported before either file is opened.
    pub fn open(
        config: &SequenceConfig,
        path_a: impl AsRef<Path>,
        path_b: impl AsRef<Path>,
    ) -> Result<Self> {
        config.validate()?;
        let reader_a = open_stream(path_a)?;
        let reader_b = open_stream(path_b)?;
        Self::from_readers(config, reader_a, reader_b)
    }
}

impl<A: Read, B: Read> Sequence<A, B> {
    /// Set up a sequence over two byte streams.
    pub fn new(config: &SequenceConfig, a: A, b: B) -> Result<Self> {
        Self::from_readers(config, FrameReader::new(a), FrameReader::new(b))
    }

    fn from_readers(
        config: &SequenceConfig,
        reader_a: FrameReader<A>,
        reader_b: FrameReader<B>,
    ) -> Result<Self> {
        if config.metrics.is_empty() {
            return Err(Error::NoMetricSelected);
        }
        let picture_a = Picture::allocate(config.format, config.width, config.height)?;
        let picture_b = Picture::allocate(config.format, config.width, config.height)?;

        Ok(Self {
            reader_a,
            reader_b,
            picture_a,
            picture_b,
            registry: MetricRegistry::with_enabled(&config.metrics),
            max_frames: config.max_frames,
            frames: 0,
            state: SequenceState::Init,
        })
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SequenceState {
        self.state
    }

    /// Frames evaluated so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Running accumulators.
    #[must_use]
    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Read and evaluate the next aligned frame pair.
    ///
    /// Returns `None` once either stream runs out, fails to read, or the
    /// frame ceiling is reached; a frame that could not be read completely
    /// from both streams is never evaluated.
    pub fn next_frame(&mut self) -> Result<Option<FrameEvaluation>> {
        match self.state {
            SequenceState::Stopped(_) => return Ok(None),
            SequenceState::Init => self.state = SequenceState::Streaming,
            SequenceState::Streaming => {}
        }

        if self.max_frames.is_some_and(|limit| self.frames >= limit) {
            return Ok(self.stop(StopReason::FrameLimit));
        }

        let outcome = match self.reader_a.read_frame(&mut self.picture_a) {
            Ok(outcome) => outcome,
            Err(err) => return Ok(self.read_failed(Stream::A, &err)),
        };
        if let Some(reason) = StopReason::from_outcome(Stream::A, outcome) {
            return Ok(self.stop(reason));
        }
        let outcome = match self.reader_b.read_frame(&mut self.picture_b) {
            Ok(outcome) => outcome,
            Err(err) => return Ok(self.read_failed(Stream::B, &err)),
        };
        if let Some(reason) = StopReason::from_outcome(Stream::B, outcome) {
            return Ok(self.stop(reason));
        }

        let evaluation = evaluate(
            &mut self.registry,
            &self.picture_a,
            &self.picture_b,
            self.frames,
        )?;
        self.frames += 1;
        Ok(Some(evaluation))
    }

    // A failed read ends the sequence like a short one; frames already
    // scored still count.
    fn read_failed(&mut self, stream: Stream, err: &Error) -> Option<FrameEvaluation> {
        warn!(?stream, frame = self.frames, error = %err, "read failed");
        self.stop(StopReason::ReadError(stream))
    }

    fn stop(&mut self, reason: StopReason) -> Option<FrameEvaluation> {
        info!(frames = self.frames, ?reason, "streaming stopped");
        self.state = SequenceState::Stopped(reason);
        None
    }

    /// Stream to the end, handing every frame to `observer`, then finalize.
    pub fn run(mut self, mut observer: impl FrameObserver) -> Result<SequenceReport> {
        while let Some(frame) = self.next_frame()? {
            observer.on_frame(&frame)?;
        }
        Ok(self.finalize())
    }

    /// Compute averages and produce the report.
    ///
    /// May be called before the streams are exhausted, in which case the
    /// report has no stop reason.
    pub fn finalize(mut self) -> SequenceReport {
        let metrics = self.registry.finalize();
        let stop_reason = match self.state {
            SequenceState::Stopped(reason) => Some(reason),
            SequenceState::Init | SequenceState::Streaming => None,
        };

        for summary in &metrics {
            debug!(metric = %summary.metric, average = ?summary.average, "finalized");
        }
        info!(frames = self.frames, "sequence finalized");

        SequenceReport {
            format: self.picture_a.format(),
            width: self.picture_a.width(),
            height: self.picture_a.height(),
            frames: self.frames,
            stop_reason,
            metrics,
            timestamp: chrono::Utc::now(),
        }
    }
}
