//! Report types and frame observers.
//!
//! The evaluator returns scores and never prints. Anything that wants to see
//! per-frame results implements [`FrameObserver`]; the sequence summary is a
//! [`SequenceReport`] that can be printed line by line or serialized to JSON.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::eval::frame::FrameEvaluation;
use crate::metrics::MetricKind;
use crate::picture::{PixelFormat, PlaneKind};
use crate::reader::ReadOutcome;

/// Which of the two input streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    /// Reference stream.
    A,
    /// Test stream.
    B,
}

/// Why streaming stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "stream", rename_all = "snake_case")]
pub enum StopReason {
    /// A stream ended at a frame boundary.
    EndOfStream(Stream),
    /// A stream ended partway through a frame.
    ShortRead(Stream),
    /// Reading from a stream failed with an I/O error.
    ReadError(Stream),
    /// The configured frame ceiling was reached.
    FrameLimit,
}

impl StopReason {
    /// Stop reason for an incomplete read, `None` for a complete one.
    #[must_use]
    pub fn from_outcome(stream: Stream, outcome: ReadOutcome) -> Option<Self> {
        match outcome {
            ReadOutcome::Complete => None,
            ReadOutcome::EndOfStream => Some(Self::EndOfStream(stream)),
            ReadOutcome::ShortRead => Some(Self::ShortRead(stream)),
        }
    }
}

/// Final result for one enabled metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Metric.
    pub metric: MetricKind,
    /// Frames that contributed to the average.
    pub frames: u64,
    /// Mean of the per-frame weighted scores, `None` if no frame was seen.
    #[serde(with = "non_finite")]
    pub average: Option<f64>,
}

impl MetricSummary {
    /// `name: average` with six decimals, or `name: no data`.
    #[must_use]
    pub fn summary_line(&self) -> String {
        match self.average {
            Some(avg) => format!("{}: {:.6}", self.metric, avg),
            None => format!("{}: no data", self.metric),
        }
    }
}

/// Summary of a whole sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceReport {
    /// Pixel layout of both streams.
    pub format: PixelFormat,
    /// Luma width.
    pub width: usize,
    /// Luma height.
    pub height: usize,
    /// Aligned frames that were evaluated.
    pub frames: u64,
    /// Why streaming stopped, if it ran to completion.
    pub stop_reason: Option<StopReason>,
    /// One entry per enabled metric, in catalogue order.
    pub metrics: Vec<MetricSummary>,
    /// When this report was generated.
    #[serde(with = "chrono_serde")]
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl SequenceReport {
    /// Summary for a metric, if it was enabled.
    #[must_use]
    pub fn metric(&self, metric: MetricKind) -> Option<&MetricSummary> {
        self.metrics.iter().find(|m| m.metric == metric)
    }

    /// One summary line per enabled metric.
    pub fn summary_lines(&self) -> impl Iterator<Item = String> + '_ {
        self.metrics.iter().map(MetricSummary::summary_line)
    }

    /// Write the summary lines.
    pub fn write_summary(&self, mut out: impl Write) -> Result<()> {
        for line in self.summary_lines() {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON report to a file.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

/// Receives every evaluated frame while a sequence streams.
pub trait FrameObserver {
    /// Called once per evaluated frame, in order.
    fn on_frame(&mut self, frame: &FrameEvaluation) -> Result<()>;
}

impl FrameObserver for () {
    fn on_frame(&mut self, _frame: &FrameEvaluation) -> Result<()> {
        Ok(())
    }
}

/// Collects every frame.
impl FrameObserver for Vec<FrameEvaluation> {
    fn on_frame(&mut self, frame: &FrameEvaluation) -> Result<()> {
        self.push(frame.clone());
        Ok(())
    }
}

impl<T: FrameObserver + ?Sized> FrameObserver for &mut T {
    fn on_frame(&mut self, frame: &FrameEvaluation) -> Result<()> {
        (**self).on_frame(frame)
    }
}

impl<T: FrameObserver> FrameObserver for Option<T> {
    fn on_frame(&mut self, frame: &FrameEvaluation) -> Result<()> {
        match self {
            Some(inner) => inner.on_frame(frame),
            None => Ok(()),
        }
    }
}

impl<A: FrameObserver, B: FrameObserver> FrameObserver for (A, B) {
    fn on_frame(&mut self, frame: &FrameEvaluation) -> Result<()> {
        self.0.on_frame(frame)?;
        self.1.on_frame(frame)
    }
}

/// Prints one line per metric per frame:
/// `3(psnr): 38.120000  Y:37.500000 U:40.250000 V:40.010000`.
///
/// Frame numbers are one-based.
#[derive(Debug)]
pub struct VerbosePrinter<W> {
    out: W,
}

impl<W: Write> VerbosePrinter<W> {
    /// Print to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FrameObserver for VerbosePrinter<W> {
    fn on_frame(&mut self, frame: &FrameEvaluation) -> Result<()> {
        for score in &frame.scores {
            let [y, u, v] = score.planes;
            writeln!(
                self.out,
                "{}({}): {:.6}  {}:{:.6} {}:{:.6} {}:{:.6}",
                frame.index + 1,
                score.metric,
                score.weighted,
                PlaneKind::Luma.label(),
                y,
                PlaneKind::ChromaU.label(),
                u,
                PlaneKind::ChromaV.label(),
                v,
            )?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct CsvRow {
    frame: u64,
    metric: MetricKind,
    weighted: f64,
    y: f64,
    u: f64,
    v: f64,
}

/// Writes per-frame scores as CSV, one row per metric per frame, with a
/// `frame,metric,weighted,y,u,v` header. Frame indices are zero-based.
pub struct CsvFrameWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvFrameWriter<File> {
    /// Create (or truncate) a CSV file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
        })
    }
}

impl<W: Write> CsvFrameWriter<W> {
    /// Write CSV to `out`.
    pub fn new(out: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(out),
        }
    }

    /// Flush and return the underlying writer.
    pub fn finish(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| crate::error::Error::Io(e.into_error()))
    }
}

impl<W: Write> FrameObserver for CsvFrameWriter<W> {
    fn on_frame(&mut self, frame: &FrameEvaluation) -> Result<()> {
        for score in &frame.scores {
            let [y, u, v] = score.planes;
            self.writer.serialize(CsvRow {
                frame: frame.index,
                metric: score.metric,
                weighted: score.weighted,
                y,
                u,
                v,
            })?;
        }
        Ok(())
    }
}

// Optional averages serialized as numbers, with infinities spelled out so
// that an identical-stream PSNR is not confused with "no data" (null).
mod non_finite {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let repr = value.map(|v| {
            if v.is_finite() {
                Repr::Number(v)
            } else if v.is_nan() {
                Repr::Text("nan".to_string())
            } else if v > 0.0 {
                Repr::Text("inf".to_string())
            } else {
                Repr::Text("-inf".to_string())
            }
        });
        repr.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr: Option<Repr> = Option::deserialize(deserializer)?;
        repr.map(|r| match r {
            Repr::Number(v) => Ok(v),
            Repr::Text(s) => match s.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => Err(serde::de::Error::custom(format!(
                    "invalid average: {other}"
                ))),
            },
        })
        .transpose()
    }
}

mod chrono_serde {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        dt.to_rfc3339().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
