//! Per-frame metric evaluation with sample-count weighting.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::metrics::MetricKind;
use crate::picture::Picture;
use crate::registry::MetricRegistry;

/// One metric's result for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameScore {
    /// Metric that produced the score.
    pub metric: MetricKind,
    /// Plane scores combined by sample count.
    pub weighted: f64,
    /// Unweighted Y, U, V scores. NaN for a plane with no samples.
    pub planes: [f64; 3],
}

/// All enabled metrics' results for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameEvaluation {
    /// Zero-based frame index within the sequence.
    pub index: u64,
    /// Scores in catalogue order.
    pub scores: Vec<FrameScore>,
}

impl FrameEvaluation {
    /// Score for a specific metric, if it was enabled.
    #[must_use]
    pub fn score(&self, metric: MetricKind) -> Option<&FrameScore> {
        self.scores.iter().find(|s| s.metric == metric)
    }
}

/// Evaluate every enabled metric on a frame pair and update the registry.
///
/// Each metric is computed on the Y, U and V planes and the three results
/// are combined as `Σ(score_i · samples_i) / total_samples`, so chroma
/// contributes in proportion to its actual footprint. Planes without samples
/// (chroma of a one-pixel-wide or one-pixel-high frame) are not measured and
/// carry no weight. The combined score is
/// recorded in the metric's accumulator. Nothing is recorded unless every
/// enabled metric succeeds.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the pictures differ in layout.
pub fn evaluate(
    registry: &mut MetricRegistry,
    reference: &Picture,
    test: &Picture,
    index: u64,
) -> Result<FrameEvaluation> {
    if !reference.same_layout(test) {
        return Err(Error::DimensionMismatch {
            expected: (reference.width(), reference.height()),
            actual: (test.width(), test.height()),
        });
    }

    let total = reference.total_sample_count() as f64;
    let planes = reference.planes().iter().zip(test.planes());

    let scores = registry
        .enabled()
        .map(|entry| {
            let metric = entry.kind();
            let mut per_plane = [0.0; 3];
            let mut weighted = 0.0;
            for (score, (a, b)) in per_plane.iter_mut().zip(planes.clone()) {
                if a.is_empty() {
                    *score = f64::NAN;
                    continue;
                }
                *score = metric.compute(a.as_img(), b.as_img())?;
                weighted += *score * a.sample_count() as f64;
            }
            Ok::<_, Error>(FrameScore {
                metric,
                weighted: weighted / total,
                planes: per_plane,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    for (entry, score) in registry.enabled_mut().zip(&scores) {
        entry.record(score.weighted);
    }

    debug!(frame = index, metrics = scores.len(), "evaluated frame");

    Ok(FrameEvaluation { index, scores })
}
