//! The metric catalogue and per-metric running accumulators.

use tracing::warn;

use crate::eval::report::MetricSummary;
use crate::metrics::MetricKind;

/// One catalogue slot: a metric plus its running statistics.
#[derive(Debug, Clone)]
pub struct MetricEntry {
    kind: MetricKind,
    enabled: bool,
    last_value: f64,
    accumulated: f64,
    frames_seen: u64,
    average: Option<f64>,
}

impl MetricEntry {
    fn new(kind: MetricKind) -> Self {
        Self {
            kind,
            enabled: false,
            last_value: 0.0,
            accumulated: 0.0,
            frames_seen: 0,
            average: None,
        }
    }

    /// The metric this entry tracks.
    #[must_use]
    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Metric name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Whether the metric is computed for each frame.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Weighted score of the most recent frame, `0.0` before the first.
    #[must_use]
    pub fn last_value(&self) -> f64 {
        self.last_value
    }

    /// Sum of all recorded frame scores.
    #[must_use]
    pub fn accumulated_sum(&self) -> f64 {
        self.accumulated
    }

    /// Number of recorded frames.
    #[must_use]
    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// Sequence average. `None` until [`MetricRegistry::finalize`] has run,
    /// and after it if no frame was recorded.
    #[must_use]
    pub fn average(&self) -> Option<f64> {
        self.average
    }

    pub(crate) fn record(&mut self, score: f64) {
        self.last_value = score;
        self.accumulated += score;
        self.frames_seen += 1;
    }

    fn finalize(&mut self) -> Option<f64> {
        self.average = if self.frames_seen > 0 {
            Some(self.accumulated / self.frames_seen as f64)
        } else {
            None
        };
        self.average
    }
}

/// Fixed catalogue of every [`MetricKind`], in declaration order.
#[derive(Debug, Clone)]
pub struct MetricRegistry {
    entries: Vec<MetricEntry>,
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self {
            entries: MetricKind::ALL.into_iter().map(MetricEntry::new).collect(),
        }
    }
}

impl MetricRegistry {
    /// Catalogue with nothing enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalogue with the given metrics enabled.
    #[must_use]
    pub fn with_enabled(kinds: &[MetricKind]) -> Self {
        let mut registry = Self::new();
        for &kind in kinds {
            registry.enable(kind);
        }
        registry
    }

    /// Enable a metric.
    pub fn enable(&mut self, kind: MetricKind) {
        self.entry_mut(kind).enabled = true;
    }

    /// Enable every metric named in `list` (see [`parse_metric_list`]).
    ///
    /// Returns the names that matched nothing.
    pub fn enable_names(&mut self, list: &str) -> Vec<String> {
        let (kinds, unknown) = parse_metric_list(list);
        for kind in kinds {
            self.enable(kind);
        }
        unknown
    }

    /// Whether at least one metric is enabled.
    #[must_use]
    pub fn has_enabled(&self) -> bool {
        self.entries.iter().any(MetricEntry::is_enabled)
    }

    /// All entries in catalogue order.
    #[must_use]
    pub fn entries(&self) -> &[MetricEntry] {
        &self.entries
    }

    /// Enabled entries in catalogue order.
    pub fn enabled(&self) -> impl Iterator<Item = &MetricEntry> {
        self.entries.iter().filter(|e| e.enabled)
    }

    pub(crate) fn enabled_mut(&mut self) -> impl Iterator<Item = &mut MetricEntry> {
        self.entries.iter_mut().filter(|e| e.enabled)
    }

    /// Entry for a metric.
    #[must_use]
    pub fn entry(&self, kind: MetricKind) -> &MetricEntry {
        &self.entries[catalogue_index(kind)]
    }

    fn entry_mut(&mut self, kind: MetricKind) -> &mut MetricEntry {
        &mut self.entries[catalogue_index(kind)]
    }

    /// Compute averages for every enabled metric.
    ///
    /// Metrics that never saw a frame report no average instead of dividing
    /// by zero.
    pub fn finalize(&mut self) -> Vec<MetricSummary> {
        self.enabled_mut()
            .map(|entry| {
                let average = entry.finalize();
                if average.is_none() {
                    warn!(metric = entry.name(), "no frames were evaluated");
                }
                MetricSummary {
                    metric: entry.kind,
                    frames: entry.frames_seen,
                    average,
                }
            })
            .collect()
    }
}

fn catalogue_index(kind: MetricKind) -> usize {
    match kind {
        MetricKind::Psnr => 0,
        MetricKind::Ssim => 1,
        MetricKind::MsSsim => 2,
        MetricKind::Mse => 3,
    }
}

/// Split a comma or whitespace separated list of metric names.
///
/// Names must match exactly. Returns the recognized metrics (deduplicated,
/// in the order given) and the names that were not recognized.
pub fn parse_metric_list(list: &str) -> (Vec<MetricKind>, Vec<String>) {
    let mut kinds = Vec::new();
    let mut unknown = Vec::new();

    for name in list
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
    {
        match name.parse::<MetricKind>() {
            Ok(kind) => {
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
            Err(err) => {
                warn!(%err, "ignoring metric");
                unknown.push(name.to_string());
            }
        }
    }

    (kinds, unknown)
}
