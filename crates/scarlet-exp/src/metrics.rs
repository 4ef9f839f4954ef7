//! Metric catalog and cross-revision comparison of stored measurements.

use scarlet_core::{ArtifactKind, DatasetId, ErrorInfo, HarnessError, RevisionLabel};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::RevisionStore;

/// A measurement column that can be compared across revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricSpec {
    pub name: &'static str,
    pub units: &'static str,
    /// Compare magnitudes rather than signed values.
    pub use_abs: bool,
}

/// Every comparable measurement column.
pub const METRICS: [MetricSpec; 10] = [
    MetricSpec { name: "init time", units: "time (ms)", use_abs: false },
    MetricSpec { name: "runtime", units: "time/source (ms)", use_abs: false },
    MetricSpec { name: "iterations", units: "iterations", use_abs: false },
    MetricSpec { name: "init logL", units: "logL", use_abs: true },
    MetricSpec { name: "logL", units: "logL", use_abs: true },
    MetricSpec { name: "g diff", units: "truth-model", use_abs: true },
    MetricSpec { name: "r diff", units: "truth-model", use_abs: true },
    MetricSpec { name: "i diff", units: "truth-model", use_abs: true },
    MetricSpec { name: "z diff", units: "truth-model", use_abs: true },
    MetricSpec { name: "y diff", units: "truth-model", use_abs: true },
];

/// Looks up a metric by column name.
pub fn metric(name: &str) -> Result<&'static MetricSpec, HarnessError> {
    METRICS.iter().find(|spec| spec.name == name).ok_or_else(|| {
        HarnessError::Config(
            ErrorInfo::new("metric-unknown", "metric is not in the catalog")
                .with_context("metric", name)
                .with_hint(
                    METRICS
                        .iter()
                        .map(|spec| spec.name)
                        .collect::<Vec<_>>()
                        .join(", "),
                ),
        )
    })
}

/// Distribution summary of one metric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    /// Lowest value within 1.5 IQR below `q1`, clipped to the data.
    pub lower_whisker: f64,
    /// Highest value within 1.5 IQR above `q3`, clipped to the data.
    pub upper_whisker: f64,
}

/// Summarises finite values; NaN entries (unmeasured sources) are skipped.
pub fn summarize(values: &[f64], use_abs: bool) -> Option<Summary> {
    let mut sorted: Vec<f64> = values
        .iter()
        .filter(|v| !v.is_nan())
        .map(|v| if use_abs { v.abs() } else { *v })
        .collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let q1 = percentile(&sorted, 0.25);
    let median = percentile(&sorted, 0.5);
    let q3 = percentile(&sorted, 0.75);
    let iqr = q3 - q1;
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    Some(Summary {
        count: sorted.len(),
        median,
        q1,
        q3,
        lower_whisker: (q1 - 1.5 * iqr).clamp(min, q1),
        upper_whisker: (q3 + 1.5 * iqr).clamp(q3, max),
    })
}

// Linear interpolation between closest ranks.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    (sorted[lower] + (sorted[upper] - sorted[lower]) * frac).clamp(sorted[lower], sorted[upper])
}

/// Allowed growth of a metric median before a revision counts as a regression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    #[serde(default = "Tolerance::default_abs")]
    pub abs: f64,
    #[serde(default = "Tolerance::default_rel")]
    pub rel: f64,
}

impl Tolerance {
    const fn default_abs() -> f64 {
        1e-9
    }

    const fn default_rel() -> f64 {
        0.05
    }

    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.abs < 0.0 || self.rel < 0.0 || !self.abs.is_finite() || !self.rel.is_finite() {
            return Err(HarnessError::Config(
                ErrorInfo::new("config-tolerance", "tolerances must be finite and non-negative")
                    .with_context("abs", self.abs.to_string())
                    .with_context("rel", self.rel.to_string()),
            ));
        }
        Ok(())
    }

    /// Whether `candidate` exceeds `baseline` beyond the tolerance.
    pub fn exceeded(&self, baseline: f64, candidate: f64) -> bool {
        candidate - baseline > self.abs + self.rel * baseline.abs()
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            abs: Self::default_abs(),
            rel: Self::default_rel(),
        }
    }
}

/// Summary of one revision's metric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionSummary {
    pub revision: RevisionLabel,
    /// `None` when every value was NaN or the record was empty.
    pub summary: Option<Summary>,
}

/// Median change between the last two compared revisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regression {
    pub baseline: RevisionLabel,
    pub candidate: RevisionLabel,
    pub baseline_median: f64,
    pub candidate_median: f64,
    pub regressed: bool,
}

/// Comparison of one metric across revisions of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub dataset: DatasetId,
    pub metric: MetricSpec,
    pub revisions: Vec<RevisionSummary>,
    pub regression: Option<Regression>,
}

/// Summarises a metric for each revision and checks the last two for a
/// regression. An empty `revisions` slice compares every recorded revision
/// that has a stored measurement record.
pub fn compare_revisions(
    store: &RevisionStore,
    dataset: DatasetId,
    metric_name: &str,
    revisions: &[RevisionLabel],
    tolerance: &Tolerance,
) -> Result<Comparison, HarnessError> {
    let spec = *metric(metric_name)?;
    let revisions = if revisions.is_empty() {
        // Residual-only runs are indexed too but carry no record to compare.
        store
            .revisions(dataset)?
            .into_iter()
            .filter(|revision| {
                let measured = store.exists(dataset, revision, ArtifactKind::Measurement);
                if !measured {
                    warn!(
                        dataset = dataset.as_str(),
                        revision = revision.as_str(),
                        "indexed revision has no measurements; skipped"
                    );
                }
                measured
            })
            .collect()
    } else {
        revisions.to_vec()
    };
    let mut summaries = Vec::with_capacity(revisions.len());
    for revision in revisions {
        let record = store.load_measurements(dataset, &revision)?;
        let values = record.column(spec.name).ok_or_else(|| {
            HarnessError::Config(
                ErrorInfo::new("metric-missing", "stored record has no such column")
                    .with_context("metric", spec.name)
                    .with_context("revision", revision.as_str()),
            )
        })?;
        let summary = summarize(&values, spec.use_abs);
        if summary.is_none() {
            warn!(
                dataset = dataset.as_str(),
                revision = revision.as_str(),
                metric = spec.name,
                "no finite values to summarise"
            );
        }
        summaries.push(RevisionSummary { revision, summary });
    }

    let regression = match summaries.as_slice() {
        [.., baseline, candidate] => match (&baseline.summary, &candidate.summary) {
            (Some(before), Some(after)) => Some(Regression {
                baseline: baseline.revision.clone(),
                candidate: candidate.revision.clone(),
                baseline_median: before.median,
                candidate_median: after.median,
                regressed: tolerance.exceeded(before.median, after.median),
            }),
            _ => None,
        },
        _ => None,
    };

    Ok(Comparison {
        dataset,
        metric: spec,
        revisions: summaries,
        regression,
    })
}
