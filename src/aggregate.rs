//! Aggregation of repeated runs into summary statistics.
//!
//! The experimental design repeats every configuration a fixed number of
//! times (three) to estimate variance. Aggregation therefore demands a
//! complete run set: fewer runs is an error and the experiment is skipped,
//! surplus runs indicate duplicates and only the first three (by run index)
//! are used, with the anomaly reported.

use serde::{Deserialize, Serialize};

use crate::answers::ExperimentKey;
use crate::scorer::{RunStatistics, ScoringMode};
use crate::{Error, Result};

/// Mean and sample standard deviation of one metric across runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Mean across runs.
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator); 0 for a single sample.
    pub std_dev: f64,
    /// Number of samples.
    pub n: usize,
}

impl MetricSummary {
    /// Summarize a slice of samples.
    #[must_use]
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self { mean: 0.0, std_dev: 0.0, n: 0 };
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let std_dev = if n > 1 {
            let variance =
                samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };
        Self { mean, std_dev, n }
    }
}

impl std::fmt::Display for MetricSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3} ± {:.3}", self.mean, self.std_dev)
    }
}

/// Aggregated statistics of one experiment under one scoring mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// Mode the runs were scored under.
    pub mode: ScoringMode,
    /// Accuracy across runs.
    pub accuracy: MetricSummary,
    /// F1 across runs.
    pub f1: MetricSummary,
    /// Number of runs aggregated.
    pub run_count: usize,
    /// Runs beyond the expected count that were ignored.
    pub surplus_runs_ignored: usize,
}

/// Fold a complete run set into an [`AggregatedResult`].
///
/// All runs must have been scored under the same mode. Fewer runs than
/// `expected_runs` fails with [`Error::IncompleteRunSet`]; surplus runs are
/// dropped after the first `expected_runs` in run-index order and reported.
pub fn aggregate_runs(
    experiment: &ExperimentKey,
    runs: &[RunStatistics],
    expected_runs: usize,
) -> Result<AggregatedResult> {
    let mode = match runs.first() {
        Some(first) => first.mode,
        None => {
            return Err(Error::IncompleteRunSet {
                experiment: experiment.to_string(),
                found: 0,
                expected: expected_runs,
            })
        }
    };
    if runs.iter().any(|r| r.mode != mode) {
        return Err(Error::invalid_input(format!(
            "experiment {experiment}: run set mixes scoring modes"
        )));
    }
    if runs.len() < expected_runs {
        return Err(Error::IncompleteRunSet {
            experiment: experiment.to_string(),
            found: runs.len(),
            expected: expected_runs,
        });
    }

    let mut ordered: Vec<&RunStatistics> = runs.iter().collect();
    ordered.sort_by_key(|r| r.run_index);
    let surplus = ordered.len() - expected_runs;
    if surplus > 0 {
        log::warn!(
            "experiment {experiment} ({mode}): {} runs found, using the first {expected_runs}",
            ordered.len()
        );
        ordered.truncate(expected_runs);
    }

    let accuracies: Vec<f64> = ordered.iter().map(|r| r.accuracy()).collect();
    let f1s: Vec<f64> = ordered.iter().map(|r| r.f1()).collect();

    Ok(AggregatedResult {
        mode,
        accuracy: MetricSummary::from_samples(&accuracies),
        f1: MetricSummary::from_samples(&f1s),
        run_count: expected_runs,
        surplus_runs_ignored: surplus,
    })
}
