//! Batch reports: aggregation results rendered as markdown and CSV.
//!
//! One [`ExperimentReport`] per run-file group, both scoring modes side by
//! side. The CSV layout mirrors the original result spreadsheets: aggregate
//! mean/std columns first, then per-run correct/incorrect/unparseable counts.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregatedResult;
use crate::answers::ExperimentKey;
use crate::corpus::CorpusStats;
use crate::scorer::RunStatistics;
use crate::Result;

/// Results of one experiment configuration across both scoring modes.
///
/// An aggregate of `None` means the mode could not be aggregated for this
/// experiment: the run set was incomplete (recorded under
/// [`BatchReport::failures`]) or, for anatomy view, no question in the
/// corpus carried an anatomy-view truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    /// Experiment identity.
    pub key: ExperimentKey,
    /// Per-run statistics under image-view scoring.
    pub image_runs: Vec<RunStatistics>,
    /// Per-run statistics under anatomy-view scoring.
    pub anatomy_runs: Vec<RunStatistics>,
    /// Image-view aggregate.
    pub image: Option<AggregatedResult>,
    /// Anatomy-view aggregate.
    pub anatomy: Option<AggregatedResult>,
}

/// Results of a whole evaluation batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// RFC 3339 timestamp of report creation.
    pub generated_at: String,
    /// Statistics of the corpus the batch was scored against.
    pub corpus: CorpusStats,
    /// Number of runs each experiment was expected to have.
    pub expected_runs: usize,
    /// One report per discovered experiment, in base-name order.
    pub experiments: Vec<ExperimentReport>,
    /// Non-fatal failures encountered during the batch (incomplete run
    /// sets, unreadable run files).
    pub failures: Vec<String>,
}

impl BatchReport {
    /// Render the batch as a markdown summary table.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::from(
            "| Experiment | Mode | Accuracy | F1 | Runs |\n\
             |------------|------|----------|----|------|\n",
        );
        for report in &self.experiments {
            for aggregate in [&report.image, &report.anatomy].into_iter().flatten() {
                out.push_str(&format!(
                    "| {} | {} | {} | {} | {} |\n",
                    report.key, aggregate.mode, aggregate.accuracy, aggregate.f1,
                    aggregate.run_count,
                ));
            }
        }
        if !self.failures.is_empty() {
            out.push('\n');
            for failure in &self.failures {
                out.push_str(&format!("- {failure}\n"));
            }
        }
        out
    }

    /// Write the batch as a CSV summary, one row per experiment.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        writer.write_record(self.csv_header())?;
        for report in &self.experiments {
            writer.write_record(self.csv_row(report))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn csv_header(&self) -> Vec<String> {
        let mut header: Vec<String> = [
            "research_question",
            "marker",
            "model",
            "base",
            "image_accuracy_mean",
            "image_accuracy_std",
            "image_f1_mean",
            "image_f1_std",
            "anatomy_accuracy_mean",
            "anatomy_accuracy_std",
            "anatomy_f1_mean",
            "anatomy_f1_std",
        ]
        .map(String::from)
        .to_vec();
        for mode in ["image", "anatomy"] {
            for metric in ["correct", "incorrect", "unparseable"] {
                for run in 0..self.expected_runs {
                    header.push(format!("{mode}_{metric}_run{run}"));
                }
            }
        }
        header
    }

    fn csv_row(&self, report: &ExperimentReport) -> Vec<String> {
        let mut row = vec![
            report.key.research_question.clone(),
            report.key.marker.to_string(),
            report.key.model.clone(),
            report.key.base.clone(),
        ];
        for aggregate in [&report.image, &report.anatomy] {
            match aggregate {
                Some(agg) => row.extend([
                    format!("{:.6}", agg.accuracy.mean),
                    format!("{:.6}", agg.accuracy.std_dev),
                    format!("{:.6}", agg.f1.mean),
                    format!("{:.6}", agg.f1.std_dev),
                ]),
                None => row.extend([String::new(), String::new(), String::new(), String::new()]),
            }
        }
        let metrics: [fn(&RunStatistics) -> usize; 3] = [
            |r| r.counts.correct(),
            |r| r.counts.incorrect(),
            |r| r.unparseable,
        ];
        for runs in [&report.image_runs, &report.anatomy_runs] {
            for metric in metrics {
                for run in 0..self.expected_runs {
                    row.push(
                        runs.iter()
                            .find(|r| r.run_index == run)
                            .map(|r| metric(r).to_string())
                            .unwrap_or_default(),
                    );
                }
            }
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::MetricSummary;
    use crate::scorer::{ConfusionCounts, ScoringMode};

    fn run(run_index: usize, mode: ScoringMode, tp: usize, fn_: usize) -> RunStatistics {
        RunStatistics {
            run_index,
            mode,
            counts: ConfusionCounts {
                true_positive: tp,
                false_positive: 0,
                true_negative: 0,
                false_negative: fn_,
            },
            unparseable: fn_,
            unmatched: 0,
            duplicates: 0,
            skipped_no_anatomy: 0,
            missing: 0,
        }
    }

    fn report() -> BatchReport {
        let image_runs: Vec<RunStatistics> =
            (0..3).map(|i| run(i, ScoringMode::ImageView, 8, 2)).collect();
        let aggregate = AggregatedResult {
            mode: ScoringMode::ImageView,
            accuracy: MetricSummary::from_samples(&[0.8, 0.8, 0.8]),
            f1: MetricSummary::from_samples(&[0.889, 0.889, 0.889]),
            run_count: 3,
            surplus_runs_ignored: 0,
        };
        BatchReport {
            generated_at: "2025-06-01T00:00:00Z".into(),
            corpus: CorpusStats {
                slices: 4,
                flipped_slices: 2,
                questions: 10,
                lateral_questions: 6,
                anatomy_evaluable: 6,
            },
            expected_runs: 3,
            experiments: vec![ExperimentReport {
                key: ExperimentKey::new("RQ2", "gpt-4o", "qa_dots"),
                image_runs,
                anatomy_runs: Vec::new(),
                image: Some(aggregate),
                anatomy: None,
            }],
            failures: vec!["Incomplete run set for RQ2/letters/gpt-4o".into()],
        }
    }

    #[test]
    fn markdown_lists_aggregates_and_failures() {
        let md = report().to_markdown();
        assert!(md.contains("| RQ2/dots/gpt-4o | image | 0.800 ± 0.000 |"));
        assert!(md.contains("- Incomplete run set"));
        // anatomy was not aggregated, so no anatomy row
        assert!(!md.contains("| anatomy |"));
    }

    #[test]
    fn csv_row_shape_matches_header() {
        let report = report();
        let header = report.csv_header();
        let row = report.csv_row(&report.experiments[0]);
        assert_eq!(header.len(), row.len());
        // 12 fixed columns + 2 modes × 3 metrics × 3 runs
        assert_eq!(header.len(), 12 + 18);
        assert_eq!(row[0], "RQ2");
        assert_eq!(row[4], "0.800000");
        // anatomy aggregate columns are empty
        assert_eq!(row[8], "");
        // image correct counts per run
        assert_eq!(&row[12..15], ["8", "8", "8"]);
    }

    #[test]
    fn csv_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        report().write_csv(&path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][2], "gpt-4o");
    }
}
