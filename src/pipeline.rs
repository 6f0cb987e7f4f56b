//! End-to-end evaluation pipeline.
//!
//! Wires the stages together: load the reference table and the question
//! corpus, discover run-file groups, score every run under both modes,
//! aggregate per experiment and render the batch report. All knobs travel in
//! an explicit [`EvalConfig`] value; the pipeline holds no global state.
//!
//! The whole computation is single-threaded by design: after the two input
//! loads everything is pure and in-memory, and experiment groups are
//! independent of one another.

use std::path::PathBuf;

use crate::aggregate::aggregate_runs;
use crate::anatomy::AnatomyReference;
use crate::answers::{discover_run_groups, load_run_file, ExperimentKey};
use crate::corpus::QuestionCorpus;
use crate::report::{BatchReport, ExperimentReport};
use crate::scorer::{score_run, ScoringMode};
use crate::Result;

/// Number of repeated runs per experiment configuration.
pub const DEFAULT_EXPECTED_RUNS: usize = 3;

/// Pixel extent of the square slice images, used for coordinate bounds checks.
pub const DEFAULT_IMAGE_EXTENT: f64 = 512.0;

/// Configuration of one evaluation batch.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Dataset JSON with questions and ground truth.
    pub dataset: PathBuf,
    /// Standard-orientation reference JSON.
    pub reference: PathBuf,
    /// Directory holding `*_run_<n>.json` answer files.
    pub answers_dir: PathBuf,
    /// Where to write the CSV summary; `None` skips the file output.
    pub output: Option<PathBuf>,
    /// Research question the batch belongs to.
    pub research_question: String,
    /// Name of the evaluated model.
    pub model: String,
    /// Runs required per experiment.
    pub expected_runs: usize,
    /// Pixel extent of the slice images.
    pub image_extent: f64,
}

impl EvalConfig {
    /// Configuration with default run count and image extent.
    #[must_use]
    pub fn new(
        dataset: impl Into<PathBuf>,
        reference: impl Into<PathBuf>,
        answers_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            reference: reference.into(),
            answers_dir: answers_dir.into(),
            output: None,
            research_question: "RQ1".to_string(),
            model: "unknown".to_string(),
            expected_runs: DEFAULT_EXPECTED_RUNS,
            image_extent: DEFAULT_IMAGE_EXTENT,
        }
    }
}

/// Run one evaluation batch.
///
/// Load-time dataset violations abort the batch; per-experiment problems
/// (unreadable run files, incomplete run sets) are recorded under
/// [`BatchReport::failures`] so one broken experiment cannot invalidate its
/// siblings.
pub fn run_evaluation(config: &EvalConfig) -> Result<BatchReport> {
    let reference = AnatomyReference::load(&config.reference)?;
    log::info!("reference table: {} structures", reference.len());

    let corpus = QuestionCorpus::load(&config.dataset, &reference, config.image_extent)?;
    log::info!("{}", corpus.stats());

    let groups = discover_run_groups(&config.answers_dir)?;
    log::info!("found {} experiment group(s) in {}", groups.len(), config.answers_dir.display());

    let mut experiments = Vec::with_capacity(groups.len());
    let mut failures = Vec::new();

    for group in groups {
        let key = ExperimentKey::new(&config.research_question, &config.model, &group.base);
        let mut image_runs = Vec::new();
        let mut anatomy_runs = Vec::new();

        for &(run_index, ref path) in &group.runs {
            match load_run_file(path, run_index) {
                Ok(records) => {
                    log::info!("{key}: run {run_index}, {} answers", records.len());
                    image_runs.push(score_run(&corpus, &records, ScoringMode::ImageView, run_index));
                    anatomy_runs.push(score_run(
                        &corpus,
                        &records,
                        ScoringMode::AnatomyView,
                        run_index,
                    ));
                }
                Err(e) => failures.push(format!("{key}: run {run_index}: {e}")),
            }
        }

        let image = match aggregate_runs(&key, &image_runs, config.expected_runs) {
            Ok(aggregate) => Some(aggregate),
            Err(e) => {
                failures.push(format!("image view: {e}"));
                None
            }
        };

        // Anatomy view is not applicable when no scored run touched an
        // anatomy-evaluable question; that is a property of the corpus, not
        // a failure of the experiment.
        let anatomy = if anatomy_runs.iter().all(|r| r.counts.total() == 0) {
            None
        } else {
            match aggregate_runs(&key, &anatomy_runs, config.expected_runs) {
                Ok(aggregate) => Some(aggregate),
                Err(e) => {
                    failures.push(format!("anatomy view: {e}"));
                    None
                }
            }
        };

        experiments.push(ExperimentReport { key, image_runs, anatomy_runs, image, anatomy });
    }

    let report = BatchReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        corpus: corpus.stats(),
        expected_runs: config.expected_runs,
        experiments,
        failures,
    };

    if let Some(path) = &config.output {
        report.write_csv(path)?;
        log::info!("summary written to {}", path.display());
    }

    Ok(report)
}
