//! # mirp-eval
//!
//! Dual-mode evaluation of vision-language-model answers to relative-position
//! questions ("is X to the left of Y?") about 2D CT slices.
//!
//! Every slice in the benchmark was rendered from a canonical scan with a
//! known flip/rotation, so each left/right question has *two* ground truths:
//!
//! - **image view**: what the rendered image literally shows, resolved from
//!   center-of-mass coordinates in the stored pixel space;
//! - **anatomy view**: true patient-body laterality, resolved from a
//!   reference table of canonical structure centers in standard radiological
//!   orientation, independent of the rendering transform.
//!
//! A horizontal flip swaps left and right in the rendered image but not in
//! the patient, so the two truths disagree exactly on flipped lateral
//! questions; that disagreement is what this crate exists to measure. Above/below
//! questions carry an image-view truth only.
//!
//! ## Pipeline
//!
//! ```rust,ignore
//! use mirp_eval::{run_evaluation, EvalConfig};
//!
//! let mut config = EvalConfig::new("qa.json", "centers.json", "answers/");
//! config.research_question = "RQ2".into();
//! config.model = "gpt-4o".into();
//!
//! let report = run_evaluation(&config)?;
//! println!("{}", report.to_markdown());
//! ```
//!
//! Inputs are the persisted JSON artifacts of the benchmark: the question
//! dataset, the standard-orientation reference table and one answer file per
//! run (`<base>_run_<n>.json`, three runs per experiment). Model answers are
//! held to the prompt's single-character contract: anything but `"1"` or
//! `"0"` is scored as wrong and reported as unparseable rather than
//! interpreted.
//!
//! ## Design
//!
//! - Records are immutable after load; scoring is a pure fold and statistics
//!   are recomputed from scratch on every invocation.
//! - Dataset violations are all collected and the load aborts with the full
//!   report; per-experiment problems (missing runs, unreadable files) are
//!   reported without invalidating sibling experiments.

#![warn(missing_docs)]

pub mod aggregate;
pub mod anatomy;
pub mod answers;
pub mod corpus;
mod error;
pub mod geometry;
pub mod matcher;
pub mod pipeline;
pub mod report;
pub mod scorer;

pub use aggregate::{aggregate_runs, AggregatedResult, MetricSummary};
pub use anatomy::{AnatomyEntry, AnatomyReference, Laterality};
pub use answers::{ExperimentKey, MarkerType, ModelAnswerRecord};
pub use corpus::{QuestionCorpus, QuestionRecord, StructureObservation};
pub use error::{Error, Result};
pub use geometry::{OrientationTransform, Relation, Rotation};
pub use matcher::{normalize, NormalizedAnswer};
pub use pipeline::{run_evaluation, EvalConfig};
pub use report::{BatchReport, ExperimentReport};
pub use scorer::{score_run, ConfusionCounts, RunStatistics, ScoringMode};
