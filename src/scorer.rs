//! Per-run scoring of model answers against a ground-truth mode.
//!
//! Scoring is a pure fold over `(corpus, answers)`: statistics are rebuilt
//! from scratch on every invocation, never updated incrementally. YES is the
//! positive class throughout.
//!
//! Policy: unparseable model output is scored as the wrong prediction (the
//! opposite of the ground truth), not excluded. The prompt demands a
//! single-character answer, so format non-compliance is penalized like any
//! other wrong answer while staying visible in the `unparseable` count.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::answers::ModelAnswerRecord;
use crate::corpus::QuestionCorpus;
use crate::matcher::{normalize, NormalizedAnswer};

/// Reference frame a run is scored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoringMode {
    /// Truth is what the rendered image shows.
    ImageView,
    /// Truth is canonical patient anatomy; only questions with an
    /// anatomy-view label participate.
    AnatomyView,
}

impl std::fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoringMode::ImageView => f.write_str("image"),
            ScoringMode::AnatomyView => f.write_str("anatomy"),
        }
    }
}

/// Confusion-matrix counts with YES as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    /// Ground truth YES, predicted YES.
    pub true_positive: usize,
    /// Ground truth NO, predicted YES.
    pub false_positive: usize,
    /// Ground truth NO, predicted NO.
    pub true_negative: usize,
    /// Ground truth YES, predicted NO.
    pub false_negative: usize,
}

impl ConfusionCounts {
    /// Record one scored prediction.
    pub fn record(&mut self, truth: bool, predicted: bool) {
        match (truth, predicted) {
            (true, true) => self.true_positive += 1,
            (false, true) => self.false_positive += 1,
            (false, false) => self.true_negative += 1,
            (true, false) => self.false_negative += 1,
        }
    }

    /// Total scored predictions.
    #[must_use]
    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    /// Correct predictions.
    #[must_use]
    pub fn correct(&self) -> usize {
        self.true_positive + self.true_negative
    }

    /// Incorrect predictions.
    #[must_use]
    pub fn incorrect(&self) -> usize {
        self.false_positive + self.false_negative
    }

    /// Fraction of correct predictions, 0 when nothing was scored.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.correct() as f64 / total as f64
    }

    /// Precision of the YES class, 0 when nothing was predicted YES.
    #[must_use]
    pub fn precision(&self) -> f64 {
        let predicted_yes = self.true_positive + self.false_positive;
        if predicted_yes == 0 {
            return 0.0;
        }
        self.true_positive as f64 / predicted_yes as f64
    }

    /// Recall of the YES class, 0 when no ground truth is YES.
    #[must_use]
    pub fn recall(&self) -> f64 {
        let actual_yes = self.true_positive + self.false_negative;
        if actual_yes == 0 {
            return 0.0;
        }
        self.true_positive as f64 / actual_yes as f64
    }

    /// Harmonic mean of precision and recall, 0 when both are 0.
    #[must_use]
    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            return 0.0;
        }
        2.0 * p * r / (p + r)
    }
}

/// Statistics of one run under one scoring mode.
///
/// The confusion counts cover exactly the matched, mode-eligible answers;
/// everything excluded from them is accounted for in the bookkeeping fields
/// so nothing is dropped silently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Index of the scored run.
    pub run_index: usize,
    /// Mode the run was scored under.
    pub mode: ScoringMode,
    /// Confusion-matrix counts over scored answers.
    pub counts: ConfusionCounts,
    /// Answers that did not follow the mandated output format (scored wrong).
    pub unparseable: usize,
    /// Answers with no matching question in the corpus (excluded, reported).
    pub unmatched: usize,
    /// Repeated answers to an already-scored question (first one wins).
    pub duplicates: usize,
    /// Mode-eligible answers skipped because the question has no
    /// anatomy-view truth (anatomy mode only).
    pub skipped_no_anatomy: usize,
    /// Mode-eligible corpus questions this run never answered.
    pub missing: usize,
}

impl RunStatistics {
    /// Accuracy over scored answers.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.counts.accuracy()
    }

    /// F1 of the YES class over scored answers.
    #[must_use]
    pub fn f1(&self) -> f64 {
        self.counts.f1()
    }
}

/// Score one run's answers against the corpus under the given mode.
pub fn score_run(
    corpus: &QuestionCorpus,
    answers: &[ModelAnswerRecord],
    mode: ScoringMode,
    run_index: usize,
) -> RunStatistics {
    let mut stats = RunStatistics {
        run_index,
        mode,
        counts: ConfusionCounts::default(),
        unparseable: 0,
        unmatched: 0,
        duplicates: 0,
        skipped_no_anatomy: 0,
        missing: 0,
    };
    let mut scored: HashSet<(&str, &str)> = HashSet::new();

    for answer in answers {
        let Some(record) = corpus.get(&answer.image_id, &answer.question) else {
            log::warn!(
                "run {run_index}: no question matches ({}, {:?})",
                answer.image_id,
                answer.question
            );
            stats.unmatched += 1;
            continue;
        };

        if !scored.insert((record.image_id.as_str(), record.question.as_str())) {
            log::warn!(
                "run {run_index}: duplicate answer for ({}, {:?})",
                answer.image_id,
                answer.question
            );
            stats.duplicates += 1;
            continue;
        }

        let truth = match mode {
            ScoringMode::ImageView => record.image_view_answer,
            ScoringMode::AnatomyView => match record.anatomy_view_answer {
                Some(truth) => truth,
                None => {
                    stats.skipped_no_anatomy += 1;
                    continue;
                }
            },
        };

        let predicted = match normalize(&answer.raw_answer) {
            NormalizedAnswer::Yes => true,
            NormalizedAnswer::No => false,
            NormalizedAnswer::Unparseable => {
                stats.unparseable += 1;
                !truth
            }
        };
        stats.counts.record(truth, predicted);
    }

    stats.missing = corpus
        .records()
        .iter()
        .filter(|r| mode == ScoringMode::ImageView || r.anatomy_view_answer.is_some())
        .filter(|r| !scored.contains(&(r.image_id.as_str(), r.question.as_str())))
        .count();
    if stats.missing > 0 {
        log::warn!("run {run_index} ({mode}): {} questions were never answered", stats.missing);
    }

    stats
}
