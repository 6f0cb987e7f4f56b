//! Normalization of raw model answers.
//!
//! The benchmark prompt mandates that the model reply with exactly one
//! character, `'1'` for yes or `'0'` for no. Normalization is therefore
//! strict: whitespace is tolerated, nothing else is. Prose, bare "yes"/"no",
//! empty output and anything multi-character all normalize to
//! [`NormalizedAnswer::Unparseable`]; non-compliance with the output format
//! is itself an experimental signal, and guessing at intent would erase it.

use serde::{Deserialize, Serialize};

/// A model answer reduced to its binary meaning, or the lack of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NormalizedAnswer {
    /// The model answered `1`.
    Yes,
    /// The model answered `0`.
    No,
    /// The output did not follow the mandated single-character format.
    Unparseable,
}

impl NormalizedAnswer {
    /// The boolean value of a compliant answer.
    #[must_use]
    pub fn as_bool(self) -> Option<bool> {
        match self {
            NormalizedAnswer::Yes => Some(true),
            NormalizedAnswer::No => Some(false),
            NormalizedAnswer::Unparseable => None,
        }
    }
}

/// Normalize a raw model answer.
#[must_use]
pub fn normalize(raw: &str) -> NormalizedAnswer {
    match raw.trim() {
        "1" => NormalizedAnswer::Yes,
        "0" => NormalizedAnswer::No,
        _ => NormalizedAnswer::Unparseable,
    }
}
