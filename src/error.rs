//! Error types for mirp-eval.

use thiserror::Error;

/// Result type for mirp-eval operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for mirp-eval operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Structural violation in the dataset or reference JSON.
    ///
    /// The message lists every violation found during the load; a corpus with
    /// any violation is rejected wholesale because ground-truth correctness
    /// is what makes the downstream statistics valid.
    #[error("Malformed dataset:\n{0}")]
    MalformedDataset(String),

    /// An experiment has fewer run files than the experimental design requires.
    #[error("Incomplete run set for {experiment}: found {found} runs, expected {expected}")]
    IncompleteRunSet {
        /// Experiment the runs belong to.
        experiment: String,
        /// Number of run files found.
        found: usize,
        /// Number of run files the design requires.
        expected: usize,
    },

    /// Invalid input provided (paths, configuration, empty directories).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV output error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Create a malformed-dataset error from a violation report.
    pub fn dataset(report: impl Into<String>) -> Self {
        Error::MalformedDataset(report.into())
    }

    /// Create an invalid-input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }
}
