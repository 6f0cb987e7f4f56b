//! Recorded model answers: run-file schema, discovery and grouping.
//!
//! Inference adapters persist one JSON file per run, named
//! `<base>_run_<n>.json`; three runs per experiment configuration. This
//! module finds those files, groups them by base name and loads them into
//! flat [`ModelAnswerRecord`]s. Ground truth is never taken from answer
//! files; any `expected_answer` field they carry is ignored.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

static RUN_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<base>.+)_run_(?P<run>\d+)\.json$").expect("static pattern"));

/// One recorded model answer to one question in one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelAnswerRecord {
    /// Image file name the question was asked about.
    pub image_id: String,
    /// Question text, verbatim; joins to the corpus together with `image_id`.
    pub question: String,
    /// Raw model output, unnormalized.
    pub raw_answer: String,
    /// Index of the run that produced this answer.
    pub run_index: usize,
}

#[derive(Debug, Deserialize)]
struct RawAnswerEntry {
    file_name: String,
    results_call: Vec<RawCall>,
}

#[derive(Debug, Deserialize)]
struct RawCall {
    question: String,
    model_answer: String,
}

/// Load one run file into answer records.
pub fn load_run_file(path: impl AsRef<Path>, run_index: usize) -> Result<Vec<ModelAnswerRecord>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::invalid_input(format!("failed to read run file {}: {e}", path.display()))
    })?;
    let entries: Vec<RawAnswerEntry> = serde_json::from_str(&content)?;

    let mut records = Vec::new();
    for entry in entries {
        for call in entry.results_call {
            records.push(ModelAnswerRecord {
                image_id: entry.file_name.clone(),
                question: call.question,
                raw_answer: call.model_answer,
                run_index,
            });
        }
    }
    Ok(records)
}

/// Visual marker style used to indicate the two structures in the rendered
/// image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerType {
    /// Colored dots.
    Dots,
    /// Letter annotations.
    Letters,
    /// Number annotations.
    Numbers,
    /// No marker overlay.
    Plain,
}

impl MarkerType {
    /// Recover the marker style from a run-file base name.
    #[must_use]
    pub fn from_base_name(base: &str) -> Self {
        let base = base.to_lowercase();
        if base.contains("dots") {
            MarkerType::Dots
        } else if base.contains("letters") {
            MarkerType::Letters
        } else if base.contains("numbers") {
            MarkerType::Numbers
        } else {
            MarkerType::Plain
        }
    }
}

impl std::fmt::Display for MarkerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarkerType::Dots => "dots",
            MarkerType::Letters => "letters",
            MarkerType::Numbers => "numbers",
            MarkerType::Plain => "plain",
        };
        f.write_str(s)
    }
}

/// Identity of one experiment configuration: research question, marker style
/// and evaluated model, plus the run-file base name the group was found under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExperimentKey {
    /// Research question the experiment belongs to, e.g. `RQ2`.
    pub research_question: String,
    /// Marker style, recovered from the base name.
    pub marker: MarkerType,
    /// Model under evaluation.
    pub model: String,
    /// Run-file base name (`<base>_run_<n>.json`).
    pub base: String,
}

impl ExperimentKey {
    /// Build a key for a run-file group.
    #[must_use]
    pub fn new(research_question: &str, model: &str, base: &str) -> Self {
        Self {
            research_question: research_question.to_string(),
            marker: MarkerType::from_base_name(base),
            model: model.to_string(),
            base: base.to_string(),
        }
    }
}

impl std::fmt::Display for ExperimentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.research_question, self.marker, self.model)
    }
}

/// A group of run files sharing one base name.
#[derive(Debug, Clone)]
pub struct RunGroup {
    /// Base name shared by the group's files.
    pub base: String,
    /// `(run_index, path)` pairs in ascending run order.
    pub runs: Vec<(usize, PathBuf)>,
}

/// Find and group `*_run_<n>.json` files in a directory.
///
/// Non-matching `.json` files are ignored with a warning; a directory with no
/// matching files at all is an error. Groups come back sorted by base name,
/// runs within a group sorted by run index.
pub fn discover_run_groups(dir: impl AsRef<Path>) -> Result<Vec<RunGroup>> {
    let dir = dir.as_ref();
    let mut grouped: BTreeMap<String, Vec<(usize, PathBuf)>> = BTreeMap::new();

    for entry in fs::read_dir(dir)
        .map_err(|e| Error::invalid_input(format!("failed to read {}: {e}", dir.display())))?
    {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(".json") {
            continue;
        }
        match RUN_FILE.captures(name) {
            Some(caps) => {
                let base = caps["base"].to_string();
                let run: usize = caps["run"].parse().map_err(|_| {
                    Error::invalid_input(format!("run index out of range in {name}"))
                })?;
                grouped.entry(base).or_default().push((run, path));
            }
            None => log::warn!(
                "{}: does not match the *_run_<n>.json pattern, skipping",
                path.display()
            ),
        }
    }

    if grouped.is_empty() {
        return Err(Error::invalid_input(format!(
            "no *_run_<n>.json files found in {}",
            dir.display()
        )));
    }

    Ok(grouped
        .into_iter()
        .map(|(base, mut runs)| {
            runs.sort_by_key(|&(run, _)| run);
            RunGroup { base, runs }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_from_base_name() {
        assert_eq!(MarkerType::from_base_name("qa_dots_all_images"), MarkerType::Dots);
        assert_eq!(MarkerType::from_base_name("qa_letters_subset"), MarkerType::Letters);
        assert_eq!(MarkerType::from_base_name("QA_NUMBERS"), MarkerType::Numbers);
        assert_eq!(MarkerType::from_base_name("qa"), MarkerType::Plain);
    }

    #[test]
    fn experiment_key_display() {
        let key = ExperimentKey::new("RQ2", "gpt-4o", "qa_dots_all_images");
        assert_eq!(key.to_string(), "RQ2/dots/gpt-4o");
        assert_eq!(key.base, "qa_dots_all_images");
    }

    #[test]
    fn run_file_pattern() {
        let caps = RUN_FILE.captures("qa_dots_all_images_run_2.json").unwrap();
        assert_eq!(&caps["base"], "qa_dots_all_images");
        assert_eq!(&caps["run"], "2");
        assert!(RUN_FILE.captures("qa_dots.json").is_none());
        assert!(RUN_FILE.captures("_run_0.json").is_none());
    }

    #[test]
    fn discovers_and_sorts_groups() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "qa_dots_run_1.json",
            "qa_dots_run_0.json",
            "qa_letters_run_0.json",
            "notes.json",
        ] {
            fs::write(dir.path().join(name), "[]").unwrap();
        }

        let groups = discover_run_groups(dir.path()).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].base, "qa_dots");
        assert_eq!(
            groups[0].runs.iter().map(|(r, _)| *r).collect::<Vec<_>>(),
            vec![0, 1]
        );
        assert_eq!(groups[1].base, "qa_letters");
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_run_groups(dir.path()).is_err());
    }

    #[test]
    fn loads_run_file_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa_run_0.json");
        fs::write(
            &path,
            serde_json::json!([{
                "file_name": "slice_a.png",
                "results_call": [
                    {"question": "Is the aorta above the duodenum?", "model_answer": "1",
                     "expected_answer": 1, "entire_prompt": "ignored"},
                    {"question": "Is the liver to the right of the spleen?", "model_answer": "nope"},
                ],
            }])
            .to_string(),
        )
        .unwrap();

        let records = load_run_file(&path, 0).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].image_id, "slice_a.png");
        assert_eq!(records[0].raw_answer, "1");
        assert_eq!(records[1].raw_answer, "nope");
        assert!(records.iter().all(|r| r.run_index == 0));
    }
}
