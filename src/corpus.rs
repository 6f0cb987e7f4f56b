//! Question corpus: dataset schema, load-time validation and lookup.
//!
//! The dataset JSON is decoded through explicit schema structs and validated
//! at the boundary. Validation is fail-fast but not first-failure: every
//! violation in the file is collected and reported together, and a corpus
//! with any violation is rejected wholesale; a silently skipped record would
//! bias every statistic computed downstream.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::anatomy::{canonical_name, AnatomyReference, Laterality};
use crate::geometry::{image_view_answer, OrientationTransform, Relation, Rotation};
use crate::{Error, Result};

/// A structure as observed in one stored slice.
///
/// The center is in the pixel space of the stored, possibly transformed
/// image. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureObservation {
    /// Display name as used in the question text, e.g. `"left kidney"`.
    pub name: String,
    /// Anatomical label index (segmentation gray value).
    pub label_index: u32,
    /// Center of mass in stored pixel coordinates.
    pub center: (f64, f64),
}

/// One evaluable unit: a question about two structures in one image, with
/// ground truth under both reference frames.
///
/// Created once at load time and read-only downstream. `anatomy_view_answer`
/// is populated only for lateral relations whose labels both resolve in the
/// reference table; vertical questions carry no anatomy-view truth by design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// Image file name the question refers to.
    pub image_id: String,
    /// Displayed question text.
    pub question: String,
    /// Relation the question asks about.
    pub relation: Relation,
    /// First referenced structure.
    pub object1: StructureObservation,
    /// Second referenced structure.
    pub object2: StructureObservation,
    /// Transform that produced the stored image from the canonical slice.
    pub transform: OrientationTransform,
    /// Truth judged by what the rendered image shows.
    pub image_view_answer: bool,
    /// Truth judged by canonical patient anatomy, where defined.
    pub anatomy_view_answer: Option<bool>,
}

/// Slice-level metadata retained for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceInfo {
    /// Stored image file name.
    pub filename: String,
    /// Source volume the slice was extracted from.
    pub base_name: String,
    /// Index of the slice within the source volume.
    pub slice_index: u32,
    /// Number of labeled classes present in the slice.
    pub classes_count: u32,
    /// Whether any label occurs as multiple disconnected components.
    pub multiple_components_same_label: bool,
    /// Transform applied to the canonical slice.
    pub transform: OrientationTransform,
}

// Raw schema mirroring the dataset JSON. Decoded per entry so that one bad
// record does not mask violations in the rest of the file.

#[derive(Debug, Deserialize)]
struct RawSliceEntry {
    filename: String,
    base_name: String,
    slice_index: u32,
    classes_count: u32,
    multiple_components_same_label: bool,
    rotate_flip_short: String,
    #[allow(dead_code)]
    rotate_flip_long: String,
    question_answer: Vec<RawQuestionAnswer>,
}

#[derive(Debug, Deserialize)]
struct RawQuestionAnswer {
    object1_name: String,
    object2_name: String,
    object1_gray: u32,
    object2_gray: u32,
    object1_center_x: f64,
    object1_center_y: f64,
    object2_center_x: f64,
    object2_center_y: f64,
    question: String,
    answer: u8,
}

/// Summary statistics of a loaded corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusStats {
    /// Number of slice entries.
    pub slices: usize,
    /// Number of slices stored with a horizontal flip.
    pub flipped_slices: usize,
    /// Total question count.
    pub questions: usize,
    /// Questions with a left/right relation.
    pub lateral_questions: usize,
    /// Questions carrying an anatomy-view truth.
    pub anatomy_evaluable: usize,
}

impl std::fmt::Display for CorpusStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Corpus: {} questions over {} slices", self.questions, self.slices)?;
        writeln!(f, "  flipped slices:    {}", self.flipped_slices)?;
        writeln!(f, "  lateral questions: {}", self.lateral_questions)?;
        write!(f, "  anatomy-evaluable: {}", self.anatomy_evaluable)
    }
}

/// The loaded, validated question corpus.
///
/// Lookup by `(image_id, question_text)` is O(1); that composite is the join
/// key between the dataset and the recorded model answers.
#[derive(Debug, Clone)]
pub struct QuestionCorpus {
    records: Vec<QuestionRecord>,
    index: HashMap<(String, String), usize>,
    slices: Vec<SliceInfo>,
    loaded_at: String,
}

impl QuestionCorpus {
    /// Load and validate a dataset JSON file.
    pub fn load(
        path: impl AsRef<Path>,
        reference: &AnatomyReference,
        image_extent: f64,
    ) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::invalid_input(format!("failed to read dataset {}: {e}", path.display()))
        })?;
        Self::parse(&content, reference, image_extent)
    }

    /// Parse and validate dataset JSON content.
    pub fn parse(content: &str, reference: &AnatomyReference, image_extent: f64) -> Result<Self> {
        let raw_entries: Vec<serde_json::Value> = serde_json::from_str(content)?;

        let mut violations: Vec<String> = Vec::new();
        let mut records: Vec<QuestionRecord> = Vec::new();
        let mut slices: Vec<SliceInfo> = Vec::new();
        let mut index: HashMap<(String, String), usize> = HashMap::new();
        let mut seen_filenames: HashSet<String> = HashSet::new();

        for (entry_idx, value) in raw_entries.into_iter().enumerate() {
            let entry: RawSliceEntry = match serde_json::from_value(value) {
                Ok(entry) => entry,
                Err(e) => {
                    violations.push(format!("entry {entry_idx}: {e}"));
                    continue;
                }
            };

            if !seen_filenames.insert(entry.filename.clone()) {
                violations.push(format!(
                    "entry {entry_idx} ({}): duplicate slice filename",
                    entry.filename
                ));
                continue;
            }

            let transform = match OrientationTransform::parse(&entry.rotate_flip_short) {
                Ok(transform) => transform,
                Err(e) => {
                    violations.push(format!("entry {entry_idx} ({}): {e}", entry.filename));
                    continue;
                }
            };

            for qa in &entry.question_answer {
                match build_record(&entry.filename, transform, qa, reference, image_extent) {
                    Ok(record) => {
                        let key = (record.image_id.clone(), record.question.clone());
                        if index.contains_key(&key) {
                            violations.push(format!(
                                "{}: duplicate question {:?}",
                                record.image_id, record.question
                            ));
                            continue;
                        }
                        index.insert(key, records.len());
                        records.push(record);
                    }
                    Err(messages) => {
                        violations.extend(
                            messages
                                .into_iter()
                                .map(|m| format!("{} {:?}: {m}", entry.filename, qa.question)),
                        );
                    }
                }
            }

            slices.push(SliceInfo {
                filename: entry.filename,
                base_name: entry.base_name,
                slice_index: entry.slice_index,
                classes_count: entry.classes_count,
                multiple_components_same_label: entry.multiple_components_same_label,
                transform,
            });
        }

        if !violations.is_empty() {
            return Err(Error::dataset(violations.join("\n")));
        }
        if records.is_empty() {
            return Err(Error::dataset("dataset contains no questions".to_string()));
        }

        Ok(Self {
            records,
            index,
            slices,
            loaded_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Look up a question by its composite key.
    #[must_use]
    pub fn get(&self, image_id: &str, question: &str) -> Option<&QuestionRecord> {
        self.index
            .get(&(image_id.to_string(), question.to_string()))
            .map(|&i| &self.records[i])
    }

    /// All question records in dataset order.
    #[must_use]
    pub fn records(&self) -> &[QuestionRecord] {
        &self.records
    }

    /// Slice metadata in dataset order.
    #[must_use]
    pub fn slices(&self) -> &[SliceInfo] {
        &self.slices
    }

    /// Number of questions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the corpus holds no questions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// RFC 3339 timestamp of when the corpus was loaded.
    #[must_use]
    pub fn loaded_at(&self) -> &str {
        &self.loaded_at
    }

    /// Summary statistics.
    #[must_use]
    pub fn stats(&self) -> CorpusStats {
        CorpusStats {
            slices: self.slices.len(),
            flipped_slices: self.slices.iter().filter(|s| s.transform.flipped).count(),
            questions: self.records.len(),
            lateral_questions: self.records.iter().filter(|r| r.relation.is_lateral()).count(),
            anatomy_evaluable: self
                .records
                .iter()
                .filter(|r| r.anatomy_view_answer.is_some())
                .count(),
        }
    }
}

/// Validate one question/answer pair and assemble its record.
///
/// Returns all violations for the pair rather than the first one found.
fn build_record(
    image_id: &str,
    transform: OrientationTransform,
    qa: &RawQuestionAnswer,
    reference: &AnatomyReference,
    image_extent: f64,
) -> std::result::Result<QuestionRecord, Vec<String>> {
    let mut problems = Vec::new();

    if qa.answer > 1 {
        problems.push(format!("answer must be 0 or 1, got {}", qa.answer));
    }
    if qa.object1_gray == qa.object2_gray {
        problems.push(format!(
            "question references the same structure twice (label {})",
            qa.object1_gray
        ));
    }

    let c1 = (qa.object1_center_x, qa.object1_center_y);
    let c2 = (qa.object2_center_x, qa.object2_center_y);
    for (name, center) in [(&qa.object1_name, c1), (&qa.object2_name, c2)] {
        if !in_bounds(center, image_extent) {
            problems.push(format!(
                "{name} center ({}, {}) outside image bounds [0, {image_extent})",
                center.0, center.1
            ));
        }
    }

    let Some(relation) = Relation::from_question(&qa.question) else {
        problems.push("question text contains no recognizable relation".to_string());
        return Err(problems);
    };

    match image_view_answer(relation, c1, c2) {
        None => problems.push("structure centers tie on the compared axis".to_string()),
        Some(derived) if problems.is_empty() => {
            if derived != (qa.answer == 1) {
                problems.push(format!(
                    "recorded answer {} disagrees with displayed geometry",
                    qa.answer
                ));
            }
        }
        Some(_) => {}
    }

    if !problems.is_empty() {
        return Err(problems);
    }

    let anatomy_view_answer = resolve_anatomy(image_id, relation, qa, reference);

    // Flip/laterality sanity: at 0° with two genuinely lateral structures the
    // two truths must agree exactly when no flip was applied.
    if let Some(anatomy) = anatomy_view_answer {
        let both_lateral = [qa.object1_gray, qa.object2_gray].iter().all(|&label| {
            reference
                .get(label)
                .is_some_and(|e| e.laterality() != Laterality::Midline)
        });
        if transform.rotation == Rotation::R0 && both_lateral {
            let image = qa.answer == 1;
            let consistent = if transform.flipped { image != anatomy } else { image == anatomy };
            if !consistent {
                return Err(vec![format!(
                    "orientation {transform} is inconsistent with the two ground-truth labels \
                     (image {image}, anatomy {anatomy})"
                )]);
            }
        }
    }

    Ok(QuestionRecord {
        image_id: image_id.to_string(),
        question: qa.question.clone(),
        relation,
        object1: StructureObservation {
            name: qa.object1_name.clone(),
            label_index: qa.object1_gray,
            center: c1,
        },
        object2: StructureObservation {
            name: qa.object2_name.clone(),
            label_index: qa.object2_gray,
            center: c2,
        },
        transform,
        image_view_answer: qa.answer == 1,
        anatomy_view_answer,
    })
}

/// Resolve the anatomy-view truth for a pair, warning on reference gaps.
fn resolve_anatomy(
    image_id: &str,
    relation: Relation,
    qa: &RawQuestionAnswer,
    reference: &AnatomyReference,
) -> Option<bool> {
    if !relation.is_lateral() {
        return None;
    }

    for (name, label) in [
        (&qa.object1_name, qa.object1_gray),
        (&qa.object2_name, qa.object2_gray),
    ] {
        match reference.get(label) {
            None => {
                log::warn!(
                    "{image_id}: label {label} ({name}) missing from reference table, \
                     question not anatomy-evaluable"
                );
                return None;
            }
            Some(entry) => {
                let canonical = canonical_name(name);
                if canonical != entry.class_name {
                    log::warn!(
                        "{image_id}: name {name:?} (canonical {canonical:?}) differs from \
                         reference entry {:?} for label {label}",
                        entry.class_name
                    );
                }
            }
        }
    }

    reference.resolve(relation, qa.object1_gray, qa.object2_gray)
}

fn in_bounds(center: (f64, f64), extent: f64) -> bool {
    center.0 >= 0.0 && center.0 < extent && center.1 >= 0.0 && center.1 < extent
}
