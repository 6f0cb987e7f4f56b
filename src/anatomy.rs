//! Standard-orientation anatomical reference table.
//!
//! The table records, for every anatomical label index, the structure's
//! canonical name and its center under standard radiological orientation
//! (unrotated, unflipped, patient left on the viewer's right). It is the
//! ground truth for anatomy-view scoring: patient-body laterality does not
//! change with whatever flip or rotation was applied to a rendered slice.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geometry::Relation;
use crate::{Error, Result};

/// Body side of a structure in canonical anatomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Laterality {
    /// Patient's left side.
    Left,
    /// Patient's right side.
    Right,
    /// Midline structure with no lateral designation.
    Midline,
}

/// One reference entry: a labeled structure with its canonical center.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnatomyEntry {
    /// Anatomical label index (segmentation gray value).
    pub label_index: u32,
    /// Canonical structure name, e.g. `kidney_left` or `aorta`.
    pub class_name: String,
    /// Center x in standard radiological orientation.
    pub center_x: f64,
    /// Center y in standard radiological orientation.
    pub center_y: f64,
}

impl AnatomyEntry {
    /// Body side encoded in the canonical name suffix.
    #[must_use]
    pub fn laterality(&self) -> Laterality {
        if self.class_name.ends_with("_left") {
            Laterality::Left
        } else if self.class_name.ends_with("_right") {
            Laterality::Right
        } else {
            Laterality::Midline
        }
    }
}

/// Convert a display name to canonical form: `"left kidney"` → `"kidney_left"`.
///
/// Question text and reference table use different spellings of the same
/// structure; the canonical form moves a leading side word to a suffix and
/// joins the rest with underscores.
#[must_use]
pub fn canonical_name(name: &str) -> String {
    let name = name.trim().to_lowercase();
    let parts: Vec<&str> = name.split_whitespace().collect();
    match parts.split_first() {
        Some((&side, rest)) if matches!(side, "left" | "right") && !rest.is_empty() => {
            format!("{}_{side}", rest.join("_"))
        }
        _ => parts.join("_"),
    }
}

/// Reference table mapping anatomical label indices to canonical entries.
#[derive(Debug, Clone, Default)]
pub struct AnatomyReference {
    entries: HashMap<u32, AnatomyEntry>,
}

impl AnatomyReference {
    /// Build a table from entries, rejecting duplicate label indices.
    pub fn from_entries(entries: Vec<AnatomyEntry>) -> Result<Self> {
        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            if let Some(previous) = map.insert(entry.label_index, entry) {
                return Err(Error::dataset(format!(
                    "reference table lists label {} more than once ({})",
                    previous.label_index, previous.class_name
                )));
            }
        }
        Ok(Self { entries: map })
    }

    /// Load the table from a JSON file (array of entries).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::invalid_input(format!("failed to read reference table {}: {e}", path.display()))
        })?;
        let entries: Vec<AnatomyEntry> = serde_json::from_str(&content)?;
        if entries.is_empty() {
            return Err(Error::dataset(format!(
                "reference table {} contains no entries",
                path.display()
            )));
        }
        Self::from_entries(entries)
    }

    /// Look up a structure by label index.
    #[must_use]
    pub fn get(&self, label_index: u32) -> Option<&AnatomyEntry> {
        self.entries.get(&label_index)
    }

    /// Number of structures in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve the anatomy-view truth of a lateral relation.
    ///
    /// Standard radiological orientation puts the patient's left on the
    /// viewer's right, so "object 1 is to the (patient's) left of object 2"
    /// holds exactly when object 1's canonical center has the larger x.
    /// Midline structures take part through their canonical centers like any
    /// other; a tied x resolves to `false` under the strict inequality.
    ///
    /// Returns `None` for vertical relations (no anatomy-view truth is
    /// defined for them) or when either label is missing from the table.
    #[must_use]
    pub fn resolve(&self, relation: Relation, label1: u32, label2: u32) -> Option<bool> {
        if !relation.is_lateral() {
            return None;
        }
        let a = self.get(label1)?;
        let b = self.get(label2)?;
        Some(match relation {
            Relation::LeftOf => a.center_x > b.center_x,
            Relation::RightOf => a.center_x < b.center_x,
            Relation::Above | Relation::Below => unreachable!("guarded by is_lateral"),
        })
    }
}
