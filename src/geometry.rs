//! Orientation transforms and image-space relation resolution.
//!
//! Every stored slice was produced from a canonical slice by an optional
//! horizontal flip followed by a rotation; the applied combination is recorded
//! next to the slice as a two-character code (`A1`..`A4` flipped at
//! 0/90/180/270°, `B1`..`B4` unflipped). Question ground truth in image view
//! is resolved directly in the stored pixel space; the recorded coordinates
//! are already transformed, so no further geometry is applied here.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Rotation applied to a canonical slice, in 90° steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    /// No rotation.
    R0,
    /// 90° clockwise.
    R90,
    /// 180°.
    R180,
    /// 270° clockwise.
    R270,
}

impl Rotation {
    /// Rotation angle in degrees.
    #[must_use]
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }
}

/// How the canonical slice was transformed to produce the stored image.
///
/// Applied uniformly to both structures of a question. Parsed from the
/// dataset's short code via [`OrientationTransform::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrientationTransform {
    /// Whether a horizontal flip was applied.
    pub flipped: bool,
    /// Rotation applied after the (optional) flip.
    pub rotation: Rotation,
}

impl OrientationTransform {
    /// Parse a short transform code (`A1`..`A4`, `B1`..`B4`).
    ///
    /// `A` codes are flipped, `B` codes unflipped; the digit selects the
    /// rotation: 1 → 0°, 2 → 90°, 3 → 180°, 4 → 270°.
    pub fn parse(code: &str) -> Result<Self> {
        let code = code.trim();
        let mut chars = code.chars();
        let (series, step) = match (chars.next(), chars.next(), chars.next()) {
            (Some(series), Some(step), None) => (series, step),
            _ => {
                return Err(Error::invalid_input(format!(
                    "transform code must be two characters, got {code:?}"
                )))
            }
        };
        let flipped = match series {
            'A' | 'a' => true,
            'B' | 'b' => false,
            other => {
                return Err(Error::invalid_input(format!(
                    "unknown transform series {other:?} in code {code:?}"
                )))
            }
        };
        let rotation = match step {
            '1' => Rotation::R0,
            '2' => Rotation::R90,
            '3' => Rotation::R180,
            '4' => Rotation::R270,
            other => {
                return Err(Error::invalid_input(format!(
                    "unknown rotation step {other:?} in code {code:?}"
                )))
            }
        };
        Ok(Self { flipped, rotation })
    }

    /// Short code for this transform (`A1`..`B4`).
    #[must_use]
    pub fn code(&self) -> String {
        let series = if self.flipped { 'A' } else { 'B' };
        let step = match self.rotation {
            Rotation::R0 => '1',
            Rotation::R90 => '2',
            Rotation::R180 => '3',
            Rotation::R270 => '4',
        };
        format!("{series}{step}")
    }
}

impl std::fmt::Display for OrientationTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.flipped { "flipped" } else { "unflipped" };
        write!(f, "{state}, rotated {}°", self.rotation.degrees())
    }
}

/// Spatial relation asked about in a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// Object 1 above object 2 (smaller y, top-left pixel origin).
    Above,
    /// Object 1 below object 2.
    Below,
    /// Object 1 to the left of object 2.
    LeftOf,
    /// Object 1 to the right of object 2.
    RightOf,
}

impl Relation {
    /// Extract the relation from question text.
    ///
    /// Lateral phrasings are matched on the full `" to the left/right of "`
    /// phrase so that structure names like "left kidney" cannot shadow the
    /// relation; vertical questions use bare `" above "`/`" below "`.
    #[must_use]
    pub fn from_question(question: &str) -> Option<Self> {
        let q = question.to_lowercase();
        if q.contains(" to the left of ") {
            Some(Relation::LeftOf)
        } else if q.contains(" to the right of ") {
            Some(Relation::RightOf)
        } else if q.contains(" above ") {
            Some(Relation::Above)
        } else if q.contains(" below ") {
            Some(Relation::Below)
        } else {
            None
        }
    }

    /// Whether this is a left/right relation.
    ///
    /// Only lateral relations carry a second, anatomy-view ground truth;
    /// vertical relations are evaluated in image view alone.
    #[must_use]
    pub fn is_lateral(self) -> bool {
        matches!(self, Relation::LeftOf | Relation::RightOf)
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Relation::Above => "above",
            Relation::Below => "below",
            Relation::LeftOf => "to the left of",
            Relation::RightOf => "to the right of",
        };
        f.write_str(s)
    }
}

/// Resolve the image-view truth of a relation between two displayed centers.
///
/// Coordinates are in the stored pixel space with a top-left origin: smaller
/// x is further left in the rendered image, smaller y is higher. Returns
/// `None` when the compared coordinates tie: a degenerate pair that cannot
/// answer the question either way.
#[must_use]
pub fn image_view_answer(relation: Relation, c1: (f64, f64), c2: (f64, f64)) -> Option<bool> {
    let (lhs, rhs) = match relation {
        Relation::LeftOf | Relation::RightOf => (c1.0, c2.0),
        Relation::Above | Relation::Below => (c1.1, c2.1),
    };
    if lhs == rhs {
        return None;
    }
    Some(match relation {
        Relation::LeftOf | Relation::Above => lhs < rhs,
        Relation::RightOf | Relation::Below => lhs > rhs,
    })
}
