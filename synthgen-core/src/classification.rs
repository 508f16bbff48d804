//! Per-object classification records

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Tolerance when checking that split fractions do not exceed one
pub const SPLIT_TOLERANCE: f32 = 1e-3;

/// One labeled configuration of a scene object.
///
/// Object references are scene object names. `split` is the fraction of the
/// run's frames rendered with this classification active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub split: f32,
    /// Region the classified object itself is constrained to
    #[serde(default)]
    pub constraint: Option<String>,
    /// Object whose projected vertices replace the classified object's for labeling
    #[serde(default)]
    pub custom_bbox: Option<String>,
    /// Object that moves while this classification is active
    #[serde(default)]
    pub part_dependency: Option<String>,
    /// Constraint geometry for the part dependency's positions
    #[serde(default)]
    pub dependency_constraint: Option<String>,
}

impl Classification {
    pub fn new(label: impl Into<String>, split: f32) -> Self {
        Self {
            label: label.into(),
            split,
            constraint: None,
            custom_bbox: None,
            part_dependency: None,
            dependency_constraint: None,
        }
    }

    /// Constraint used to place the moving part, falling back to the object constraint
    pub fn placement_constraint(&self) -> Option<&str> {
        self.dependency_constraint
            .as_deref()
            .or(self.constraint.as_deref())
    }
}

/// Which classification of an object is active for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveClassification {
    /// Index into [`ClassifiedObject::classifications`]
    pub index: usize,
    /// Frame offset within this classification's block of frames
    pub local_frame: usize,
}

/// A scene object together with its ordered classification entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedObject {
    pub object: String,
    pub classifications: Vec<Classification>,
}

impl ClassifiedObject {
    /// Object moved by classification `index`; the classified object when unset
    pub fn moving_part(&self, index: usize) -> &str {
        self.classifications
            .get(index)
            .and_then(|c| c.part_dependency.as_deref())
            .unwrap_or(&self.object)
    }

    /// Object projected for labels under classification `index`
    pub fn labeled_part(&self, index: usize) -> &str {
        self.classifications
            .get(index)
            .and_then(|c| c.custom_bbox.as_deref())
            .unwrap_or(&self.object)
    }

    /// Classification active at `frame`.
    ///
    /// Frames are assigned to classifications in order, each ending at
    /// `floor(render_count * cumulative_split)`. Returns `None` once the
    /// splits are used up.
    pub fn active_at(&self, frame: usize, render_count: usize) -> Option<ActiveClassification> {
        self.blocks(render_count)
            .enumerate()
            .find(|(_, block)| block.contains(&frame))
            .map(|(index, block)| ActiveClassification {
                index,
                local_frame: frame - block.start,
            })
    }

    /// Frames during which classification `index` is active; empty for an unknown index
    pub fn frame_block(&self, index: usize, render_count: usize) -> Range<usize> {
        self.blocks(render_count).nth(index).unwrap_or(0..0)
    }

    fn blocks(&self, render_count: usize) -> impl Iterator<Item = Range<usize>> + '_ {
        self.classifications
            .iter()
            .scan((0.0f32, 0usize), move |(cumulative, start), classification| {
                *cumulative += classification.split;
                // Sums within tolerance of one cover the whole run
                let fraction = if (1.0 - *cumulative).abs() <= SPLIT_TOLERANCE { 1.0 } else { *cumulative };
                let end = ((render_count as f32 * fraction).floor() as usize).clamp(*start, render_count.max(*start));
                let block = *start..end;
                *start = end;
                Some(block)
            })
    }

    /// Check split fractions are in range and sum to at most one
    pub fn validate(&self) -> Result<()> {
        if self.classifications.is_empty() {
            return Err(Error::Configuration(format!(
                "object '{}' has no classification entries",
                self.object
            )));
        }
        let mut total = 0.0;
        for c in &self.classifications {
            if !(0.0..=1.0).contains(&c.split) {
                return Err(Error::Configuration(format!(
                    "classification '{}' of '{}' has split {} outside [0, 1]",
                    c.label, self.object, c.split
                )));
            }
            total += c.split;
        }
        if total > 1.0 + SPLIT_TOLERANCE {
            return Err(Error::Configuration(format!(
                "classification splits of '{}' sum to {}",
                self.object, total
            )));
        }
        Ok(())
    }
}
