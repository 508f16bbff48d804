//! Precomputed per-frame poses

use serde::{Deserialize, Serialize};
use synthgen_core::{Point3f, Pose, Vector3f};

/// How trajectory entries combine with the current pose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrajectoryMode {
    /// Entries replace the pose
    #[default]
    Absolute,
    /// Entries are added to the pose
    Relative,
}

/// A list of positions and optional rotations, one per step
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trajectory {
    pub mode: TrajectoryMode,
    positions: Vec<Point3f>,
    rotations: Option<Vec<Vector3f>>,
}

impl Trajectory {
    pub fn absolute(positions: Vec<Point3f>) -> Self {
        Self {
            mode: TrajectoryMode::Absolute,
            positions,
            rotations: None,
        }
    }

    /// Positions are read as offsets from the current pose
    pub fn relative(offsets: Vec<Vector3f>) -> Self {
        Self {
            mode: TrajectoryMode::Relative,
            positions: offsets.into_iter().map(Point3f::from).collect(),
            rotations: None,
        }
    }

    /// Attach per-step rotations; steps without one keep the rotation
    pub fn with_rotations(mut self, rotations: Vec<Vector3f>) -> Self {
        self.rotations = Some(rotations);
        self
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Point3f] {
        &self.positions
    }

    /// Apply entry `step` to `pose`. Returns `false`, leaving the pose
    /// untouched, when the trajectory has no such step.
    pub fn apply(&self, pose: &mut Pose, step: usize) -> bool {
        let Some(position) = self.positions.get(step) else {
            return false;
        };
        let rotation = self.rotations.as_ref().and_then(|r| r.get(step));

        match self.mode {
            TrajectoryMode::Absolute => {
                pose.position = *position;
                if let Some(rotation) = rotation {
                    pose.rotation = *rotation;
                }
            }
            TrajectoryMode::Relative => {
                pose.translate(&position.coords);
                if let Some(rotation) = rotation {
                    pose.rotate(rotation);
                }
            }
        }
        true
    }
}
