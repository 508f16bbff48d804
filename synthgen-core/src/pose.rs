//! Object poses

use crate::point::*;
use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};

/// Position and XYZ Euler rotation (radians) of a scene entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point3f,
    #[serde(default = "Vector3f::zeros")]
    pub rotation: Vector3f,
}

impl Pose {
    pub fn new(position: Point3f, rotation: Vector3f) -> Self {
        Self { position, rotation }
    }

    pub fn at(position: Point3f) -> Self {
        Self::new(position, Vector3f::zeros())
    }

    /// Rotation as a quaternion, applying X then Y then Z about world axes
    pub fn orientation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::from_euler_angles(self.rotation.x, self.rotation.y, self.rotation.z)
    }

    /// Move by a relative offset
    pub fn translate(&mut self, delta: &Vector3f) {
        self.position += delta;
    }

    /// Add Euler angle offsets
    pub fn rotate(&mut self, delta: &Vector3f) {
        self.rotation += delta;
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::at(Point3f::origin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_translate_and_rotate_accumulate() {
        let mut pose = Pose::default();
        pose.translate(&Vector3f::new(1.0, 2.0, 3.0));
        pose.translate(&Vector3f::new(1.0, 0.0, 0.0));
        pose.rotate(&Vector3f::new(0.0, 0.0, 0.5));
        assert_eq!(pose.position, Point3f::new(2.0, 2.0, 3.0));
        assert_relative_eq!(pose.rotation.z, 0.5);
    }

    #[test]
    fn test_orientation_about_z() {
        let pose = Pose::new(Point3f::origin(), Vector3f::new(0.0, 0.0, FRAC_PI_2));
        let rotated = pose.orientation() * Vector3f::x();
        assert_relative_eq!(rotated, Vector3f::y(), epsilon = 1e-6);
    }
}
