//! Pinhole camera model

use crate::point::*;
use crate::pose::Pose;
use nalgebra::{Isometry3, Matrix4, Perspective3};
use serde::{Deserialize, Serialize};

/// Image resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Camera-view coordinate of a world point.
///
/// `x` and `y` are normalized to `[0, 1]` across the frame with the origin at the
/// bottom-left corner; `depth` is the distance in front of the camera along its
/// view axis. Points outside the frustum fall outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewCoordinate {
    pub x: f32,
    pub y: f32,
    pub depth: f32,
}

/// A perspective camera.
///
/// With zero rotation the camera looks down world `-Z` with `+Y` up. When a
/// tracking target is set the camera instead aims at the target, keeping world
/// `+Z` up.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub pose: Pose,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub resolution: Resolution,
    pub near: f32,
    pub far: f32,
    pub tracking: Option<Point3f>,
}

const W_EPSILON: f32 = 1e-6;

impl Camera {
    /// Create a new camera
    pub fn new(pose: Pose, fov_y: f32, resolution: Resolution) -> Self {
        Self {
            pose,
            fov_y,
            resolution,
            near: 0.1,
            far: 1000.0,
            tracking: None,
        }
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Matrix4<f32> {
        match self.tracking {
            Some(target) if (target - self.pose.position).norm() > W_EPSILON => {
                let forward = (target - self.pose.position).normalize();
                let up = if forward.cross(&Vector3f::z()).norm() < 1e-4 {
                    Vector3f::y()
                } else {
                    Vector3f::z()
                };
                Matrix4::look_at_rh(&self.pose.position, &target, &up)
            }
            _ => Isometry3::from_parts(self.pose.position.coords.into(), self.pose.orientation())
                .inverse()
                .to_homogeneous(),
        }
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Perspective3::new(self.resolution.aspect_ratio(), self.fov_y, self.near, self.far).into_inner()
    }

    /// Combined world-to-clip matrix
    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Map a world point into normalized camera-view coordinates
    pub fn world_to_view(&self, point: &Point3f) -> ViewCoordinate {
        Self::project_with(&self.view_projection(), point)
    }

    /// Project with a precomputed [`Camera::view_projection`] matrix
    pub fn project_with(view_projection: &Matrix4<f32>, point: &Point3f) -> ViewCoordinate {
        let clip = view_projection * point.to_homogeneous();
        let w = if clip.w.abs() < W_EPSILON {
            W_EPSILON.copysign(clip.w)
        } else {
            clip.w
        };
        ViewCoordinate {
            x: (clip.x / w + 1.0) / 2.0,
            y: (clip.y / w + 1.0) / 2.0,
            depth: clip.w,
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(
            Pose::at(Point3f::new(0.0, 0.0, 5.0)),
            std::f32::consts::FRAC_PI_4,
            Resolution::new(640, 480),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_on_axis_maps_to_center() {
        let camera = Camera::default();
        let view = camera.world_to_view(&Point3f::origin());
        assert_relative_eq!(view.x, 0.5, epsilon = 1e-6);
        assert_relative_eq!(view.y, 0.5, epsilon = 1e-6);
        assert_relative_eq!(view.depth, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_up_is_positive_view_y() {
        let camera = Camera::default();
        let view = camera.world_to_view(&Point3f::new(0.0, 1.0, 0.0));
        assert!(view.y > 0.5);
        let view = camera.world_to_view(&Point3f::new(1.0, 0.0, 0.0));
        assert!(view.x > 0.5);
    }

    #[test]
    fn test_frustum_edge_maps_to_one() {
        let camera = Camera::default();
        let half_height = 5.0 * (camera.fov_y / 2.0).tan();
        let view = camera.world_to_view(&Point3f::new(0.0, half_height, 0.0));
        assert_relative_eq!(view.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_tracking_aims_at_target() {
        let mut camera = Camera::default();
        camera.pose = Pose::at(Point3f::new(10.0, 0.0, 0.0));
        camera.tracking = Some(Point3f::new(0.0, 0.0, 0.0));
        let view = camera.world_to_view(&Point3f::origin());
        assert_relative_eq!(view.x, 0.5, epsilon = 1e-5);
        assert_relative_eq!(view.y, 0.5, epsilon = 1e-5);
        assert_relative_eq!(view.depth, 10.0, epsilon = 1e-4);
    }

    #[test]
    fn test_tracking_straight_down() {
        let mut camera = Camera::default();
        camera.pose = Pose::at(Point3f::new(0.0, 0.0, 10.0));
        camera.tracking = Some(Point3f::origin());
        let view = camera.world_to_view(&Point3f::origin());
        assert!(view.x.is_finite() && view.y.is_finite());
        assert_relative_eq!(view.depth, 10.0, epsilon = 1e-4);
    }
}
