//! Projection of world geometry into image space

use serde::{Deserialize, Serialize};
use synthgen_core::{Camera, Matrix4, Point3f, Resolution};

/// A vertex in pixel coordinates.
///
/// `px` grows to the right and `py` grows downwards from the top-left
/// corner. Serialized as a `[px, py, depth]` triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(i32, i32, f32)", into = "(i32, i32, f32)")]
pub struct ProjectedVertex {
    pub px: i32,
    pub py: i32,
    /// Distance along the view axis, rounded to 3 decimals
    pub depth: f32,
}

impl From<(i32, i32, f32)> for ProjectedVertex {
    fn from((px, py, depth): (i32, i32, f32)) -> Self {
        Self { px, py, depth }
    }
}

impl From<ProjectedVertex> for (i32, i32, f32) {
    fn from(v: ProjectedVertex) -> Self {
        (v.px, v.py, v.depth)
    }
}

/// Project world-space vertices through `camera` at its own resolution
pub fn project_vertices(vertices: &[Point3f], camera: &Camera) -> Vec<ProjectedVertex> {
    project(vertices, &camera.view_projection(), camera.resolution)
}

/// Project world-space vertices with a precomputed view-projection matrix
pub fn project(
    vertices: &[Point3f],
    view_projection: &Matrix4<f32>,
    resolution: Resolution,
) -> Vec<ProjectedVertex> {
    let (width, height) = (resolution.width as f32, resolution.height as f32);
    vertices
        .iter()
        .map(|vertex| {
            let view = Camera::project_with(view_projection, vertex);
            ProjectedVertex {
                px: (width * view.x).round() as i32,
                py: (height * (1.0 - view.y)).round() as i32,
                depth: (view.depth * 1000.0).round() / 1000.0,
            }
        })
        .collect()
}

/// Pixel-space bounding box of a projected object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

impl PixelBox {
    /// Tightest box around the vertices; `None` for an empty slice
    pub fn from_vertices(vertices: &[ProjectedVertex]) -> Option<Self> {
        let first = vertices.first()?;
        let init = PixelBox {
            x_min: first.px,
            x_max: first.px,
            y_min: first.py,
            y_max: first.py,
        };
        Some(vertices.iter().fold(init, |b, v| PixelBox {
            x_min: b.x_min.min(v.px),
            x_max: b.x_max.max(v.px),
            y_min: b.y_min.min(v.py),
            y_max: b.y_max.max(v.py),
        }))
    }

    /// Box in `[0, 1]` image fractions, clamped to the frame
    pub fn normalized(&self, resolution: Resolution) -> NormalizedBox {
        let w = resolution.width.max(1) as f32;
        let h = resolution.height.max(1) as f32;
        let fx = |v: i32| (v as f32 / w).clamp(0.0, 1.0);
        let fy = |v: i32| (v as f32 / h).clamp(0.0, 1.0);
        NormalizedBox {
            x_min: fx(self.x_min),
            x_max: fx(self.x_max),
            y_min: fy(self.y_min),
            y_max: fy(self.y_max),
        }
    }
}

/// Bounding box as fractions of the image size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

impl NormalizedBox {
    /// True when the clamped box has no area left inside the frame
    pub fn is_empty(&self) -> bool {
        self.x_max <= self.x_min || self.y_max <= self.y_min
    }
}
