//! Mesh data structures and functionality

use crate::point::*;
use crate::region::BoundingRegion;
use crate::transform::Transform3D;
use serde::{Deserialize, Serialize};

/// A triangle mesh with vertices and faces.
///
/// A mesh without faces is treated as a polyline (curve) by constraint sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Axis-aligned cube centered on the origin with outward-facing winding
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        let vertices = (0..8)
            .map(|i| {
                Point3f::new(
                    if i & 1 == 0 { -h } else { h },
                    if i & 2 == 0 { -h } else { h },
                    if i & 4 == 0 { -h } else { h },
                )
            })
            .collect();
        let faces = vec![
            [0, 2, 1], [1, 2, 3], // -z
            [4, 5, 6], [5, 7, 6], // +z
            [0, 1, 4], [1, 5, 4], // -y
            [2, 6, 3], [3, 6, 7], // +y
            [0, 4, 2], [2, 4, 6], // -x
            [1, 3, 5], [3, 7, 5], // +x
        ];
        Self::from_vertices_and_faces(vertices, faces)
    }

    /// Rectangle in the XY plane centered on the origin, facing +Z
    pub fn quad(width: f32, height: f32) -> Self {
        let (w, h) = (width / 2.0, height / 2.0);
        let vertices = vec![
            Point3f::new(-w, -h, 0.0),
            Point3f::new(w, -h, 0.0),
            Point3f::new(w, h, 0.0),
            Point3f::new(-w, h, 0.0),
        ];
        Self::from_vertices_and_faces(vertices, vec![[0, 1, 2], [0, 2, 3]])
    }

    /// Open polyline through the given points
    pub fn polyline(points: Vec<Point3f>) -> Self {
        Self::from_vertices_and_faces(points, Vec::new())
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3f) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a face to the mesh
    pub fn add_face(&mut self, face: [usize; 3]) {
        self.faces.push(face);
    }

    /// Corner positions of face `index`
    pub fn triangle(&self, index: usize) -> [Point3f; 3] {
        let face = self.faces[index];
        [
            self.vertices[face[0]],
            self.vertices[face[1]],
            self.vertices[face[2]],
        ]
    }

    /// Iterate over the corner positions of every face
    pub fn triangles(&self) -> impl Iterator<Item = [Point3f; 3]> + '_ {
        (0..self.faces.len()).map(move |i| self.triangle(i))
    }

    /// Calculate face normals
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        self.triangles()
            .map(|[v0, v1, v2]| {
                let edge1 = v1 - v0;
                let edge2 = v2 - v0;

                edge1.cross(&edge2).normalize()
            })
            .collect()
    }

    /// Verify every face references an existing vertex
    pub fn validate(&self) -> crate::Result<()> {
        let count = self.vertices.len();
        if let Some(face) = self.faces.iter().find(|f| f.iter().any(|&i| i >= count)) {
            return Err(crate::Error::InvalidData(format!(
                "face {:?} references a vertex outside 0..{}",
                face, count
            )));
        }
        Ok(())
    }

    /// Copy of the mesh with every vertex transformed
    pub fn transformed(&self, transform: &Transform3D) -> Self {
        Self {
            vertices: self
                .vertices
                .iter()
                .map(|v| transform.transform_point(v))
                .collect(),
            faces: self.faces.clone(),
        }
    }

    /// Bounding region of the vertices, `None` for an empty mesh
    pub fn bounding_region(&self) -> Option<BoundingRegion> {
        BoundingRegion::from_points(&self.vertices)
    }

    /// Vertex centroid
    pub fn centroid(&self) -> Option<Point3f> {
        if self.vertices.is_empty() {
            return None;
        }
        let sum = self
            .vertices
            .iter()
            .fold(Vector3f::zeros(), |acc, v| acc + v.coords);
        Some(Point3f::from(sum / self.vertices.len() as f32))
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}
