//! Sampling positions from constraint geometry
//!
//! A constraint is the world-space mesh of a helper object. Closed meshes are
//! volumes, face-less meshes are curves and flat meshes are planes; each kind
//! has its own way of producing candidate positions.

use crate::enclosure::MeshVolume;
use crate::sampling::{Distribution, SampleRequest, SamplingConfig};
use rand::distributions::{Distribution as _, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use synthgen_core::{BoundingRegion, Error, Point3f, Result, TriangleMesh};
use tracing::debug;

/// Shape class of a constraint mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    Volume,
    Curve,
    Plane,
}

impl ConstraintKind {
    /// Guess the kind from the mesh topology
    pub fn infer(mesh: &TriangleMesh) -> Self {
        if mesh.faces.is_empty() {
            return ConstraintKind::Curve;
        }
        let flat = mesh
            .bounding_region()
            .map(|region| region.is_degenerate())
            .unwrap_or(true);
        if flat || mesh.vertex_count() <= 4 {
            ConstraintKind::Plane
        } else {
            ConstraintKind::Volume
        }
    }
}

#[derive(Debug, Clone)]
enum Shape {
    Volume(MeshVolume),
    Curve(Vec<Point3f>),
    Plane {
        triangles: Vec<[Point3f; 3]>,
        weights: WeightedIndex<f32>,
    },
}

/// Constraint geometry ready for sampling
#[derive(Debug, Clone)]
pub struct ConstraintGeometry {
    kind: ConstraintKind,
    region: BoundingRegion,
    shape: Shape,
}

impl ConstraintGeometry {
    /// Build a constraint of an explicit kind from a world-space mesh
    pub fn new(mesh: TriangleMesh, kind: ConstraintKind) -> Result<Self> {
        let region = mesh.bounding_region().ok_or_else(|| {
            Error::InvalidData("constraint mesh has no vertices".to_string())
        })?;

        let shape = match kind {
            ConstraintKind::Volume => Shape::Volume(MeshVolume::new(mesh)?),
            ConstraintKind::Curve => Shape::Curve(mesh.vertices),
            ConstraintKind::Plane => {
                mesh.validate()?;
                let triangles: Vec<[Point3f; 3]> = mesh.triangles().collect();
                let areas: Vec<f32> = triangles
                    .iter()
                    .map(|[a, b, c]| (b - a).cross(&(c - a)).norm() * 0.5)
                    .collect();
                let weights = WeightedIndex::new(&areas).map_err(|e| {
                    Error::InvalidData(format!("plane constraint has no surface area: {}", e))
                })?;
                Shape::Plane { triangles, weights }
            }
        };

        Ok(Self { kind, region, shape })
    }

    /// Build a constraint, inferring its kind from the mesh
    pub fn inferred(mesh: TriangleMesh) -> Result<Self> {
        let kind = ConstraintKind::infer(&mesh);
        Self::new(mesh, kind)
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    pub fn region(&self) -> BoundingRegion {
        self.region
    }

    /// Draw up to `count` positions from the constraint.
    ///
    /// `reference` is the mean for normal sampling of volumes. Curves and planes
    /// always sample uniformly.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        distribution: Distribution,
        reference: &Point3f,
        count: usize,
        config: &SamplingConfig,
        rng: &mut R,
    ) -> Result<Vec<Point3f>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let points = match &self.shape {
            Shape::Volume(volume) => {
                let request = SampleRequest {
                    distribution,
                    reference_point: *reference,
                    region: volume.region(),
                    count,
                    max_attempts: config.max_attempts(count),
                    sigma_fraction: config.sigma_fraction,
                };
                config.sampler().sample_points(&request, volume, rng)?
            }
            Shape::Curve(vertices) => (0..count)
                .map(|_| vertices[rng.gen_range(0..vertices.len())])
                .collect(),
            Shape::Plane { triangles, weights } => (0..count)
                .map(|_| {
                    let [a, b, c] = triangles[weights.sample(rng)];
                    point_in_triangle(&a, &b, &c, rng)
                })
                .collect(),
        };

        debug!(kind = ?self.kind, count = points.len(), "Sampled constraint");
        Ok(points)
    }
}

/// Uniform point on a triangle
fn point_in_triangle<R: Rng + ?Sized>(a: &Point3f, b: &Point3f, c: &Point3f, rng: &mut R) -> Point3f {
    let r1 = rng.gen::<f32>().sqrt();
    let r2 = rng.gen::<f32>();
    let p = a.coords * (1.0 - r1) + b.coords * (r1 * (1.0 - r2)) + c.coords * (r1 * r2);
    Point3f::from(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use synthgen_core::Transform3D;

    #[test]
    fn test_infer_kinds() {
        assert_eq!(ConstraintKind::infer(&TriangleMesh::cube(1.0)), ConstraintKind::Volume);
        assert_eq!(ConstraintKind::infer(&TriangleMesh::quad(2.0, 1.0)), ConstraintKind::Plane);
        let line = TriangleMesh::polyline(vec![Point3f::origin(), Point3f::new(0.0, 0.0, 1.0)]);
        assert_eq!(ConstraintKind::infer(&line), ConstraintKind::Curve);
    }

    #[test]
    fn test_volume_points_are_inside() {
        let mesh = TriangleMesh::cube(2.0)
            .transformed(&Transform3D::translation(synthgen_core::Vector3f::new(5.0, 0.0, 0.0)));
        let constraint = ConstraintGeometry::inferred(mesh).unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        let points = constraint
            .sample(Distribution::Uniform, &Point3f::origin(), 50, &SamplingConfig::default(), &mut rng)
            .unwrap();
        assert_eq!(points.len(), 50);
        for p in &points {
            assert!((4.0..=6.0).contains(&p.x));
            assert!((-1.0..=1.0).contains(&p.y));
        }
    }

    #[test]
    fn test_curve_picks_vertices() {
        let vertices = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(2.0, 1.0, 0.0),
        ];
        let constraint = ConstraintGeometry::inferred(TriangleMesh::polyline(vertices.clone())).unwrap();
        let mut rng = StdRng::seed_from_u64(22);
        let points = constraint
            .sample(Distribution::Normal, &Point3f::origin(), 20, &SamplingConfig::default(), &mut rng)
            .unwrap();
        assert_eq!(points.len(), 20);
        assert!(points.iter().all(|p| vertices.contains(p)));
    }

    #[test]
    fn test_plane_points_lie_on_quad() {
        let constraint = ConstraintGeometry::inferred(TriangleMesh::quad(4.0, 2.0)).unwrap();
        assert_eq!(constraint.kind(), ConstraintKind::Plane);
        let mut rng = StdRng::seed_from_u64(23);
        let points = constraint
            .sample(Distribution::Uniform, &Point3f::origin(), 200, &SamplingConfig::default(), &mut rng)
            .unwrap();
        assert_eq!(points.len(), 200);
        for p in &points {
            assert_relative_eq!(p.z, 0.0, epsilon = 1e-6);
            assert!(p.x.abs() <= 2.0 + 1e-5 && p.y.abs() <= 1.0 + 1e-5);
        }
        // Both triangles of the quad are used
        assert!(points.iter().any(|p| p.x > p.y * 2.0));
        assert!(points.iter().any(|p| p.x < p.y * 2.0));
    }

    #[test]
    fn test_volume_kind_requires_faces() {
        let line = TriangleMesh::polyline(vec![Point3f::origin(), Point3f::new(1.0, 1.0, 1.0)]);
        assert!(ConstraintGeometry::new(line, ConstraintKind::Volume).is_err());
    }

    #[test]
    fn test_zero_count() {
        let constraint = ConstraintGeometry::inferred(TriangleMesh::cube(1.0)).unwrap();
        let mut rng = StdRng::seed_from_u64(24);
        let points = constraint
            .sample(Distribution::Normal, &Point3f::origin(), 0, &SamplingConfig::default(), &mut rng)
            .unwrap();
        assert!(points.is_empty());
    }
}
