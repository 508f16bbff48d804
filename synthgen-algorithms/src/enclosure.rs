//! Point-in-volume predicates

use synthgen_core::{BoundingRegion, Error, Point3f, Result, TriangleMesh, Vector3f};

/// Boolean test of whether a point lies inside a volume
pub trait EnclosureTest {
    fn encloses(&self, point: &Point3f) -> bool;
}

impl<F> EnclosureTest for F
where
    F: Fn(&Point3f) -> bool,
{
    fn encloses(&self, point: &Point3f) -> bool {
        self(point)
    }
}

/// Accepts every candidate: the bounding box is the volume
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysInside;

impl EnclosureTest for AlwaysInside {
    fn encloses(&self, _point: &Point3f) -> bool {
        true
    }
}

/// Fixed ray directions, chosen off the coordinate axes and diagonals so that
/// rays through axis-aligned geometry rarely graze edges
const RAY_DIRECTIONS: [[f32; 3]; 3] = [
    [0.267_261, 0.534_522, 0.801_784],
    [-0.613_139, 0.291_869, 0.734_508],
    [0.371_391, -0.840_609, 0.394_160],
];

/// Barycentric margin inside which a hit counts as grazing an edge
const EDGE_EPSILON: f32 = 1e-5;

/// Hit distances below this count as the point lying on the surface
const SURFACE_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
enum RayHit {
    Miss,
    Cross,
    /// The ray passes within tolerance of an edge or vertex
    Grazing,
    /// The ray origin lies on the triangle
    Surface,
}

/// Outcome of casting one ray
enum RayCast {
    Crossings(usize),
    Ambiguous,
    OnSurface,
}

/// Exact enclosure test for a closed triangle mesh.
///
/// Counts every crossing of a ray from the query point with the mesh and
/// applies the even-odd rule, which is correct for non-convex volumes. Rays
/// that graze an edge are discarded and the test is repeated along another
/// direction.
#[derive(Debug, Clone)]
pub struct MeshVolume {
    mesh: TriangleMesh,
    region: BoundingRegion,
}

impl MeshVolume {
    /// Build a volume from a world-space mesh
    pub fn new(mesh: TriangleMesh) -> Result<Self> {
        if mesh.faces.is_empty() {
            return Err(Error::InvalidData(
                "enclosure volume needs a mesh with faces".to_string(),
            ));
        }
        mesh.validate()?;
        let region = mesh.bounding_region().ok_or_else(|| {
            Error::InvalidData("enclosure volume has no vertices".to_string())
        })?;
        Ok(Self { mesh, region })
    }

    /// Bounding region of the volume, used to generate candidates
    pub fn region(&self) -> BoundingRegion {
        self.region
    }

    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    fn cast(&self, origin: &Point3f, direction: &Vector3f) -> RayCast {
        let mut count = 0;
        for triangle in self.mesh.triangles() {
            match intersect(origin, direction, &triangle) {
                RayHit::Miss => {}
                RayHit::Cross => count += 1,
                RayHit::Grazing => return RayCast::Ambiguous,
                RayHit::Surface => return RayCast::OnSurface,
            }
        }
        RayCast::Crossings(count)
    }
}

impl EnclosureTest for MeshVolume {
    fn encloses(&self, point: &Point3f) -> bool {
        if !self.region.contains(point) {
            return false;
        }

        let mut votes = 0;
        for direction in RAY_DIRECTIONS {
            let direction = Vector3f::from(direction).normalize();
            match self.cast(point, &direction) {
                RayCast::Crossings(count) => return count % 2 == 1,
                // Points on the boundary belong to the volume
                RayCast::OnSurface => return true,
                RayCast::Ambiguous => {
                    let lenient = self
                        .mesh
                        .triangles()
                        .filter(|t| intersect(point, &direction, t) != RayHit::Miss)
                        .count();
                    votes += if lenient % 2 == 1 { 1 } else { -1 };
                }
            }
        }
        votes > 0
    }
}

/// Moller-Trumbore ray/triangle intersection
fn intersect(origin: &Point3f, direction: &Vector3f, triangle: &[Point3f; 3]) -> RayHit {
    let [v0, v1, v2] = *triangle;
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = direction.cross(&edge2);
    let a = edge1.dot(&h);

    let scale = edge1.norm() * edge2.norm();
    if a.abs() <= 1e-9 * scale.max(f32::MIN_POSITIVE) {
        return RayHit::Miss;
    }

    let f = 1.0 / a;
    let s = origin - v0;
    let u = f * s.dot(&h);
    if !(-EDGE_EPSILON..=1.0 + EDGE_EPSILON).contains(&u) {
        return RayHit::Miss;
    }

    let q = s.cross(&edge1);
    let v = f * direction.dot(&q);
    if v < -EDGE_EPSILON || u + v > 1.0 + EDGE_EPSILON {
        return RayHit::Miss;
    }

    let t = f * edge2.dot(&q);
    let on_edge = u < EDGE_EPSILON || v < EDGE_EPSILON || u + v > 1.0 - EDGE_EPSILON;
    if t.abs() <= SURFACE_EPSILON * scale.sqrt().max(1.0) {
        return RayHit::Surface;
    }
    if t < 0.0 {
        return RayHit::Miss;
    }
    if on_edge {
        RayHit::Grazing
    } else {
        RayHit::Cross
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// L-shaped prism: the unit square [0,2]x[0,2] minus [1,2]x[1,2], extruded over z in [0,1]
    fn l_shape() -> TriangleMesh {
        let outline = [
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 2.0),
            (0.0, 2.0),
        ];
        let mut mesh = TriangleMesh::new();
        for &(x, y) in &outline {
            mesh.add_vertex(Point3f::new(x, y, 0.0));
        }
        for &(x, y) in &outline {
            mesh.add_vertex(Point3f::new(x, y, 1.0));
        }
        // bottom (facing -z) and top (facing +z) caps
        let caps = [[0, 1, 2], [0, 2, 3], [0, 3, 4], [0, 4, 5]];
        for [a, b, c] in caps {
            mesh.add_face([a, c, b]);
            mesh.add_face([a + 6, b + 6, c + 6]);
        }
        // side walls
        for i in 0..6 {
            let j = (i + 1) % 6;
            mesh.add_face([i, j, j + 6]);
            mesh.add_face([i, j + 6, i + 6]);
        }
        mesh
    }

    #[test]
    fn test_cube_inside_and_outside() {
        let volume = MeshVolume::new(TriangleMesh::cube(2.0)).unwrap();
        assert!(volume.encloses(&Point3f::new(0.0, 0.0, 0.0)));
        assert!(volume.encloses(&Point3f::new(0.9, -0.9, 0.5)));
        assert!(!volume.encloses(&Point3f::new(1.5, 0.0, 0.0)));
        assert!(!volume.encloses(&Point3f::new(0.0, 0.0, -3.0)));
    }

    #[test]
    fn test_concave_notch_is_outside() {
        let volume = MeshVolume::new(l_shape()).unwrap();
        // inside the bounding box but in the notch
        assert!(!volume.encloses(&Point3f::new(1.5, 1.5, 0.5)));
        assert!(volume.encloses(&Point3f::new(0.5, 1.5, 0.5)));
        assert!(volume.encloses(&Point3f::new(1.5, 0.5, 0.5)));
        assert!(volume.encloses(&Point3f::new(0.5, 0.5, 0.5)));
    }

    #[test]
    fn test_ray_along_shared_edge_retries() {
        // The first ray from here crosses the top cap on the edge shared by two fan triangles
        let volume = MeshVolume::new(l_shape()).unwrap();
        assert!(volume.encloses(&Point3f::new(1.5, 0.5, 0.5)));

        let volume = MeshVolume::new(TriangleMesh::cube(2.0)).unwrap();
        assert!(volume.encloses(&Point3f::new(0.5, 0.5, 0.5)));
    }

    #[test]
    fn test_surface_point_counts_as_inside() {
        let volume = MeshVolume::new(TriangleMesh::cube(2.0)).unwrap();
        assert!(volume.encloses(&Point3f::new(0.2, 0.3, 1.0)));
    }

    #[test]
    fn test_faceless_mesh_rejected() {
        let line = TriangleMesh::polyline(vec![Point3f::origin(), Point3f::new(1.0, 0.0, 0.0)]);
        assert!(MeshVolume::new(line).is_err());
    }

    #[test]
    fn test_closure_predicate() {
        let below_plane = |p: &Point3f| p.z < 0.0;
        assert!(below_plane.encloses(&Point3f::new(0.0, 0.0, -1.0)));
        assert!(AlwaysInside.encloses(&Point3f::new(1e6, 0.0, 0.0)));
    }
}
