//! Per-run randomization plan
//!
//! Everything random about a run except light intensities is drawn once,
//! before the first frame: camera poses, the positions of every part
//! dependency, light positions and the ML use of each frame.

use rand::Rng;
use std::collections::HashMap;
use synthgen_algorithms::{
    assign_splits, ConstraintGeometry, ConstraintKind, Distribution, MlUse, SamplingConfig, Trajectory,
};
use synthgen_core::{Point3f, Result, Scene, Vector3f};
use synthgen_io::RunConfig;
use tracing::{debug, warn};

/// Positions for the part moved by one classification
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyPlan {
    /// Index into [`Scene::classified`]
    pub classified: usize,
    /// Index into the classified object's classifications
    pub classification: usize,
    /// Index of the moving object
    pub part: usize,
    /// Positions in the part's parent space, one per frame of the classification's block
    pub trajectory: Trajectory,
}

/// Positions for one dynamic light
#[derive(Debug, Clone, PartialEq)]
pub struct LightPlan {
    pub light: usize,
    pub trajectory: Trajectory,
}

/// Randomization decided before rendering starts
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub frame_count: usize,
    /// Camera poses; `None` leaves the camera where it is
    pub camera: Option<Trajectory>,
    /// Object index the camera aims at
    pub camera_target: Option<usize>,
    pub dependencies: Vec<DependencyPlan>,
    pub lights: Vec<LightPlan>,
    pub ml_use: Vec<MlUse>,
}

/// Sampling context shared by every constraint lookup of a plan
struct Constraints<'a> {
    scene: &'a Scene,
    kinds: &'a HashMap<String, ConstraintKind>,
    config: &'a SamplingConfig,
}

impl Constraints<'_> {
    /// Geometry of the named constraint, `None` when no such object exists
    fn geometry(&self, name: &str) -> Result<Option<ConstraintGeometry>> {
        if self.scene.object_index(name).is_none() {
            return Ok(None);
        }
        let mesh = self.scene.world_mesh_by_name(name)?;
        let geometry = match self.kinds.get(name) {
            Some(kind) => ConstraintGeometry::new(mesh, *kind)?,
            None => ConstraintGeometry::inferred(mesh)?,
        };
        Ok(Some(geometry))
    }

    fn sample<R: Rng + ?Sized>(
        &self,
        name: &str,
        distribution: Distribution,
        reference: &Point3f,
        count: usize,
        rng: &mut R,
    ) -> Result<Option<Vec<Point3f>>> {
        match self.geometry(name)? {
            Some(geometry) => Ok(Some(geometry.sample(distribution, reference, count, self.config, rng)?)),
            None => Ok(None),
        }
    }
}

impl RunPlan {
    /// Draw every per-run random decision.
    ///
    /// References that do not resolve are logged and skipped. Configuration
    /// problems such as a degenerate region for normal sampling are errors.
    pub fn build<R: Rng + ?Sized>(
        scene: &Scene,
        run: &RunConfig,
        kinds: &HashMap<String, ConstraintKind>,
        rng: &mut R,
    ) -> Result<Self> {
        let frame_count = run.render_count;
        let constraints = Constraints { scene, kinds, config: &run.sampling };

        let camera = Self::plan_camera(scene, run, &constraints, rng)?;

        let camera_target = run.camera.track.as_deref().and_then(|name| {
            let index = scene.object_index(name);
            if index.is_none() {
                warn!(object = name, "Camera tracking target not found, tracking disabled");
            }
            index
        });

        let mut dependencies = Vec::new();
        for (ci, classified) in scene.classified.iter().enumerate() {
            for (k, classification) in classified.classifications.iter().enumerate() {
                let part_name = classified.moving_part(k);
                let Some(part) = scene.object_index(part_name) else {
                    warn!(object = %classified.object, label = %classification.label, part = part_name,
                        "Part dependency not found, classification skipped");
                    continue;
                };
                let Some(constraint) = classification.placement_constraint() else {
                    debug!(object = %classified.object, label = %classification.label, "No constraint, part stays put");
                    continue;
                };

                // One position per frame of the classification's block
                let count = classified.frame_block(k, frame_count).len();
                let reference = scene.objects[part].pose.position;
                let Some(points) = constraints.sample(constraint, Distribution::Uniform, &reference, count, rng)?
                else {
                    warn!(object = %classified.object, label = %classification.label, constraint,
                        "Constraint not found, classification skipped");
                    continue;
                };

                let positions = Self::to_parent_space(scene, part, points)?;
                dependencies.push(DependencyPlan {
                    classified: ci,
                    classification: k,
                    part,
                    trajectory: Trajectory::absolute(positions),
                });
            }
        }

        let mut lights = Vec::new();
        for light in scene.dynamic_light_indices() {
            let Some(constraint) = scene.lights[light].constraint.as_deref() else {
                continue;
            };
            let reference = scene.lights[light].position;
            match constraints.sample(constraint, run.lighting.translation, &reference, frame_count, rng)? {
                Some(positions) => lights.push(LightPlan { light, trajectory: Trajectory::absolute(positions) }),
                None => warn!(light = %scene.lights[light].name, constraint, "Light constraint not found, light stays put"),
            }
        }

        let ml_use = assign_splits(frame_count, &run.split, rng)?;

        debug!(
            frames = frame_count,
            dependencies = dependencies.len(),
            lights = lights.len(),
            "Run plan ready"
        );

        Ok(Self {
            frame_count,
            camera,
            camera_target,
            dependencies,
            lights,
            ml_use,
        })
    }

    fn plan_camera<R: Rng + ?Sized>(
        scene: &Scene,
        run: &RunConfig,
        constraints: &Constraints<'_>,
        rng: &mut R,
    ) -> Result<Option<Trajectory>> {
        let initial = scene.camera.pose;
        let jitter = run.camera.rotation_jitter();
        let has_jitter = jitter.iter().any(|j| *j > 0.0);

        let positions = match run.camera.constraint.as_deref() {
            Some(name) => {
                match constraints.sample(name, run.camera.distribution, &initial.position, run.render_count, rng)? {
                    Some(points) => Some(points),
                    None => {
                        warn!(constraint = name, "Camera constraint not found, camera stays put");
                        None
                    }
                }
            }
            None => None,
        };

        if positions.is_none() && !has_jitter {
            return Ok(None);
        }
        let positions = positions.unwrap_or_else(|| vec![initial.position; run.render_count]);

        let trajectory = if has_jitter {
            let rotations = (0..positions.len())
                .map(|_| {
                    let offset = Vector3f::from_fn(|axis, _| {
                        let j = jitter[axis];
                        if j > 0.0 { rng.gen_range(-j..=j) } else { 0.0 }
                    });
                    initial.rotation + offset
                })
                .collect();
            Trajectory::absolute(positions).with_rotations(rotations)
        } else {
            Trajectory::absolute(positions)
        };
        Ok(Some(trajectory))
    }

    /// World positions become positions relative to the part's parent
    fn to_parent_space(scene: &Scene, part: usize, points: Vec<Point3f>) -> Result<Vec<Point3f>> {
        let Some(parent) = scene.objects[part].parent.as_deref() else {
            return Ok(points);
        };
        let parent_index = scene.object_index(parent).ok_or_else(|| {
            synthgen_core::Error::Configuration(format!("unknown parent '{}'", parent))
        })?;
        let inverse = scene.world_transform(parent_index)?.inverse().ok_or_else(|| {
            synthgen_core::Error::Configuration(format!("transform of '{}' is not invertible", parent))
        })?;
        Ok(points.iter().map(|p| inverse.transform_point(p)).collect())
    }

    /// Positions planned for classification `classification` of classified object `classified`
    pub fn dependency(&self, classified: usize, classification: usize) -> Option<&DependencyPlan> {
        self.dependencies
            .iter()
            .find(|d| d.classified == classified && d.classification == classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use synthgen_core::{Classification, ClassifiedObject, Light, Pose, SceneObject, TriangleMesh};

    fn scene() -> Scene {
        let mut scene = Scene::default();
        scene.add_object(SceneObject::new("body", TriangleMesh::cube(1.0)));
        scene.add_object(SceneObject::new("clip", TriangleMesh::cube(0.2)));
        let mut volume = SceneObject::new("volume", TriangleMesh::cube(2.0))
            .with_pose(Pose::at(Point3f::new(3.0, 0.0, 0.0)));
        volume.renderable = false;
        scene.add_object(volume);
        let mut rail = SceneObject::new(
            "rail",
            TriangleMesh::polyline(vec![Point3f::new(0.0, 0.0, 8.0), Point3f::new(1.0, 0.0, 8.0)]),
        );
        rail.renderable = false;
        scene.add_object(rail);

        let mut light = Light::new("key", Point3f::new(0.0, 0.0, 8.0), 100.0);
        light.constraint = Some("rail".to_string());
        scene.add_light(light);
        scene.collections.dynamic_lights.push("key".to_string());

        let mut open = Classification::new("open", 0.5);
        open.part_dependency = Some("clip".to_string());
        open.dependency_constraint = Some("volume".to_string());
        let closed = Classification::new("closed", 0.5);
        scene.classified.push(ClassifiedObject {
            object: "body".to_string(),
            classifications: vec![open, closed],
        });
        scene
    }

    #[test]
    fn test_plan_counts() {
        let scene = scene();
        let mut run = RunConfig::default();
        run.render_count = 8;
        run.camera.constraint = Some("volume".to_string());
        run.camera.distribution = Distribution::Uniform;
        let mut rng = StdRng::seed_from_u64(51);
        let plan = RunPlan::build(&scene, &run, &HashMap::new(), &mut rng).unwrap();

        assert_eq!(plan.camera.as_ref().unwrap().len(), 8);
        assert_eq!(plan.ml_use.len(), 8);
        assert_eq!(plan.dependencies.len(), 1);
        let dependency = plan.dependency(0, 0).unwrap();
        assert_eq!(dependency.part, 1);
        assert_eq!(dependency.trajectory.len(), 4);
        assert!(dependency.trajectory.positions().iter().all(|p| (2.0..=4.0).contains(&p.x)));
        assert_eq!(plan.lights.len(), 1);
        assert_eq!(plan.lights[0].trajectory.len(), 8);
    }

    #[test]
    fn test_positions_cover_uneven_blocks() {
        let mut scene = scene();
        scene.classified[0].classifications[0].split = 0.65;
        scene.classified[0].classifications[1].split = 0.35;
        scene.classified[0].classifications[1].part_dependency = Some("clip".to_string());
        scene.classified[0].classifications[1].dependency_constraint = Some("volume".to_string());
        let mut run = RunConfig::default();
        run.render_count = 10;
        let mut rng = StdRng::seed_from_u64(53);
        let plan = RunPlan::build(&scene, &run, &HashMap::new(), &mut rng).unwrap();

        // floor(10 * 0.65) = 6 and floor(10 * 1.0) - 6 = 4
        assert_eq!(plan.dependency(0, 0).unwrap().trajectory.len(), 6);
        assert_eq!(plan.dependency(0, 1).unwrap().trajectory.len(), 4);
    }

    #[test]
    fn test_unresolved_references_are_skipped() {
        let mut scene = scene();
        scene.classified[0].classifications[0].dependency_constraint = Some("ghost".to_string());
        scene.lights[0].constraint = Some("nowhere".to_string());
        let mut run = RunConfig::default();
        run.camera.constraint = Some("missing".to_string());
        run.camera.track = Some("missing".to_string());
        let mut rng = StdRng::seed_from_u64(52);
        let plan = RunPlan::build(&scene, &run, &HashMap::new(), &mut rng).unwrap();
        assert!(plan.camera.is_none());
        assert!(plan.camera_target.is_none());
        assert!(plan.dependencies.is_empty());
        assert!(plan.lights.is_empty());
    }

    #[test]
    fn test_rotation_jitter_without_constraint() {
        let scene = scene();
        let mut run = RunConfig::default();
        run.render_count = 5;
        run.camera.rotation_jitter_degrees = [10.0, 0.0, 0.0];
        let mut rng = StdRng::seed_from_u64(53);
        let plan = RunPlan::build(&scene, &run, &HashMap::new(), &mut rng).unwrap();
        let trajectory = plan.camera.unwrap();
        assert_eq!(trajectory.len(), 5);

        let mut pose = scene.camera.pose;
        for step in 0..5 {
            assert!(trajectory.apply(&mut pose, step));
            assert_eq!(pose.position, scene.camera.pose.position);
            assert!(pose.rotation.x.abs() <= 10f32.to_radians() + 1e-6);
            assert_eq!(pose.rotation.y, 0.0);
        }
    }

    #[test]
    fn test_zero_frames_plan_is_empty() {
        let scene = scene();
        let mut run = RunConfig::default();
        run.render_count = 0;
        run.camera.constraint = Some("volume".to_string());
        let mut rng = StdRng::seed_from_u64(54);
        let plan = RunPlan::build(&scene, &run, &HashMap::new(), &mut rng).unwrap();
        assert!(plan.camera.unwrap().is_empty());
        assert!(plan.ml_use.is_empty());
    }

    #[test]
    fn test_positions_follow_parent() {
        let mut scene = scene();
        scene.objects[0].pose.position = Point3f::new(1.0, 0.0, 0.0);
        scene.objects[1].parent = Some("body".to_string());
        let run = RunConfig { render_count: 4, ..RunConfig::default() };
        let mut rng = StdRng::seed_from_u64(55);
        let plan = RunPlan::build(&scene, &run, &HashMap::new(), &mut rng).unwrap();
        let dependency = plan.dependency(0, 0).unwrap();
        // The volume spans x in [2, 4] in the world, [1, 3] relative to the body
        assert!(dependency.trajectory.positions().iter().all(|p| (1.0..=3.0).contains(&p.x)));
    }
}
