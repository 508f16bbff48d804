//! Scene graph: objects, lights, camera and named collections

use crate::camera::Camera;
use crate::classification::ClassifiedObject;
use crate::mesh::TriangleMesh;
use crate::point::*;
use crate::pose::Pose;
use crate::transform::Transform3D;
use crate::{Error, Result};

/// A meshed entity in the scene
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    /// Geometry in object-local coordinates
    pub mesh: TriangleMesh,
    pub pose: Pose,
    pub scale: Vector3f,
    /// Name of the object this one is attached to
    pub parent: Option<String>,
    pub color: Color,
    /// Helpers such as constraint volumes and custom boxes are not rendered
    pub renderable: bool,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, mesh: TriangleMesh) -> Self {
        Self {
            name: name.into(),
            mesh,
            pose: Pose::default(),
            scale: Vector3f::new(1.0, 1.0, 1.0),
            parent: None,
            color: Color::default(),
            renderable: true,
        }
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    /// Object-to-parent transform
    pub fn local_transform(&self) -> Transform3D {
        Transform3D::from_pose(&self.pose, self.scale)
    }
}

/// A point light
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub name: String,
    pub position: Point3f,
    /// Radiant power; irradiance falls off with the squared distance
    pub intensity: f32,
    pub color: Color,
    /// Object whose geometry bounds this light's randomized positions
    pub constraint: Option<String>,
    /// `[min, max]` for uniform intensity randomization
    pub intensity_range: Option<[f32; 2]>,
}

impl Light {
    pub fn new(name: impl Into<String>, position: Point3f, intensity: f32) -> Self {
        Self {
            name: name.into(),
            position,
            intensity,
            color: Color::WHITE,
            constraint: None,
            intensity_range: None,
        }
    }
}

/// Named groups from the scene file.
///
/// Only `dynamic_lights` changes what a run does. The other groups are
/// checked against the scene when it is validated and are otherwise
/// informational; restoring after a run covers every object and light, not
/// just the dynamic ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneCollections {
    pub dynamic_parts: Vec<String>,
    pub static_lights: Vec<String>,
    pub dynamic_lights: Vec<String>,
    pub custom_bboxes: Vec<String>,
}

/// State restored after a render run
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSnapshot {
    object_poses: Vec<Pose>,
    lights: Vec<(Point3f, f32)>,
    camera_pose: Pose,
}

/// The complete scene a run operates on
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
    pub lights: Vec<Light>,
    pub camera: Camera,
    pub collections: SceneCollections,
    pub classified: Vec<ClassifiedObject>,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            ..Default::default()
        }
    }

    pub fn add_object(&mut self, object: SceneObject) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    pub fn add_light(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    pub fn object_index(&self, name: &str) -> Option<usize> {
        self.objects.iter().position(|o| o.name == name)
    }

    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn light_index(&self, name: &str) -> Option<usize> {
        self.lights.iter().position(|l| l.name == name)
    }

    /// Indices of lights in the `dynamic_lights` collection
    pub fn dynamic_light_indices(&self) -> Vec<usize> {
        self.collections
            .dynamic_lights
            .iter()
            .filter_map(|name| self.light_index(name))
            .collect()
    }

    /// Object-to-world transform, following the parent chain
    pub fn world_transform(&self, index: usize) -> Result<Transform3D> {
        let mut transform = self.objects[index].local_transform();
        let mut current = &self.objects[index];
        let mut depth = 0;

        while let Some(parent_name) = &current.parent {
            depth += 1;
            if depth > self.objects.len() {
                return Err(Error::Configuration(format!(
                    "parent chain of '{}' contains a cycle",
                    self.objects[index].name
                )));
            }
            let parent = self.object(parent_name).ok_or_else(|| {
                Error::Configuration(format!(
                    "'{}' has unknown parent '{}'",
                    current.name, parent_name
                ))
            })?;
            transform = parent.local_transform() * transform;
            current = parent;
        }

        Ok(transform)
    }

    /// Mesh of object `index` in world coordinates
    pub fn world_mesh(&self, index: usize) -> Result<TriangleMesh> {
        let transform = self.world_transform(index)?;
        Ok(self.objects[index].mesh.transformed(&transform))
    }

    /// Mesh of the named object in world coordinates
    pub fn world_mesh_by_name(&self, name: &str) -> Result<TriangleMesh> {
        let index = self
            .object_index(name)
            .ok_or_else(|| Error::Configuration(format!("unknown object '{}'", name)))?;
        self.world_mesh(index)
    }

    /// Check that every name the scene refers to exists
    pub fn validate(&self) -> Result<()> {
        for (index, object) in self.objects.iter().enumerate() {
            object.mesh.validate()?;
            self.world_transform(index)?;
        }

        let missing_object = |name: &String| self.object_index(name).is_none();
        let missing_light = |name: &String| self.light_index(name).is_none();

        if let Some(name) = self
            .collections
            .dynamic_parts
            .iter()
            .chain(&self.collections.custom_bboxes)
            .find(|n| missing_object(*n))
        {
            return Err(Error::Configuration(format!("collection names unknown object '{}'", name)));
        }
        if let Some(name) = self
            .collections
            .dynamic_lights
            .iter()
            .chain(&self.collections.static_lights)
            .find(|n| missing_light(*n))
        {
            return Err(Error::Configuration(format!("collection names unknown light '{}'", name)));
        }

        for classified in &self.classified {
            classified.validate()?;
        }
        Ok(())
    }

    /// Capture every pose and light setting a run may change
    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            object_poses: self.objects.iter().map(|o| o.pose).collect(),
            lights: self.lights.iter().map(|l| (l.position, l.intensity)).collect(),
            camera_pose: self.camera.pose,
        }
    }

    /// Put back the state captured by [`Scene::snapshot`]
    pub fn restore(&mut self, snapshot: &SceneSnapshot) {
        for (object, pose) in self.objects.iter_mut().zip(&snapshot.object_poses) {
            object.pose = *pose;
        }
        for (light, (position, intensity)) in self.lights.iter_mut().zip(&snapshot.lights) {
            light.position = *position;
            light.intensity = *intensity;
        }
        self.camera.pose = snapshot.camera_pose;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scene_with_parented_box() -> Scene {
        let mut scene = Scene::default();
        scene.add_object(
            SceneObject::new("body", TriangleMesh::cube(1.0))
                .with_pose(Pose::at(Point3f::new(2.0, 0.0, 0.0))),
        );
        let mut bbox = SceneObject::new("body.customBBox", TriangleMesh::cube(1.5));
        bbox.parent = Some("body".to_string());
        bbox.pose = Pose::at(Point3f::new(0.0, 1.0, 0.0));
        bbox.renderable = false;
        scene.add_object(bbox);
        scene
    }

    #[test]
    fn test_world_mesh_follows_parent() {
        let scene = scene_with_parented_box();
        let mesh = scene.world_mesh_by_name("body.customBBox").unwrap();
        let center = mesh.bounding_region().unwrap().center();
        assert_relative_eq!(center, Point3f::new(2.0, 1.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_parent_cycle_detected() {
        let mut scene = scene_with_parented_box();
        scene.objects[0].parent = Some("body.customBBox".to_string());
        assert!(matches!(scene.world_transform(0), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_unknown_parent_is_error() {
        let mut scene = scene_with_parented_box();
        scene.objects[1].parent = Some("ghost".to_string());
        assert!(scene.validate().is_err());
    }

    #[test]
    fn test_validate_checks_collections() {
        let mut scene = scene_with_parented_box();
        scene.collections.dynamic_parts.push("body".to_string());
        assert!(scene.validate().is_ok());
        scene.collections.dynamic_lights.push("sun".to_string());
        assert!(scene.validate().is_err());
    }

    #[test]
    fn test_snapshot_restore() {
        let mut scene = scene_with_parented_box();
        scene.add_light(Light::new("key", Point3f::new(0.0, 0.0, 5.0), 100.0));
        let snapshot = scene.snapshot();

        scene.objects[0].pose.translate(&Vector3f::new(1.0, 1.0, 1.0));
        scene.lights[0].intensity = 3.0;
        scene.lights[0].position = Point3f::origin();
        scene.camera.pose.rotate(&Vector3f::new(0.1, 0.0, 0.0));

        scene.restore(&snapshot);
        assert_eq!(scene.snapshot(), snapshot);
        assert_relative_eq!(scene.lights[0].intensity, 100.0);
    }

    #[test]
    fn test_dynamic_light_indices_skip_unknown() {
        let mut scene = Scene::default();
        scene.add_light(Light::new("a", Point3f::origin(), 1.0));
        scene.add_light(Light::new("b", Point3f::origin(), 1.0));
        scene.collections.dynamic_lights = vec!["b".to_string(), "missing".to_string()];
        assert_eq!(scene.dynamic_light_indices(), vec![1]);
    }
}
