//! JSON scene and run configuration files
//!
//! A scene file describes the objects, lights, camera, collections and
//! classification records of a scene together with the settings of the run
//! that randomizes it. Angles are given in degrees; mesh paths are resolved
//! relative to the scene file.

use crate::error::IoError;
use crate::obj::ObjReader;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use synthgen_algorithms::{ConstraintKind, DatasetSplit, Distribution, IntensityRandomization, SamplingConfig};
use synthgen_core::{
    Camera, ClassifiedObject, Color, Error, Light, Point3f, Pose, Resolution, Result, Scene,
    SceneCollections, SceneObject, TriangleMesh, Vector3f,
};
use tracing::{info, warn};

fn vec3(v: [f32; 3]) -> Vector3f {
    Vector3f::new(v[0], v[1], v[2])
}

fn point3(v: [f32; 3]) -> Point3f {
    Point3f::new(v[0], v[1], v[2])
}

fn radians(degrees: [f32; 3]) -> Vector3f {
    vec3(degrees).map(f32::to_radians)
}

fn default_true() -> bool {
    true
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

/// Where an object's geometry comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MeshSource {
    Cube { size: f32 },
    Quad { width: f32, height: f32 },
    Polyline { points: Vec<[f32; 3]> },
    Inline { vertices: Vec<[f32; 3]>, faces: Vec<[usize; 3]> },
    /// An OBJ file, or one named object of it
    Obj {
        path: PathBuf,
        #[serde(default)]
        object: Option<String>,
    },
}

impl MeshSource {
    fn load(&self, base_dir: &Path) -> Result<TriangleMesh> {
        Ok(match self {
            MeshSource::Cube { size } => TriangleMesh::cube(*size),
            MeshSource::Quad { width, height } => TriangleMesh::quad(*width, *height),
            MeshSource::Polyline { points } => {
                TriangleMesh::polyline(points.iter().copied().map(point3).collect())
            }
            MeshSource::Inline { vertices, faces } => TriangleMesh::from_vertices_and_faces(
                vertices.iter().copied().map(point3).collect(),
                faces.clone(),
            ),
            MeshSource::Obj { path, object } => {
                let path = base_dir.join(path);
                match object {
                    Some(name) => ObjReader::read_object(&path, name)?,
                    None => ObjReader::read_mesh(&path)?,
                }
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDescription {
    pub name: String,
    pub mesh: MeshSource,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation_degrees: [f32; 3],
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub color: Color,
    #[serde(default = "default_true")]
    pub renderable: bool,
    /// How the object is sampled when used as a constraint; inferred when unset
    #[serde(default)]
    pub constraint_kind: Option<ConstraintKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightDescription {
    pub name: String,
    pub position: [f32; 3],
    pub intensity: f32,
    #[serde(default = "white")]
    pub color: Color,
    #[serde(default)]
    pub constraint: Option<String>,
    #[serde(default)]
    pub intensity_range: Option<[f32; 2]>,
}

fn white() -> Color {
    Color::WHITE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraDescription {
    pub position: [f32; 3],
    pub rotation_degrees: [f32; 3],
    /// Vertical field of view
    pub fov_degrees: f32,
    pub resolution: [u32; 2],
    pub near: f32,
    pub far: f32,
}

impl Default for CameraDescription {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 5.0],
            rotation_degrees: [0.0; 3],
            fov_degrees: 45.0,
            resolution: [640, 480],
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl CameraDescription {
    fn build(&self) -> Result<Camera> {
        let [width, height] = self.resolution;
        if width == 0 || height == 0 {
            return Err(Error::Configuration(format!(
                "camera resolution {}x{} is empty",
                width, height
            )));
        }
        if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return Err(Error::Configuration(format!(
                "camera field of view {} is outside (0, 180) degrees",
                self.fov_degrees
            )));
        }
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(Error::Configuration(format!(
                "camera clip planes [{}, {}] are invalid",
                self.near, self.far
            )));
        }
        let mut camera = Camera::new(
            Pose::new(point3(self.position), radians(self.rotation_degrees)),
            self.fov_degrees.to_radians(),
            Resolution::new(width, height),
        );
        camera.near = self.near;
        camera.far = self.far;
        Ok(camera)
    }
}

/// How the camera is moved during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraRandomization {
    /// Object bounding the camera positions; the camera stays put when unset
    pub constraint: Option<String>,
    /// `Normal` clusters positions around the initial camera position
    pub distribution: Distribution,
    /// Half-width of the uniform rotation jitter per axis
    pub rotation_jitter_degrees: [f32; 3],
    /// Object the camera aims at every frame
    pub track: Option<String>,
}

impl Default for CameraRandomization {
    fn default() -> Self {
        Self {
            constraint: None,
            distribution: Distribution::Normal,
            rotation_jitter_degrees: [0.0; 3],
            track: None,
        }
    }
}

impl CameraRandomization {
    pub fn rotation_jitter(&self) -> Vector3f {
        radians(self.rotation_jitter_degrees)
    }
}

/// How dynamic lights are randomized
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub intensity: IntensityRandomization,
    /// Distribution of light positions inside their constraints
    pub translation: Distribution,
}

/// Output locations and naming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub root: PathBuf,
    /// Dataset name; also the stem of every output file
    pub file_name: String,
    /// Bucket prefix for `imageGcsUri`, e.g. `gs://bucket/renders/`
    pub gcs_prefix: Option<String>,
    /// Value of the annotation set label on every bounding box
    pub annotation_set: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("output"),
            file_name: "synthetic".to_string(),
            gcs_prefix: None,
            annotation_set: None,
        }
    }
}

/// Rasterizer settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingConfig {
    pub ambient: f32,
    pub background: Color,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            ambient: 0.15,
            background: Color::new(0.05, 0.05, 0.05),
        }
    }
}

/// Settings of one render run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub render_count: usize,
    /// Seed for reproducible runs; entropy when unset
    pub seed: Option<u64>,
    pub camera: CameraRandomization,
    pub lighting: LightingConfig,
    pub sampling: SamplingConfig,
    pub split: DatasetSplit,
    pub output: OutputConfig,
    pub shading: ShadingConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            render_count: 10,
            seed: None,
            camera: CameraRandomization::default(),
            lighting: LightingConfig::default(),
            sampling: SamplingConfig::default(),
            split: DatasetSplit::default(),
            output: OutputConfig::default(),
            shading: ShadingConfig::default(),
        }
    }
}

impl RunConfig {
    /// Reject settings that would fail part way through a run
    pub fn validate(&self) -> Result<()> {
        self.split.validate()?;
        self.lighting.intensity.validate()?;
        if !(self.sampling.sigma_fraction.is_finite() && self.sampling.sigma_fraction > 0.0) {
            return Err(Error::Configuration(format!(
                "sigma fraction must be positive, got {}",
                self.sampling.sigma_fraction
            )));
        }
        if self.output.file_name.is_empty() {
            return Err(Error::Configuration("output file name is empty".to_string()));
        }
        if self.camera.rotation_jitter_degrees.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return Err(Error::Configuration(format!(
                "camera rotation jitter {:?} must be non-negative",
                self.camera.rotation_jitter_degrees
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionsDescription {
    pub dynamic_parts: Vec<String>,
    pub static_lights: Vec<String>,
    pub dynamic_lights: Vec<String>,
    pub custom_bboxes: Vec<String>,
}

/// Contents of a scene file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub camera: CameraDescription,
    pub objects: Vec<ObjectDescription>,
    pub lights: Vec<LightDescription>,
    pub collections: CollectionsDescription,
    pub classified: Vec<ClassifiedObject>,
    pub run: RunConfig,
}

/// A built scene with its run settings
#[derive(Debug, Clone)]
pub struct LoadedScene {
    pub scene: Scene,
    pub run: RunConfig,
    /// Explicit constraint kinds by object name
    pub constraint_kinds: HashMap<String, ConstraintKind>,
}

impl SceneDescription {
    /// Read a scene file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IoError::FileNotFound { path: path.display().to_string() },
            _ => IoError::Io(e),
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text).map_err(IoError::from)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self).map_err(IoError::from)?)
    }

    /// Build the scene, loading meshes relative to `base_dir`
    pub fn build(&self, base_dir: &Path) -> Result<LoadedScene> {
        let mut scene = Scene::new(self.camera.build()?);
        let mut constraint_kinds = HashMap::new();

        for object in &self.objects {
            if scene.object_index(&object.name).is_some() {
                return Err(Error::Configuration(format!("duplicate object name '{}'", object.name)));
            }
            let mut built = SceneObject::new(object.name.clone(), object.mesh.load(base_dir)?)
                .with_pose(Pose::new(point3(object.position), radians(object.rotation_degrees)));
            built.scale = vec3(object.scale);
            built.parent = object.parent.clone();
            built.color = object.color;
            built.renderable = object.renderable;
            scene.add_object(built);

            if let Some(kind) = object.constraint_kind {
                constraint_kinds.insert(object.name.clone(), kind);
            }
        }

        for light in &self.lights {
            let mut built = Light::new(light.name.clone(), point3(light.position), light.intensity);
            built.color = light.color;
            built.constraint = light.constraint.clone();
            built.intensity_range = light.intensity_range;
            scene.add_light(built);
        }

        scene.collections = SceneCollections {
            dynamic_parts: self.collections.dynamic_parts.clone(),
            static_lights: self.collections.static_lights.clone(),
            dynamic_lights: self.collections.dynamic_lights.clone(),
            custom_bboxes: self.collections.custom_bboxes.clone(),
        };
        // A malformed record only costs its own object
        scene.classified = self
            .classified
            .iter()
            .filter(|classified| match classified.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(object = %classified.object, error = %e, "Classification record skipped");
                    false
                }
            })
            .cloned()
            .collect();

        scene.validate()?;
        self.run.validate()?;

        info!(
            objects = scene.objects.len(),
            lights = scene.lights.len(),
            classified = scene.classified.len(),
            "Built scene"
        );

        Ok(LoadedScene {
            scene,
            run: self.run.clone(),
            constraint_kinds,
        })
    }
}

/// Load and build a scene file, resolving meshes next to it
pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<LoadedScene> {
    let path = path.as_ref();
    let description = SceneDescription::load(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    description.build(base_dir)
}
