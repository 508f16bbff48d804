//! # synthgen
//!
//! Domain-randomized synthetic image datasets for object detection.
//!
//! This is the umbrella crate over the synthgen workspace:
//!
//! - **Core**: scene model (meshes, poses, camera, lights, classifications)
//! - **Algorithms**: constraint sampling, trajectories, projection, splits
//! - **I/O**: scene files, OBJ meshes and dataset writers
//! - **Render**: software renderer and the render loop
//!
//! ## Quick Start
//!
//! ```no_run
//! use rand::SeedableRng;
//! use synthgen::prelude::*;
//!
//! let mut loaded = load_scene("scene.json")?;
//! let mut rng = rand::rngs::StdRng::seed_from_u64(loaded.run.seed.unwrap_or(0));
//! let summary = render_dataset(&mut loaded, Box::new(LogProgress), &mut rng)?;
//! println!("rendered {} frames", summary.frames);
//! # Ok::<(), synthgen::Error>(())
//! ```

pub use synthgen_core::*;

pub use synthgen_algorithms as algorithms;
pub use synthgen_io as io;
pub use synthgen_render as render;

/// Convenient imports for common use cases
pub mod prelude {
    pub use synthgen_algorithms::*;
    pub use synthgen_core::*;
    pub use synthgen_io::{
        load_scene, read_mesh, AnnotationRow, CameraRandomization, CsvAnnotationWriter, DatasetLayout,
        FrameProjections, ImageRecord, IoError, JsonlAnnotationWriter, LightingConfig, LoadedScene, ObjReader,
        OutputConfig, ProjectionArchive, RunConfig, SceneDescription, ShadingConfig,
    };
    pub use synthgen_render::*;
}
