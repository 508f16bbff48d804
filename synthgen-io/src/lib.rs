//! Scene loading and dataset output for synthgen
//!
//! This crate reads scenes (JSON scene files with OBJ or primitive meshes) and
//! writes the artifacts of a dataset: the directory layout, CSV and JSON-lines
//! bounding-box labels and the archive of projected vertices.

pub mod annotations;
pub mod error;
pub mod layout;
pub mod obj;
pub mod projections;
pub mod scene_file;

pub use annotations::*;
pub use error::*;
pub use layout::DatasetLayout;
pub use self::obj::ObjReader;
pub use projections::{FrameProjections, ProjectionArchive};
pub use scene_file::*;

use std::path::Path;
use synthgen_core::{Result, TriangleMesh};

/// Auto-detect format and read mesh
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    match path.extension().and_then(|s| s.to_str()) {
        Some("obj") => ObjReader::read_mesh(path),
        _ => Err(synthgen_core::Error::UnsupportedFormat(format!(
            "Unsupported mesh format: {:?}",
            path.extension()
        ))),
    }
}
