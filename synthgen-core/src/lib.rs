//! Core data structures for synthgen
//!
//! This crate provides the scene model used to generate synthetic datasets:
//! points, meshes, bounding regions, poses, the camera, lights and the
//! per-object classification records that drive labeling.

pub mod point;
pub mod region;
pub mod mesh;
pub mod pose;
pub mod transform;
pub mod camera;
pub mod classification;
pub mod scene;
pub mod error;

pub use point::*;
pub use region::*;
pub use mesh::*;
pub use pose::*;
pub use transform::*;
pub use camera::*;
pub use classification::*;
pub use scene::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix4, Point3, Vector3};
