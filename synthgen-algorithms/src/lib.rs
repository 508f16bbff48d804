//! # synthgen Algorithms
//!
//! Randomization and labeling algorithms for synthetic dataset generation.
//!
//! This crate provides the bounded rejection sampler, point-in-volume tests,
//! sampling from constraint geometry, pose trajectories, light intensity
//! randomization, dataset split assignment and projection of geometry into
//! pixel-space bounding boxes.

pub mod sampling;
pub mod enclosure;
pub mod constraint;
pub mod trajectory;
pub mod projection;
pub mod lighting;
pub mod split;

// Re-export commonly used items
pub use sampling::*;
pub use enclosure::*;
pub use constraint::*;
pub use trajectory::*;
pub use projection::*;
pub use lighting::*;
pub use split::*;
