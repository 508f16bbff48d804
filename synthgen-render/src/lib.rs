//! Rendering and the domain-randomized render loop
//!
//! This crate turns a loaded scene into a labeled image dataset:
//! - [`SoftwareRenderer`], a z-buffered rasterizer behind the [`Renderer`] trait
//! - [`RunPlan`], the per-run draw of camera, light and part positions
//! - [`RenderLoopDriver`], which renders every frame and restores the scene
//! - [`DatasetSink`], which writes images, label files and projections

pub mod driver;
pub mod plan;
pub mod progress;
pub mod renderer;
pub mod sink;

pub use driver::*;
pub use plan::*;
pub use progress::*;
pub use renderer::*;
pub use sink::*;

use rand::Rng;
use synthgen_core::Result;
use synthgen_io::LoadedScene;

/// Render a loaded scene into its configured output directory
pub fn render_dataset<G: Rng + ?Sized>(
    loaded: &mut LoadedScene,
    progress: Box<dyn ProgressReporter>,
    rng: &mut G,
) -> Result<RunSummary> {
    let renderer = SoftwareRenderer::new(loaded.run.shading.into());
    let sink = DatasetSink::create(&loaded.run.output)?;
    let mut driver = RenderLoopDriver::new(renderer, sink).with_progress(progress);
    driver.run(loaded, rng)
}
