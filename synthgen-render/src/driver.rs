//! The render loop
//!
//! [`RenderLoopDriver::run`] draws a [`RunPlan`], then for every frame moves
//! the camera, lights and classified parts, projects the labeled parts,
//! renders and hands the frame to a [`FrameSink`]. The scene is put back the
//! way it was found when the run ends, whether it completed or failed.

use crate::plan::RunPlan;
use crate::progress::{NoProgress, ProgressReporter, ProgressUpdate};
use crate::renderer::Renderer;
use crate::sink::{FrameLabel, FrameOutput, FrameSink};
use rand::Rng;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use synthgen_algorithms::{project_vertices, randomize_intensity, ConstraintKind, PixelBox};
use synthgen_core::{ActiveClassification, Pose, Result, Scene};
use synthgen_io::{LoadedScene, RunConfig};
use tracing::{info, warn};

/// Where the driver is in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverState {
    #[default]
    Idle,
    /// Drawing the run plan
    Sampling,
    /// Producing the given frame
    Rendering(usize),
    /// Putting the scene back
    Restoring,
}

/// What a finished run produced
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunSummary {
    pub frames: usize,
    /// Labels written across all frames
    pub labels: usize,
    pub elapsed: Duration,
}

/// Drives a renderer over a scene and sends the frames to a sink
pub struct RenderLoopDriver<R: Renderer, S: FrameSink> {
    renderer: R,
    sink: S,
    progress: Box<dyn ProgressReporter>,
    state: DriverState,
}

impl<R: Renderer, S: FrameSink> RenderLoopDriver<R, S> {
    pub fn new(renderer: R, sink: S) -> Self {
        Self {
            renderer,
            sink,
            progress: Box::new(NoProgress),
            state: DriverState::Idle,
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Render `loaded.run.render_count` frames.
    ///
    /// Object poses, light positions and intensities and the camera are
    /// restored before returning, and the sink is finished even when a frame
    /// fails. The first error wins.
    pub fn run<G: Rng + ?Sized>(&mut self, loaded: &mut LoadedScene, rng: &mut G) -> Result<RunSummary> {
        let started = Instant::now();
        let snapshot = loaded.scene.snapshot();
        let tracking = loaded.scene.camera.tracking;

        let mut summary = RunSummary::default();
        let result = self.render_frames(
            &mut loaded.scene,
            &loaded.run,
            &loaded.constraint_kinds,
            rng,
            &mut summary,
        );

        self.state = DriverState::Restoring;
        loaded.scene.restore(&snapshot);
        loaded.scene.camera.tracking = tracking;
        let finished = self.sink.finish();
        self.progress.on_finish(summary.frames);
        self.state = DriverState::Idle;

        summary.elapsed = started.elapsed();
        if let Err(e) = &result {
            warn!(completed = summary.frames, error = %e, "Run stopped early, scene restored");
        }
        result?;
        finished?;
        info!(frames = summary.frames, labels = summary.labels, elapsed = ?summary.elapsed, "Run complete");
        Ok(summary)
    }

    fn render_frames<G: Rng + ?Sized>(
        &mut self,
        scene: &mut Scene,
        run: &RunConfig,
        kinds: &HashMap<String, ConstraintKind>,
        rng: &mut G,
        summary: &mut RunSummary,
    ) -> Result<()> {
        self.state = DriverState::Sampling;
        let plan = RunPlan::build(scene, run, kinds, rng)?;

        let initial_intensity: Vec<f32> = scene.lights.iter().map(|l| l.intensity).collect();
        let dynamic_lights = scene.dynamic_light_indices();
        // Parts return to their rest pose on frames where their classification is inactive
        let rest_poses: Vec<(usize, Pose)> = plan
            .dependencies
            .iter()
            .map(|d| (d.part, scene.objects[d.part].pose))
            .collect();

        self.progress.on_start(plan.frame_count);
        for frame in 0..plan.frame_count {
            self.state = DriverState::Rendering(frame);
            let frame_started = Instant::now();

            for &light in &dynamic_lights {
                scene.lights[light].intensity =
                    randomize_intensity(&scene.lights[light], initial_intensity[light], &run.lighting.intensity, rng)?;
            }
            for light_plan in &plan.lights {
                if let Some(position) = light_plan.trajectory.positions().get(frame) {
                    scene.lights[light_plan.light].position = *position;
                }
            }

            for (part, pose) in &rest_poses {
                scene.objects[*part].pose = *pose;
            }
            let mut active: Vec<(usize, ActiveClassification)> = scene
                .classified
                .iter()
                .enumerate()
                .filter_map(|(ci, classified)| classified.active_at(frame, plan.frame_count).map(|a| (ci, a)))
                .collect();
            // A part left at rest would not show its classification, so that label is dropped
            active.retain(|(ci, active_classification)| {
                let Some(dependency) = plan.dependency(*ci, active_classification.index) else {
                    return true;
                };
                let placed = dependency
                    .trajectory
                    .apply(&mut scene.objects[dependency.part].pose, active_classification.local_frame);
                if !placed {
                    warn!(frame, part = %scene.objects[dependency.part].name, "No position left for part, label dropped");
                }
                placed
            });

            // Aim after the parts moved so tracking sees this frame's pose
            if let Some(camera) = &plan.camera {
                camera.apply(&mut scene.camera.pose, frame);
            }
            if let Some(target) = plan.camera_target {
                scene.camera.tracking = scene.world_mesh(target)?.bounding_region().map(|r| r.center());
            }

            let labels = label_frame(scene, &active)?;
            let image = self.renderer.render(scene)?;

            summary.labels += labels.len();
            self.sink.write_frame(&FrameOutput {
                index: frame,
                image,
                ml_use: plan.ml_use[frame],
                camera_position: scene.camera.pose.position,
                resolution: scene.camera.resolution,
                labels,
            })?;
            summary.frames += 1;

            self.progress.on_frame(&ProgressUpdate {
                completed: frame + 1,
                total: plan.frame_count,
                frame_time: frame_started.elapsed(),
            });
        }
        Ok(())
    }
}

/// Project the labeled part of every active classification
fn label_frame(scene: &Scene, active: &[(usize, ActiveClassification)]) -> Result<Vec<FrameLabel>> {
    let mut labels = Vec::with_capacity(active.len());
    for (ci, active_classification) in active {
        let classified = &scene.classified[*ci];
        let classification = &classified.classifications[active_classification.index];
        let part = classified.labeled_part(active_classification.index);
        let Some(index) = scene.object_index(part) else {
            warn!(object = %classified.object, part, "Labeled object not found, frame left unlabeled");
            continue;
        };

        let mesh = scene.world_mesh(index)?;
        let vertices = project_vertices(&mesh.vertices, &scene.camera);
        let pixel_box = PixelBox::from_vertices(&vertices);
        labels.push(FrameLabel {
            object: classified.object.clone(),
            label: classification.label.clone(),
            part: part.to_string(),
            bbox: pixel_box.map(|b| b.normalized(scene.camera.resolution)),
            pixel_box,
            vertices,
        });
    }
    Ok(labels)
}
