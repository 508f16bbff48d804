//! Progress reporting for render runs

use std::time::Duration;
use tracing::info;

/// Width of the textual progress bar
pub const BAR_WIDTH: usize = 10;

/// State after a frame completes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    /// Frames completed so far
    pub completed: usize,
    pub total: usize,
    /// Time spent on the frame that just completed
    pub frame_time: Duration,
}

impl ProgressUpdate {
    /// Bar like `[###       ]`, one `#` per completed tenth
    pub fn bar(&self) -> String {
        let filled = if self.total == 0 {
            BAR_WIDTH
        } else {
            (self.completed.min(self.total) * BAR_WIDTH) / self.total
        };
        format!("[{}{}]", "#".repeat(filled), " ".repeat(BAR_WIDTH - filled))
    }

    /// Remaining time assuming every frame takes as long as the last one
    pub fn eta(&self) -> Duration {
        let remaining = self.total.saturating_sub(self.completed) as u32;
        self.frame_time * remaining
    }
}

/// Receives progress of a run
pub trait ProgressReporter {
    fn on_start(&mut self, _total: usize) {}
    fn on_frame(&mut self, update: &ProgressUpdate);
    fn on_finish(&mut self, _completed: usize) {}
}

/// Logs progress through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn on_start(&mut self, total: usize) {
        info!(total, "Rendering started");
    }

    fn on_frame(&mut self, update: &ProgressUpdate) {
        info!(
            "{} {}/{} eta {:.1}s",
            update.bar(),
            update.completed,
            update.total,
            update.eta().as_secs_f32()
        );
    }

    fn on_finish(&mut self, completed: usize) {
        info!(completed, "Rendering finished");
    }
}

/// Discards progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn on_frame(&mut self, _update: &ProgressUpdate) {}
}
