//! Progress reporting utilities using indicatif.
//!
//! The scheduler reports progress through the [`ProgressCallback`] trait;
//! [`Progress`] is the bundled implementation that renders a terminal bar.
//! Callbacks arrive from worker threads in completion order and must be
//! treated as non-blocking and reentrant-safe.

use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Progress callback for pipeline stages.
///
/// Implement this trait to receive progress updates while hashing stages
/// run. Invocations happen on scheduler worker threads; no particular thread
/// or ordering beyond monotonically growing `completed` is guaranteed.
pub trait ProgressCallback: Send + Sync {
    /// Called when a stage starts.
    ///
    /// # Arguments
    ///
    /// * `label` - Name of the stage (e.g. "fingerprint", "digest")
    /// * `total` - Total number of items to process
    fn on_stage_start(&self, label: &str, total: usize);

    /// Called as each item completes.
    ///
    /// # Arguments
    ///
    /// * `label` - Name of the stage
    /// * `completed` - Items finished so far
    /// * `total` - Total number of items
    fn on_progress(&self, label: &str, completed: usize, total: usize);

    /// Called when a stage completes.
    fn on_stage_end(&self, label: &str);
}

/// Terminal progress reporter backed by indicatif.
///
/// Stages run sequentially, so a single active bar is kept at a time.
pub struct Progress {
    multi: MultiProgress,
    active: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            active: Mutex::new(None),
            quiet,
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }
}

impl ProgressCallback for Progress {
    fn on_stage_start(&self, label: &str, total: usize) {
        if self.quiet {
            return;
        }
        let pb = self.multi.add(ProgressBar::new(total as u64));
        pb.set_style(Self::bar_style());
        pb.set_message(label.to_string());
        *self.active.lock().unwrap() = Some(pb);
    }

    fn on_progress(&self, _label: &str, completed: usize, _total: usize) {
        if self.quiet {
            return;
        }
        if let Some(ref pb) = *self.active.lock().unwrap() {
            pb.set_position(completed as u64);
        }
    }

    fn on_stage_end(&self, label: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active.lock().unwrap().take() {
            pb.finish_with_message(format!("{} complete", label));
        }
    }
}
