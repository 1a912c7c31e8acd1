/// Maximum number of pipeline operations running at once.
///
/// **IMPORTANT:** This is hardcoded to 1. Builds and assemblies write into the
/// shared outfits directory, and two operations targeting the same mod name
/// would race on the final rename. A second request while one is running is
/// rejected as busy rather than queued.
///
/// Enforced by [`crate::pipeline::PipelineOrchestrator`] with a
/// `tokio::sync::Semaphore`.
pub const MAX_CONCURRENT_OPERATIONS: usize = 1;

/// Observable status of the pipeline.
///
/// Wrapped in `Arc<RwLock<AppState>>` by [`crate::state::StateManager`]; use its
/// `read()`/`update()` methods instead of touching this directly.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    // Runtime state
    pub is_running: bool,
    pub current_operation: Option<String>,
    pub current_step: String,

    // Progress state
    pub step: usize,
    pub total_steps: usize,

    // Results
    pub succeeded: usize,
    pub failed: usize,
    pub warnings: usize,
    pub last_message: Option<String>,
}

impl AppState {
    /// Fraction of the current operation completed, in `0.0..=1.0`
    pub fn progress_fraction(&self) -> f32 {
        if self.total_steps == 0 {
            0.0
        } else {
            (self.step.min(self.total_steps) as f32) / (self.total_steps as f32)
        }
    }

    /// Clear everything tied to the current operation.
    pub fn reset_operation_state(&mut self) {
        self.is_running = false;
        self.current_operation = None;
        self.current_step.clear();
        self.step = 0;
        self.total_steps = 0;
    }

    /// Record the end of an operation.
    pub fn record_outcome(&mut self, success: bool, message: String) {
        if success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.last_message = Some(message);
        self.reset_operation_state();
    }
}
