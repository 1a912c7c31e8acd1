// Operation metrics module
//
// Lock-free counters for pipeline operations, logged on shutdown

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters shared by the orchestrator and its running operations
#[derive(Debug)]
pub struct Metrics {
    /// Mods generated successfully
    pub builds_completed: AtomicUsize,

    /// Multi-mods assembled successfully
    pub assemblies_completed: AtomicUsize,

    /// Operations that ended in a failure
    pub operations_failed: AtomicUsize,

    /// Requests rejected because another operation was running
    pub busy_rejections: AtomicUsize,

    /// Source deletions that failed after a successful assembly
    pub cleanup_warnings: AtomicUsize,

    /// Wall time spent in operations, in milliseconds
    pub total_operation_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            builds_completed: AtomicUsize::new(0),
            assemblies_completed: AtomicUsize::new(0),
            operations_failed: AtomicUsize::new(0),
            busy_rejections: AtomicUsize::new(0),
            cleanup_warnings: AtomicUsize::new(0),
            total_operation_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_build_completed(&self) {
        self.builds_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_assembly_completed(&self) {
        self.assemblies_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.operations_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_busy_rejection(&self) {
        self.busy_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cleanup_warnings(&self, count: usize) {
        self.cleanup_warnings.fetch_add(count, Ordering::Relaxed);
    }

    /// Record wall time of one finished operation
    pub fn record_operation_time(&self, duration: Duration) {
        self.total_operation_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// Operations that ran to an outcome, successful or not
    pub fn operations_finished(&self) -> usize {
        self.builds_completed.load(Ordering::Relaxed)
            + self.assemblies_completed.load(Ordering::Relaxed)
            + self.operations_failed.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average operation time in milliseconds
    pub fn avg_operation_time_ms(&self) -> f64 {
        let total = self.total_operation_time_ms.load(Ordering::Relaxed);
        let count = self.operations_finished();
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Pipeline Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Operations: {} builds, {} assemblies, {} failed, {} rejected as busy",
            self.builds_completed.load(Ordering::Relaxed),
            self.assemblies_completed.load(Ordering::Relaxed),
            self.operations_failed.load(Ordering::Relaxed),
            self.busy_rejections.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Total operation time: {:.2}s (avg: {:.2}ms per operation)",
            self.total_operation_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_operation_time_ms()
        );
        tracing::info!(
            "Cleanup warnings: {}",
            self.cleanup_warnings.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
