//! Progress and log events delivered from a running operation to its caller.
//!
//! Events travel over an unbounded tokio channel: sending never blocks the
//! worker and receivers see events in the order they were produced. Every
//! event emitted through an [`EventSink`] is also written to the tracing log.

use crate::error::{CleanupWarning, FailureKind};
use crate::models::ModDescriptor;
use crate::services::AssemblyReport;
use crate::state::StateManager;
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Terminal failure of an operation, already classified
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    pub kind: FailureKind,
    pub message: String,
    pub retryable: bool,
}

/// Final result of one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OperationOutcome {
    Built(ModDescriptor),
    Assembled(AssemblyReport),
    Failed(FailureReport),
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    /// One line suitable for a status bar or a message box
    pub fn summary(&self) -> String {
        match self {
            Self::Built(descriptor) => format!("Mod '{}' generated successfully", descriptor.name),
            Self::Assembled(report) if report.warnings.is_empty() => format!(
                "Multi-mod '{}' created with {} slots",
                report.descriptor.name,
                report.descriptor.slots.len()
            ),
            Self::Assembled(report) => format!(
                "Multi-mod '{}' created with {} slots ({} cleanup warnings)",
                report.descriptor.name,
                report.descriptor.slots.len(),
                report.warnings.len()
            ),
            Self::Failed(failure) => failure.message.clone(),
        }
    }
}

/// Event emitted while an operation runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PipelineEvent {
    Started { operation: String },
    Step { index: usize, total: usize, label: String },
    Log { level: LogLevel, message: String },
    Warning(CleanupWarning),
    Finished(OperationOutcome),
}

/// Sending half handed to builders and assemblers
#[derive(Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<PipelineEvent>>,
    state: Option<StateManager>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        Self {
            tx: Some(tx),
            state: None,
        }
    }

    /// A sink that only writes to the tracing log
    pub fn silent() -> Self {
        Self::default()
    }

    /// Mirror steps and warnings into `state`
    pub fn with_state(mut self, state: StateManager) -> Self {
        self.state = Some(state);
        self
    }

    pub fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.tx {
            // The receiver may already be gone; the operation keeps going regardless.
            let _ = tx.send(event);
        }
    }

    pub fn step(&self, index: usize, total: usize, label: impl Into<String>) {
        let label = label.into();
        tracing::info!("[{}/{}] {}", index, total, label);
        if let Some(state) = &self.state {
            state.update_progress(index, total, label.clone());
        }
        self.emit(PipelineEvent::Step { index, total, label });
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.emit(PipelineEvent::Log {
            level: LogLevel::Info,
            message,
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{}", message);
        self.emit(PipelineEvent::Log {
            level: LogLevel::Error,
            message,
        });
    }

    pub fn warning(&self, warning: CleanupWarning) {
        tracing::warn!("{}", warning);
        if let Some(state) = &self.state {
            state.record_warning();
        }
        self.emit(PipelineEvent::Warning(warning));
    }
}
