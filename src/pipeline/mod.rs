//! Pipeline module - sequencing operations and reporting their progress.
//!
//! - [`PipelineOrchestrator`]: single-operation gate and worker spawning
//! - [`OperationHandle`]: the caller's receiver for events and the outcome
//! - [`PipelineEvent`] / [`EventSink`]: ordered, non-blocking progress delivery

pub mod events;
pub mod orchestrator;

pub use events::{EventSink, FailureReport, LogLevel, OperationOutcome, PipelineEvent};
pub use orchestrator::{OperationHandle, OperationRequest, PipelineOrchestrator};
