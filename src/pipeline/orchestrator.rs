//! Runs one build or assembly at a time off the caller's task.
//!
//! [`PipelineOrchestrator::submit`] either starts the operation and hands back
//! an [`OperationHandle`], or refuses with [`PipelineError::Busy`] when another
//! operation still holds the single permit. Requests are never queued.
//!
//! Every operation ends with exactly one [`PipelineEvent::Finished`] carrying
//! its [`OperationOutcome`]; errors are classified into a [`FailureReport`]
//! rather than surfaced to the caller as `Err`.

use super::events::{EventSink, FailureReport, OperationOutcome, PipelineEvent};
use crate::error::{FailureKind, PipelineError};
use crate::metrics::Metrics;
use crate::models::{MAX_CONCURRENT_OPERATIONS, MultiModGroup, PipelineConfig};
use crate::services::{BuildRequest, ModBuilder, MultiModAssembler, Restyler, Transcoder};
use crate::state::StateManager;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::JoinHandle;

const ABNORMAL_END: &str = "The operation ended unexpectedly";

/// What the caller asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRequest {
    /// Generate a new single-variant mod
    Build { mod_name: String, style: String },
    /// Merge existing mods into a multi-mod
    Assemble(MultiModGroup),
}

impl OperationRequest {
    pub fn build(mod_name: impl Into<String>, style: impl Into<String>) -> Self {
        Self::Build {
            mod_name: mod_name.into(),
            style: style.into(),
        }
    }

    /// Short human-readable description
    pub fn describe(&self) -> String {
        match self {
            Self::Build { mod_name, .. } => format!("Build mod '{}'", mod_name.trim()),
            Self::Assemble(group) => format!(
                "Assemble multi-mod '{}' from {} sources",
                group.multimod_name.trim(),
                group.source_mod_names.len()
            ),
        }
    }
}

impl FailureReport {
    pub fn from_error(err: &PipelineError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }
}

/// Caller's end of a running operation
pub struct OperationHandle {
    events: mpsc::UnboundedReceiver<PipelineEvent>,
    task: JoinHandle<OperationOutcome>,
}

impl OperationHandle {
    /// Next event in emission order, `None` once the operation is over and drained
    pub async fn next_event(&mut self) -> Option<PipelineEvent> {
        self.events.recv().await
    }

    /// Wait for the terminal outcome, discarding unread events
    pub async fn wait(self) -> OperationOutcome {
        self.collect().await.1
    }

    /// Wait for the terminal outcome and return it with every unread event
    pub async fn collect(mut self) -> (Vec<PipelineEvent>, OperationOutcome) {
        let joined = (&mut self.task).await;

        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }

        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!("Pipeline worker terminated abnormally: {}", err);
                events
                    .iter()
                    .rev()
                    .find_map(|event| match event {
                        PipelineEvent::Finished(outcome) => Some(outcome.clone()),
                        _ => None,
                    })
                    .unwrap_or_else(|| {
                        OperationOutcome::Failed(FailureReport::internal(format!("{ABNORMAL_END}: {err}")))
                    })
            }
        };
        (events, outcome)
    }
}

/// Releases the busy gate, settles state and sends the terminal event, even
/// if the worker panics
struct RunningGuard {
    state: StateManager,
    metrics: Arc<Metrics>,
    events: EventSink,
    permit: Option<OwnedSemaphorePermit>,
}

impl RunningGuard {
    fn finish(mut self, outcome: OperationOutcome) -> OperationOutcome {
        self.state.finish_operation(outcome.is_success(), outcome.summary());
        // Release the gate before announcing the outcome so a caller
        // reacting to Finished can submit again immediately.
        self.permit.take();
        self.events.emit(PipelineEvent::Finished(outcome.clone()));
        outcome
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        if self.permit.is_some() {
            let outcome = OperationOutcome::Failed(FailureReport::internal(ABNORMAL_END));
            self.metrics.record_failure();
            self.state.finish_operation(false, outcome.summary());
            self.permit.take();
            self.events.emit(PipelineEvent::Finished(outcome));
        }
    }
}

/// Sequences pipeline operations for a front end
pub struct PipelineOrchestrator {
    transcoder: Arc<dyn Transcoder>,
    restyler: Arc<dyn Restyler>,
    gate: Arc<Semaphore>,
    state: StateManager,
    metrics: Arc<Metrics>,
}

impl PipelineOrchestrator {
    pub fn new(transcoder: Arc<dyn Transcoder>, restyler: Arc<dyn Restyler>) -> Self {
        Self {
            transcoder,
            restyler,
            gate: Arc::new(Semaphore::new(MAX_CONCURRENT_OPERATIONS)),
            state: StateManager::new(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Share an existing state manager instead of a private one
    pub fn with_state(mut self, state: StateManager) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Whether an operation currently holds the gate
    pub fn is_busy(&self) -> bool {
        self.gate.available_permits() == 0
    }

    /// Start `request` against the settings snapshot `config`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(
        &self,
        config: PipelineConfig,
        request: OperationRequest,
    ) -> Result<OperationHandle, PipelineError> {
        let permit = match Arc::clone(&self.gate).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                self.metrics.record_busy_rejection();
                tracing::warn!("Rejected '{}': another operation is running", request.describe());
                return Err(PipelineError::Busy);
            }
        };

        let operation = request.describe();
        let (tx, rx) = mpsc::unbounded_channel();
        let events = EventSink::new(tx).with_state(self.state.clone());

        self.state.begin_operation(operation.clone());
        events.emit(PipelineEvent::Started {
            operation: operation.clone(),
        });
        tracing::info!("Started: {}", operation);

        let guard = RunningGuard {
            state: self.state.clone(),
            metrics: Arc::clone(&self.metrics),
            events: events.clone(),
            permit: Some(permit),
        };
        let worker = Worker {
            transcoder: Arc::clone(&self.transcoder),
            restyler: Arc::clone(&self.restyler),
            metrics: Arc::clone(&self.metrics),
            events,
        };

        let task = tokio::spawn(async move {
            let start = Instant::now();
            let outcome = worker.run(config, request).await;
            worker.metrics.record_operation_time(start.elapsed());
            worker.record(&outcome);
            guard.finish(outcome)
        });

        Ok(OperationHandle { events: rx, task })
    }
}

struct Worker {
    transcoder: Arc<dyn Transcoder>,
    restyler: Arc<dyn Restyler>,
    metrics: Arc<Metrics>,
    events: EventSink,
}

impl Worker {
    async fn run(&self, config: PipelineConfig, request: OperationRequest) -> OperationOutcome {
        let result = match request {
            OperationRequest::Build { mod_name, style } => self.build(&config, &mod_name, &style).await,
            OperationRequest::Assemble(group) => self.assemble(&config, group).await,
        };

        result.unwrap_or_else(|err| {
            self.events.error(err.to_string());
            OperationOutcome::Failed(FailureReport::from_error(&err))
        })
    }

    async fn build(
        &self,
        config: &PipelineConfig,
        mod_name: &str,
        style: &str,
    ) -> Result<OperationOutcome, PipelineError> {
        let request = BuildRequest::from_config(config, mod_name, style);
        let builder = ModBuilder::new(
            config.outfits_root(),
            Arc::clone(&self.transcoder),
            Arc::clone(&self.restyler),
        )
        .with_restyle_timeout(config.restyle_timeout)
        .with_events(self.events.clone());

        builder.build(&request).await.map(OperationOutcome::Built)
    }

    async fn assemble(
        &self,
        config: &PipelineConfig,
        group: MultiModGroup,
    ) -> Result<OperationOutcome, PipelineError> {
        let assembler = MultiModAssembler::new(config.outfits_root())
            .with_author(config.author.clone())
            .with_fallback_resolution(config.resolution)
            .with_events(self.events.clone());

        // Copies and deletes are plain blocking filesystem work
        match tokio::task::spawn_blocking(move || assembler.assemble(&group)).await {
            Ok(result) => result.map(OperationOutcome::Assembled),
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => Ok(OperationOutcome::Failed(FailureReport::internal(err.to_string()))),
        }
    }

    fn record(&self, outcome: &OperationOutcome) {
        match outcome {
            OperationOutcome::Built(_) => self.metrics.record_build_completed(),
            OperationOutcome::Assembled(report) => {
                self.metrics.record_assembly_completed();
                self.metrics.record_cleanup_warnings(report.warnings.len());
            }
            OperationOutcome::Failed(failure) => {
                tracing::error!("Operation failed ({:?}): {}", failure.kind, failure.message);
                self.metrics.record_failure();
            }
        }
        tracing::info!("{}", outcome.summary());
    }
}
