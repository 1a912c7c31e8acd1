// State management module
//
// This module provides the StateManager which wraps AppState with thread-safe access
// using Arc<RwLock<T>> and emits change events for front ends.

use crate::models::AppState;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when state is modified
///
/// These let a front end follow the pipeline without polling the state.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// An operation has been accepted and started
    OperationStarted { operation: String },

    /// A step of the current operation has begun
    ProgressUpdated {
        step: usize,
        total: usize,
        label: String,
    },

    /// A cleanup warning was recorded for the current operation
    WarningRecorded { count: usize },

    /// The current operation has finished
    OperationFinished { success: bool, summary: String },

    /// State has been reset
    StateReset,
}

/// Thread-safe state manager with event emission
///
/// - Provides thread-safe access to [`AppState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Supports subscribing to state changes via tokio broadcast channels
///
/// Clones share the same state and channel.
pub struct StateManager {
    state: Arc<RwLock<AppState>>,

    /// Multiple subscribers can listen for state changes
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with default state and a 100 event buffer
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(AppState::default())),
            state_tx,
        }
    }

    /// Clone of the current state, safe to hold without locks
    pub fn snapshot(&self) -> AppState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let running = state_manager.read(|state| state.is_running);
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// Captures the old state, applies `update_fn`, then emits one event per
    /// detected change. Returns the emitted events.
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = self.detect_changes(&old_state, &state);

        for change in &changes {
            // Ignore send errors - it's OK if no one is listening
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Subscribe to all future state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(&self, old: &AppState, new: &AppState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.is_running != new.is_running {
            if new.is_running {
                changes.push(StateChange::OperationStarted {
                    operation: new.current_operation.clone().unwrap_or_default(),
                });
            } else {
                changes.push(StateChange::OperationFinished {
                    success: new.succeeded > old.succeeded,
                    summary: new.last_message.clone().unwrap_or_default(),
                });
            }
        }

        if new.is_running
            && (old.step != new.step
                || old.total_steps != new.total_steps
                || old.current_step != new.current_step)
        {
            changes.push(StateChange::ProgressUpdated {
                step: new.step,
                total: new.total_steps,
                label: new.current_step.clone(),
            });
        }

        if old.warnings != new.warnings {
            changes.push(StateChange::WarningRecorded {
                count: new.warnings,
            });
        }

        changes
    }

    // Convenience methods for common state updates

    /// Mark an operation as running
    pub fn begin_operation(&self, operation: impl Into<String>) -> Vec<StateChange> {
        let operation = operation.into();
        self.update(|state| {
            state.reset_operation_state();
            state.is_running = true;
            state.current_operation = Some(operation);
        })
    }

    /// Record the step the current operation has reached
    pub fn update_progress(&self, step: usize, total: usize, label: impl Into<String>) -> Vec<StateChange> {
        let label = label.into();
        self.update(|state| {
            state.step = step;
            state.total_steps = total;
            state.current_step = label;
        })
    }

    pub fn record_warning(&self) -> Vec<StateChange> {
        self.update(|state| state.warnings += 1)
    }

    /// Record the outcome and return to idle
    pub fn finish_operation(&self, success: bool, summary: impl Into<String>) -> Vec<StateChange> {
        let summary = summary.into();
        self.update(|state| state.record_outcome(success, summary))
    }

    /// Clear counters and any operation state
    pub fn reset(&self) -> Vec<StateChange> {
        let mut changes = self.update(|state| *state = AppState::default());

        let reset_event = StateChange::StateReset;
        let _ = self.state_tx.send(reset_event.clone());
        changes.push(reset_event);

        changes
    }

    /// Whether an operation is currently running
    pub fn is_running(&self) -> bool {
        self.read(|state| state.is_running)
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}
