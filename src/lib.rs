// Haydee Outfit Generator - AI-restyled outfit mods for Haydee
//
// This is the library crate containing the mod pipeline and its data structures.
// The binary crate (main.rs) provides the command-line entry point.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use error::{CleanupWarning, FailureKind, InvalidNameError, PipelineError};
pub use models::{AppState, ModDescriptor, MultiModGroup, PipelineConfig, Resolution, Settings};
pub use pipeline::{OperationHandle, OperationOutcome, OperationRequest, PipelineEvent, PipelineOrchestrator};
pub use services::{AssemblyReport, ModBuilder, MultiModAssembler};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
