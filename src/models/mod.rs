//! Data models for the outfit generator.
//!
//! - [`Settings`]: persisted user settings, snapshotted into a [`PipelineConfig`] per operation
//! - [`ModDescriptor`], [`AssetSet`], [`MultiModGroup`]: what a mod is and what gets merged
//! - [`AppState`]: observable pipeline status, owned by [`StateManager`](crate::state::StateManager)
//! - [`MAX_CONCURRENT_OPERATIONS`]: always 1, the outfits directory is a shared resource

pub mod app_state;
pub mod config;
pub mod mod_descriptor;

pub use app_state::{AppState, MAX_CONCURRENT_OPERATIONS};
pub use config::{CommandTemplate, DEFAULT_BASE_TEXTURE, PipelineConfig, Resolution, Settings, ToolSettings};
pub use mod_descriptor::{AssetSet, ModDescriptor, MultiModGroup, SlotEntry};
