//! Services module - the mod generation and assembly logic.
//!
//! Everything here is independent of any front end. Services take explicit
//! inputs (an outfits root, a request, capability handles) and report progress
//! through an [`EventSink`](crate::pipeline::EventSink).
//!
//! # Components
//!
//! - [`layout`]: name validation and the on-disk shape of a mod
//! - [`game_files`]: the game's text formats for `.mtl` and `.outfit` files
//! - [`staging`]: hidden staging directories published by a single rename
//! - [`ModBuilder`]: turns a base texture and a style prompt into a new mod
//! - [`MultiModAssembler`]: merges existing mods into one slot-selectable mod
//! - [`Transcoder`] / [`Restyler`]: capabilities supplied from outside, with
//!   subprocess implementations in [`external`]
//!
//! # Failure behaviour
//!
//! Any failing operation leaves the outfits directory as it found it. Writes
//! only ever happen in a staging directory until the final commit, and source
//! mods are deleted (when asked) only after that commit succeeded.

pub mod assembler;
pub mod builder;
pub mod capabilities;
pub mod external;
pub mod game_files;
pub mod layout;
pub mod staging;

pub use assembler::{AssemblyReport, LocalModFiles, ModFiles, MultiModAssembler, SourceMod, validate_sources};
pub use builder::{BUILD_STEPS, BuildRequest, ModBuilder};
pub use capabilities::{RestyleError, Restyler, TextureFormat, TranscodeError, Transcoder};
pub use external::{CommandRestyler, CommandTranscoder};
pub use layout::{ModAssetSchema, resolve_mod_directory, validate_name};
