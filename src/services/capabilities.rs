//! Capabilities the pipeline consumes but does not implement.
//!
//! Texture transcoding (DDS <-> PNG) and AI restyling are provided by external
//! collaborators. The pipeline only relies on these two traits, which keeps it
//! testable with in-process stubs. [`crate::services::external`] ships
//! subprocess-backed implementations for the binary.

use crate::models::Resolution;
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Texture container formats the pipeline moves between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// The game's native DirectDraw Surface textures
    Dds,
    /// Interchange format accepted by the restyle service
    Png,
}

impl TextureFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Dds => "dds",
            Self::Png => "png",
        }
    }
}

/// Errors reported by a [`Transcoder`]
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("converter exited with {code:?}: {message}")]
    Failed { code: Option<i32>, message: String },

    #[error("converter did not produce {0}")]
    MissingOutput(Utf8PathBuf),

    #[error("failed to run converter: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a [`Restyler`]
///
/// Quota and timeout are kept apart from generic rejection so callers can
/// offer a retry for the former but not the latter.
#[derive(Error, Debug)]
pub enum RestyleError {
    #[error("{0}")]
    Generation(String),

    #[error("{0}")]
    Quota(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Converts a texture between formats, resizing to `resolution`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(
        &self,
        input: &Utf8Path,
        output: &Utf8Path,
        format: TextureFormat,
        resolution: Resolution,
    ) -> Result<(), TranscodeError>;
}

/// Produces a restyled copy of an image from a natural-language description
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Restyler: Send + Sync {
    /// Write the restyled image somewhere inside `output_dir` and return its path
    async fn restyle(
        &self,
        base_image: &Utf8Path,
        style: &str,
        resolution: Resolution,
        output_dir: &Utf8Path,
    ) -> Result<Utf8PathBuf, RestyleError>;
}
