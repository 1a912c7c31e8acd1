//! Error types for the mod-asset pipeline.
//!
//! Every failure an operation can hit is a [`PipelineError`]. The orchestrator
//! classifies each one with [`PipelineError::kind`] before handing a single
//! terminal failure to the caller. [`CleanupWarning`] is not an
//! error: it is reported alongside a successful result.

use crate::services::capabilities::{RestyleError, TranscodeError};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Why a candidate mod name was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameRejection {
    #[error("name is empty")]
    Empty,

    #[error("name is longer than {0} characters")]
    TooLong(usize),

    #[error("name contains the forbidden character {0:?}")]
    ForbiddenCharacter(char),

    #[error("name is a relative path component")]
    Traversal,

    #[error("name may not start with a dot")]
    LeadingDot,

    #[error("name may not end with a dot or space")]
    TrailingDotOrSpace,

    #[error("name is reserved by the system or the game")]
    Reserved,
}

/// A mod name that cannot be used as a directory under the outfits root
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid mod name {name:?}: {reason}")]
pub struct InvalidNameError {
    pub name: String,
    pub reason: NameRejection,
}

/// Classification of a failed operation, used by callers to decide what to tell the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    InvalidName,
    InvalidRequest,
    NotConfigured,
    MissingAsset,
    Conversion,
    Generation,
    Quota,
    Timeout,
    SourceNotFound,
    EmptySourceList,
    DuplicateSource,
    SchemaMismatch,
    DestinationExists,
    Busy,
    Io,
    Internal,
}

/// Errors that can occur while building or assembling a mod
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidName(#[from] InvalidNameError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error(
        "Base texture not found at {path}. Check that the Haydee game path is correct and up to date"
    )]
    MissingAsset { path: Utf8PathBuf },

    #[error("Texture conversion failed: {0}")]
    Conversion(#[from] TranscodeError),

    #[error("Image generation failed: {0}")]
    Generation(String),

    #[error("Image generation quota exceeded, try again later: {0}")]
    Quota(String),

    #[error("Image generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Source mod '{name}' not found at {path}")]
    SourceNotFound { name: String, path: Utf8PathBuf },

    #[error("No source mods were selected")]
    EmptySourceList,

    #[error("Source mod '{0}' is listed more than once")]
    DuplicateSource(String),

    #[error("Source mod '{name}' does not follow the expected layout: missing {missing}")]
    SchemaMismatch { name: String, missing: String },

    #[error("Destination already exists and is not empty: {0}")]
    DestinationExists(Utf8PathBuf),

    #[error("Another operation is already running")]
    Busy,

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Classify this error
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidName(_) => FailureKind::InvalidName,
            Self::InvalidRequest(_) => FailureKind::InvalidRequest,
            Self::NotConfigured(_) => FailureKind::NotConfigured,
            Self::MissingAsset { .. } => FailureKind::MissingAsset,
            Self::Conversion(_) => FailureKind::Conversion,
            Self::Generation(_) => FailureKind::Generation,
            Self::Quota(_) => FailureKind::Quota,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::SourceNotFound { .. } => FailureKind::SourceNotFound,
            Self::EmptySourceList => FailureKind::EmptySourceList,
            Self::DuplicateSource(_) => FailureKind::DuplicateSource,
            Self::SchemaMismatch { .. } => FailureKind::SchemaMismatch,
            Self::DestinationExists(_) => FailureKind::DestinationExists,
            Self::Busy => FailureKind::Busy,
            Self::Io { .. } => FailureKind::Io,
        }
    }

    /// Whether retrying the same request later could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Quota(_) | Self::Timeout(_) | Self::Busy)
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<RestyleError> for PipelineError {
    fn from(err: RestyleError) -> Self {
        match err {
            RestyleError::Generation(msg) => Self::Generation(msg),
            RestyleError::Quota(msg) => Self::Quota(msg),
            RestyleError::Timeout(after) => Self::Timeout(after),
        }
    }
}

/// Attach a description to an I/O failure
pub(crate) trait IoResultExt<T> {
    fn io_context<F, S>(self, context: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn io_context<F, S>(self, context: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| PipelineError::io(context(), source))
    }
}

/// Non-fatal problem encountered after an operation already succeeded
///
/// Raised when a source mod could not be removed after a successful merge.
/// The combined mod is valid; the leftover directory just needs manual removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupWarning {
    pub path: Utf8PathBuf,
    pub message: String,
}

impl CleanupWarning {
    pub fn new(path: &Utf8Path, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not remove {}: {}", self.path, self.message)
    }
}
