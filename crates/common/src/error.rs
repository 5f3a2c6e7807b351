//! Error types shared across Nexus crates.

use std::path::PathBuf;

/// Message shown to the user whenever an export fails past the point of
/// engine loading. The engine does not tell us *why* a run failed (out of
/// memory, corrupt input and malformed commands all look alike), so callers
/// only ever see this.
pub const EXPORT_FAILED_MESSAGE: &str =
    "Export failed (video too big or low RAM). Try shorter video.";

/// Top-level error type for Nexus operations.
#[derive(Debug, thiserror::Error)]
pub enum NexusError {
    #[error("Engine error: {message}")]
    Engine { message: String },

    #[error("Staging error: {message}")]
    Staging { message: String },

    #[error("Retrieval error: {message}")]
    Retrieval { message: String },

    #[error("Compile error: {message}")]
    Compile { message: String },

    #[error("{cause}")]
    ExportFailed { cause: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using NexusError.
pub type NexusResult<T> = Result<T, NexusError>;

impl NexusError {
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine {
            message: msg.into(),
        }
    }

    pub fn staging(msg: impl Into<String>) -> Self {
        Self::Staging {
            message: msg.into(),
        }
    }

    pub fn retrieval(msg: impl Into<String>) -> Self {
        Self::Retrieval {
            message: msg.into(),
        }
    }

    pub fn compile(msg: impl Into<String>) -> Self {
        Self::Compile {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// The single user-facing failure an export collapses into.
    pub fn export_failed() -> Self {
        Self::ExportFailed {
            cause: EXPORT_FAILED_MESSAGE.to_string(),
        }
    }
}
