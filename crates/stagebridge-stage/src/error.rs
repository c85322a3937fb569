//! Error types for stage clients and the export/import phases

use stagebridge_core::ConfigError;
use std::path::Path;

/// Errors reported by a [`StageClient`](crate::StageClient)
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Errors that abort an export or import run
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// No trigger marker was found; raised before any command runs
    #[error("Missing trigger marker: {0}")]
    MissingTriggerMarker(String),

    #[error("Invalid trigger marker {path}: {reason}")]
    InvalidTriggerMarker { path: String, reason: String },

    /// A bulk copy, listing or retrieval command failed
    #[error("External command failed: {command}")]
    ExternalCommand {
        command: String,
        #[source]
        source: ClientError,
    },

    /// A command succeeded but returned rows of the wrong layout
    #[error("Malformed response to `{command}`: {message}")]
    MalformedResponse { command: String, message: String },

    /// The pointer directory still holds files from an earlier run
    #[error("Output directory {0} is not empty")]
    OutputNotEmpty(String),

    #[error("Invalid pointer file: {0}")]
    InvalidPointer(String),

    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StageError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn external(command: &str) -> impl FnOnce(ClientError) -> Self + '_ {
        move |source| Self::ExternalCommand {
            command: command.to_string(),
            source,
        }
    }

    pub(crate) fn malformed(command: &str, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            command: command.to_string(),
            message: message.into(),
        }
    }
}
