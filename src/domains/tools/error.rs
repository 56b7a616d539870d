//! Tool-specific error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during tool operations.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Invalid arguments were provided to the tool.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool execution failed.
    #[error("{0}")]
    ExecutionFailed(String),

    /// The tool timed out during execution.
    #[error("Tool execution timed out after {0}s")]
    Timeout(u64),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Create a new "not found" error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a new "invalid arguments" error.
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a new "execution failed" error.
    pub fn execution_failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Create a new "internal" error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Error for a credential that must come from the process environment.
    pub fn missing_credential(variable: &str) -> Self {
        Self::ExecutionFailed(format!("{variable} environment variable is not set"))
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        Self::ExecutionFailed(format!("HTTP request failed: {err}"))
    }
}

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors raised while turning a tool manifest into a registered tool.
///
/// These never abort discovery; the loader logs them and moves on.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The manifest file could not be read.
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest file is not valid JSON or does not match the manifest shape.
    #[error("Invalid manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A manifest entry is structurally valid JSON but semantically wrong.
    #[error("Invalid tool definition in {path}: {reason}")]
    InvalidDefinition { path: PathBuf, reason: String },

    /// The entry names an entrypoint the catalog does not provide.
    #[error("Unknown entrypoint '{entrypoint}' in {path}")]
    UnknownEntrypoint { path: PathBuf, entrypoint: String },
}

impl LoaderError {
    /// Create an "invalid definition" error.
    pub fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
