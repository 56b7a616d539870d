//! Error types and handling for the tool host.
//!
//! This module defines a unified error type that can represent errors from
//! the tools domain and the transport layer, plus startup configuration.

use thiserror::Error;

/// A specialized Result type for tool host operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the tool host.
#[derive(Debug, Error)]
pub enum Error {
    /// Error originating from the tools domain.
    #[error("Tool error: {0}")]
    Tool(#[from] crate::domains::tools::ToolError),

    /// Transport setup or serving failed.
    #[error("Transport error: {0}")]
    Transport(#[from] super::transport::TransportError),

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::TransportError;
    use crate::domains::tools::ToolError;

    #[test]
    fn test_conversions_keep_messages() {
        let err: Error = ToolError::not_found("weather").into();
        assert_eq!(err.to_string(), "Tool error: Tool not found: weather");

        let err: Error = TransportError::init("sse not compiled in").into();
        assert!(err.to_string().starts_with("Transport error: "));
        assert!(err.to_string().contains("sse not compiled in"));

        let err = Error::config("bad port");
        assert_eq!(err.to_string(), "Configuration error: bad port");
    }
}
