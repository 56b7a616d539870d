//! Transport configuration types.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::cli::TransportKind;

/// Transport configuration options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    /// MCP over standard input/output (default).
    Stdio,

    /// MCP over server-sent events, plus direct JSON-RPC over POST.
    Sse(SseConfig),

    /// Newline-delimited envelope protocol over standard input/output.
    Lines,
}

/// Network transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SseConfig {
    /// Port number to listen on.
    pub port: u16,

    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Enable CORS for browser clients.
    #[serde(default = "default_cors")]
    pub enable_cors: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_cors() -> bool {
    true
}

pub const DEFAULT_PORT: u16 = 8080;

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: default_host(),
            enable_cors: default_cors(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::Stdio
    }
}

impl TransportConfig {
    /// Create an SSE transport config.
    pub fn sse(port: u16, host: impl Into<String>) -> Self {
        Self::Sse(SseConfig {
            port,
            host: host.into(),
            ..Default::default()
        })
    }

    /// Build the config for a transport chosen on the command line.
    pub fn from_kind(kind: TransportKind, host: Option<String>, port: Option<u16>) -> Self {
        match kind {
            TransportKind::Stdio => Self::Stdio,
            TransportKind::Lines => Self::Lines,
            TransportKind::Sse => Self::sse(
                port.unwrap_or(DEFAULT_PORT),
                host.unwrap_or_else(default_host),
            ),
        }
    }

    /// Load transport config from environment variables.
    pub fn from_env() -> Self {
        let transport = std::env::var("TOOLHOST_TRANSPORT").unwrap_or_default();
        if transport.is_empty() {
            return Self::default();
        }

        let host = std::env::var("TOOLHOST_HOST").ok();
        let port = std::env::var("TOOLHOST_PORT")
            .ok()
            .and_then(|p| p.parse().ok());

        match TransportKind::parse(&transport) {
            Some(kind) => Self::from_kind(kind, host, port),
            None => {
                warn!(
                    "Unknown TOOLHOST_TRANSPORT '{}', falling back to stdio",
                    transport
                );
                Self::default()
            }
        }
    }

    /// Replace the bind address of a network transport; no-op otherwise.
    pub fn with_address(self, host: Option<String>, port: Option<u16>) -> Self {
        match self {
            Self::Sse(mut cfg) => {
                if let Some(host) = host {
                    cfg.host = host;
                }
                if let Some(port) = port {
                    cfg.port = port;
                }
                Self::Sse(cfg)
            }
            other => other,
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Stdio => TransportKind::Stdio,
            Self::Sse(_) => TransportKind::Sse,
            Self::Lines => TransportKind::Lines,
        }
    }

    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Sse(cfg) => Some(&cfg.host),
            _ => None,
        }
    }

    pub fn port(&self) -> Option<u16> {
        match self {
            Self::Sse(cfg) => Some(cfg.port),
            _ => None,
        }
    }

    /// Get a description of this transport for logging.
    pub fn description(&self) -> String {
        match self {
            Self::Stdio => "STDIO (standard MCP mode)".to_string(),
            Self::Sse(cfg) => format!("SSE on http://{}:{}/sse", cfg.host, cfg.port),
            Self::Lines => "newline-delimited envelopes on STDIO".to_string(),
        }
    }

    /// Whether this transport owns stdin/stdout.
    pub fn is_stdio(&self) -> bool {
        matches!(self, Self::Stdio | Self::Lines)
    }
}
