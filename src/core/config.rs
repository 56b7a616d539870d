//! Configuration management for the tool host.
//!
//! This module provides a centralized configuration structure populated from
//! defaults, a `.env` file and `TOOLHOST_*` environment variables. Command-line
//! flags are applied on top by [`Config::apply_cli`].

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::cli::{Cli, TransportKind};
use super::transport::TransportConfig;

/// Main configuration structure for the tool host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Tool discovery and execution settings.
    pub tools: ToolsConfig,

    /// Upstream API base URLs used by catalog tools.
    pub endpoints: ApiEndpoints,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Console log level filter (e.g., "info", "debug", "trace").
    pub level: String,

    /// Detailed DEBUG log file, truncated on startup.
    pub file: Option<PathBuf>,
}

/// Tool discovery and execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Files or directories of tool manifests, in the order supplied.
    pub paths: Vec<PathBuf>,

    /// Bound on a suspending tool's execution time, in seconds.
    pub timeout_secs: u64,

    /// Timeout of the shared HTTP client, in seconds.
    pub http_timeout_secs: u64,
}

impl ToolsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Base URLs of every upstream API a catalog tool talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoints {
    pub openweather: String,
    pub openmeteo_geocoding: String,
    pub openmeteo_forecast: String,
    pub wikipedia: String,
    pub arxiv: String,
    pub newsapi: String,
    pub tavily: String,
    pub duckduckgo: String,
    pub mojeek: String,
    pub github: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            openweather: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            openmeteo_geocoding: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            openmeteo_forecast: "https://api.open-meteo.com/v1/forecast".to_string(),
            wikipedia: "https://en.wikipedia.org/w/api.php".to_string(),
            arxiv: "http://export.arxiv.org/api/query".to_string(),
            newsapi: "https://newsapi.org/v2/everything".to_string(),
            tavily: "https://api.tavily.com/search".to_string(),
            duckduckgo: "https://html.duckduckgo.com/html/".to_string(),
            mojeek: "https://www.mojeek.com/search".to_string(),
            github: "https://api.github.com".to_string(),
        }
    }
}

impl ApiEndpoints {
    /// Point every endpoint at one base URL, keeping each API's own path.
    ///
    /// Used to aim the whole catalog at a local fixture server.
    pub fn rebased(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            openweather: format!("{base}/data/2.5/weather"),
            openmeteo_geocoding: format!("{base}/v1/search"),
            openmeteo_forecast: format!("{base}/v1/forecast"),
            wikipedia: format!("{base}/w/api.php"),
            arxiv: format!("{base}/api/query"),
            newsapi: format!("{base}/v2/everything"),
            tavily: format!("{base}/search"),
            duckduckgo: format!("{base}/html/"),
            mojeek: format!("{base}/mojeek/search"),
            github: base.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "mcp-tool-host".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: None,
            },
            transport: TransportConfig::default(),
            tools: ToolsConfig {
                paths: Vec::new(),
                timeout_secs: 60,
                http_timeout_secs: 30,
            },
            endpoints: ApiEndpoints::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are prefixed with `TOOLHOST_`.
    /// For example: `TOOLHOST_SERVER_NAME`, `TOOLHOST_LOG_LEVEL`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("TOOLHOST_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("TOOLHOST_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Some(secs) = env_u64("TOOLHOST_TOOL_TIMEOUT_SECS") {
            config.tools.timeout_secs = secs;
        }

        if let Some(secs) = env_u64("TOOLHOST_HTTP_TIMEOUT_SECS") {
            config.tools.http_timeout_secs = secs;
        }

        if let Ok(url) = std::env::var("TOOLHOST_GITHUB_API_URL") {
            config.endpoints.github = url.trim_end_matches('/').to_string();
        }

        config.transport = TransportConfig::from_env();

        config
    }

    /// Overlay command-line flags; flags win over environment values.
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        self.tools.paths = cli.tools_paths.clone();

        if let Some(file) = &cli.log {
            self.logging.file = Some(file.clone());
        }

        if let Some(kind) = cli.transport {
            let host = cli
                .host
                .clone()
                .or_else(|| self.transport.host().map(str::to_string));
            let port = cli.port.or(self.transport.port());
            self.transport = TransportConfig::from_kind(kind, host, port);
        } else if cli.host.is_some() || cli.port.is_some() {
            self.transport = self.transport.with_address(cli.host.clone(), cli.port);
        }

        self
    }

    /// The transport kind currently selected.
    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a non-negative integer", name, raw);
            None
        }
    }
}
