//! Common utilities shared across catalog tools.
//!
//! This module provides the shared HTTP context handed to every catalog
//! tool, plus small helpers for credentials, clamping and response shaping.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::warn;

use crate::core::config::{ApiEndpoints, Config};
use crate::domains::tools::error::{ToolError, ToolResult};

/// User agent sent with every upstream request.
pub const USER_AGENT: &str = concat!("mcp_tool_host/", env!("CARGO_PKG_VERSION"));

/// Shared state for catalog tools: one pooled HTTP client and the upstream endpoints.
#[derive(Debug, Clone)]
pub struct ToolContext {
    client: reqwest::Client,
    endpoints: Arc<ApiEndpoints>,
}

impl ToolContext {
    pub fn new(client: reqwest::Client, endpoints: ApiEndpoints) -> Self {
        Self {
            client,
            endpoints: Arc::new(endpoints),
        }
    }

    /// Build the context from configuration.
    pub fn from_config(config: &Config) -> ToolResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.tools.http_timeout())
            .build()
            .map_err(|e| ToolError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::new(client, config.endpoints.clone()))
    }

    /// Context with default endpoints, pointed at the given base URL.
    pub fn with_endpoints(endpoints: ApiEndpoints) -> Self {
        Self::new(reqwest::Client::new(), endpoints)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::with_endpoints(ApiEndpoints::default())
    }
}

/// Read a credential from the process environment; empty counts as unset.
pub fn env_credential(variable: &str) -> Option<String> {
    std::env::var(variable).ok().filter(|v| !v.is_empty())
}

/// Read a credential that the tool cannot run without.
pub fn require_credential(variable: &str) -> ToolResult<String> {
    env_credential(variable).ok_or_else(|| ToolError::missing_credential(variable))
}

/// Clamp an integer parameter to an inclusive range.
pub fn clamp(value: i64, min: i64, max: i64) -> i64 {
    value.clamp(min, max)
}

/// Build a reported (non-raised) domain error value.
pub fn error_value(message: impl Into<String>) -> Value {
    let message = message.into();
    warn!("{}", message);
    json!({ "error": message })
}

/// Decode a JSON body, mapping failures to an execution error.
pub async fn json_body(response: reqwest::Response) -> ToolResult<Value> {
    response
        .json::<Value>()
        .await
        .map_err(|e| ToolError::execution_failed(format!("Invalid JSON from upstream: {e}")))
}

/// `owner/repo` from a GitHub `repository_url`, or `"unknown"`.
pub fn repo_from_url(item: &Value) -> String {
    item.get("repository_url")
        .and_then(Value::as_str)
        .and_then(|url| url.split_once("/repos/"))
        .map(|(_, repo)| repo.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Get a string field, or `Value::Null`.
pub fn field(item: &Value, key: &str) -> Value {
    item.get(key).cloned().unwrap_or(Value::Null)
}
