//! Tavily AI search tool.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::common::{ToolContext, json_body, require_credential};
use crate::domains::tools::callable::{Arguments, SuspendingTool, parse_params};
use crate::domains::tools::descriptor::ToolDescriptor;
use crate::domains::tools::error::{ToolError, ToolResult};

const API_KEY_VAR: &str = "TAVILY_API_KEY";

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TavilySearchParams {
    /// The search query string
    pub query: String,

    /// Search depth - 'basic' (faster) or 'advanced' (more thorough)
    #[serde(default = "default_search_depth")]
    pub search_depth: String,
}

fn default_search_depth() -> String {
    "basic".to_string()
}

/// Tavily search tool; returns the upstream response unchanged.
#[derive(Debug, Clone)]
pub struct TavilySearchTool {
    ctx: ToolContext,
}

impl TavilySearchTool {
    pub const NAME: &'static str = "tavily_search";
    pub const DESCRIPTION: &'static str = "Perform a search using Tavily's AI-powered search API.";

    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::from_params::<TavilySearchParams>(Self::NAME, Self::DESCRIPTION).suspending()
    }

    pub async fn execute(&self, params: TavilySearchParams) -> ToolResult<Value> {
        let api_key = require_credential(API_KEY_VAR)?;
        let search_depth = match params.search_depth.as_str() {
            "basic" | "advanced" => params.search_depth.as_str(),
            _ => "basic",
        };

        info!("Tavily search for '{}' ({})", params.query, search_depth);

        let response = self
            .ctx
            .client()
            .post(&self.ctx.endpoints().tavily)
            .json(&json!({
                "api_key": api_key,
                "query": params.query,
                "search_depth": search_depth,
                "include_answer": true,
                "include_domains": [],
                "exclude_domains": [],
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::execution_failed(format!(
                "Tavily API error: {} - {}",
                status.as_u16(),
                body
            )));
        }

        json_body(response).await
    }
}

#[async_trait]
impl SuspendingTool for TavilySearchTool {
    async fn call(&self, arguments: Arguments) -> ToolResult<Value> {
        let params: TavilySearchParams = parse_params(arguments)?;
        self.execute(params).await
    }
}
