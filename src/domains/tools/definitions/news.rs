//! News search tool using NewsAPI.

use async_trait::async_trait;
use chrono::{Duration, Local};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::common::{ToolContext, clamp, env_credential, error_value};
use crate::domains::tools::callable::{Arguments, SuspendingTool, parse_params};
use crate::domains::tools::descriptor::ToolDescriptor;
use crate::domains::tools::error::{ToolError, ToolResult};

const API_KEY_VAR: &str = "NEWSAPI_KEY";

/// Parameters for a news search.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct NewsSearchParams {
    /// The search query string
    pub query: String,

    /// Number of days to look back (1-30)
    #[serde(default = "default_days")]
    pub days: i64,

    /// Maximum number of results to return (1-10)
    #[serde(default = "default_max_results")]
    pub max_results: i64,

    /// Comma-separated list of news sources
    #[serde(default)]
    pub sources: Option<String>,

    /// Comma-separated list of domains
    #[serde(default)]
    pub domains: Option<String>,

    /// Two-letter language code
    #[serde(default = "default_language")]
    pub language: String,

    /// Sort method (relevancy, popularity, publishedAt)
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
}

fn default_days() -> i64 {
    7
}

fn default_max_results() -> i64 {
    5
}

fn default_language() -> String {
    "en".to_string()
}

fn default_sort_by() -> String {
    "relevancy".to_string()
}

/// NewsAPI search tool. Every failure is reported as an `{"error"}` value.
#[derive(Debug, Clone)]
pub struct NewsSearchTool {
    ctx: ToolContext,
}

impl NewsSearchTool {
    pub const NAME: &'static str = "news_search";
    pub const DESCRIPTION: &'static str = "Search recent news articles using NewsAPI.";

    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::from_params::<NewsSearchParams>(Self::NAME, Self::DESCRIPTION).suspending()
    }

    pub async fn execute(&self, params: NewsSearchParams) -> ToolResult<Value> {
        let Some(api_key) = env_credential(API_KEY_VAR) else {
            return Ok(error_value(ToolError::missing_credential(API_KEY_VAR).to_string()));
        };

        match self.search(&api_key, params).await {
            Ok(value) => Ok(value),
            Err(e) => Ok(error_value(format!("Error fetching news: {e}"))),
        }
    }

    async fn search(&self, api_key: &str, params: NewsSearchParams) -> ToolResult<Value> {
        let days = clamp(params.days, 1, 30);
        let max_results = clamp(params.max_results, 1, 10);
        let from_date = (Local::now() - Duration::days(days))
            .format("%Y-%m-%d")
            .to_string();

        info!("Searching news for '{}' since {}", params.query, from_date);

        let mut query = vec![
            ("q", params.query.clone()),
            ("from", from_date),
            ("language", params.language.clone()),
            ("sortBy", params.sort_by.clone()),
            ("pageSize", max_results.to_string()),
        ];
        if let Some(sources) = &params.sources {
            query.push(("sources", sources.clone()));
        }
        if let Some(domains) = &params.domains {
            query.push(("domains", domains.clone()));
        }

        let response = self
            .ctx
            .client()
            .get(&self.ctx.endpoints().newsapi)
            .header("X-Api-Key", api_key)
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(error_value(format!(
                "NewsAPI error: {}",
                response.status().as_u16()
            )));
        }

        let data: Value = response.json().await?;
        let articles = data["articles"].as_array().cloned().unwrap_or_default();

        if articles.is_empty() {
            return Ok(json!({
                "query": params.query,
                "totalResults": 0,
                "articles": [],
                "message": "No news articles found",
            }));
        }

        let total = data
            .get("totalResults")
            .cloned()
            .unwrap_or_else(|| json!(articles.len()));
        let articles: Vec<Value> = articles
            .iter()
            .take(max_results as usize)
            .map(|article| {
                json!({
                    "title": article["title"],
                    "source": article["source"]["name"],
                    "author": article["author"],
                    "url": article["url"],
                    "publishedAt": article["publishedAt"],
                    "description": article["description"],
                })
            })
            .collect();

        Ok(json!({
            "query": params.query,
            "totalResults": total,
            "articles": articles,
        }))
    }
}

#[async_trait]
impl SuspendingTool for NewsSearchTool {
    async fn call(&self, arguments: Arguments) -> ToolResult<Value> {
        let params: NewsSearchParams = parse_params(arguments)?;
        self.execute(params).await
    }
}
