//! Web search tools that scrape HTML result pages (DuckDuckGo, Mojeek).

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::common::{ToolContext, clamp};
use super::markup;
use crate::domains::tools::callable::{Arguments, SuspendingTool, parse_params};
use crate::domains::tools::descriptor::ToolDescriptor;
use crate::domains::tools::error::{ToolError, ToolResult};

/// Parameters shared by both HTML search tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct WebSearchParams {
    /// The search query string
    pub query: String,

    /// Maximum number of results to return (1-10)
    #[serde(default = "default_max_results")]
    pub max_results: i64,
}

fn default_max_results() -> i64 {
    5
}

fn result(title: String, url: String, snippet: String) -> Value {
    json!({ "title": title, "url": url, "snippet": snippet })
}

/// Extract results from a DuckDuckGo HTML results page.
///
/// Each hit is an `<a class="result__a">` title link, optionally followed by
/// an element with `class="result__snippet"` before the next hit.
pub fn parse_duckduckgo(html: &str, max_results: usize) -> Vec<Value> {
    let marker = "class=\"result__a\"";
    let tag_start = |at: usize| html[..at].rfind('<').unwrap_or(at);
    let hits: Vec<usize> = html.match_indices(marker).map(|(at, _)| at).collect();

    let mut results = Vec::new();
    for (n, &at) in hits.iter().enumerate() {
        if results.len() >= max_results {
            break;
        }
        let end = hits.get(n + 1).map_or(html.len(), |&next| tag_start(next));
        let region = &html[tag_start(at)..end];

        let Some((tag, body)) = markup::class_element(region, "result__a") else {
            continue;
        };
        let title = markup::strip_tags(body);
        if title.is_empty() {
            continue;
        }
        let url = markup::extract_attr(tag, "href").unwrap_or_default();
        let snippet = markup::class_text(region, "result__snippet").unwrap_or_default();
        results.push(result(title, url, snippet));
    }

    results
}

/// Extract results from a Mojeek results page.
///
/// Hits are `<li class="result">` items with `title`, `url` and `s`
/// (snippet) children; items missing any of them are skipped.
pub fn parse_mojeek(html: &str, max_results: usize) -> Vec<Value> {
    let Some(list_start) = html.find("class=\"results-standard\"") else {
        return Vec::new();
    };

    markup::elements(&html[list_start..], "li")
        .into_iter()
        .take(max_results)
        .filter_map(|item| {
            let title = markup::class_text(item, "title")?;
            let url = markup::class_text(item, "url")?;
            let snippet = markup::class_text(item, "s")?;
            Some(result(title, url, snippet))
        })
        .collect()
}

/// DuckDuckGo HTML search tool.
#[derive(Debug, Clone)]
pub struct DuckDuckGoSearchTool {
    ctx: ToolContext,
}

impl DuckDuckGoSearchTool {
    pub const NAME: &'static str = "duckduckgo_search";
    pub const DESCRIPTION: &'static str = "Perform a web search using DuckDuckGo.";

    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::from_params::<WebSearchParams>(Self::NAME, Self::DESCRIPTION).suspending()
    }

    pub async fn execute(&self, params: WebSearchParams) -> ToolResult<Value> {
        let max_results = clamp(params.max_results, 1, 10) as usize;
        info!("DuckDuckGo search for '{}'", params.query);

        let response = self
            .ctx
            .client()
            .get(&self.ctx.endpoints().duckduckgo)
            .query(&[("q", params.query.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ToolError::execution_failed(format!(
                "DuckDuckGo search error: {}",
                response.status().as_u16()
            )));
        }

        let body = response.text().await?;
        Ok(Value::Array(parse_duckduckgo(&body, max_results)))
    }
}

#[async_trait]
impl SuspendingTool for DuckDuckGoSearchTool {
    async fn call(&self, arguments: Arguments) -> ToolResult<Value> {
        let params: WebSearchParams = parse_params(arguments)?;
        self.execute(params).await
    }
}

/// Mojeek search tool.
#[derive(Debug, Clone)]
pub struct MojeekSearchTool {
    ctx: ToolContext,
}

impl MojeekSearchTool {
    pub const NAME: &'static str = "mojeek_search";
    pub const DESCRIPTION: &'static str = "Perform a web search using the Mojeek search engine.";

    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::from_params::<WebSearchParams>(Self::NAME, Self::DESCRIPTION).suspending()
    }

    pub async fn execute(&self, params: WebSearchParams) -> ToolResult<Value> {
        let max_results = clamp(params.max_results, 1, 10) as usize;
        info!("Mojeek search for '{}'", params.query);

        let response = self
            .ctx
            .client()
            .get(&self.ctx.endpoints().mojeek)
            .header(reqwest::header::USER_AGENT, "Mozilla/5.0")
            .query(&[("q", params.query.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ToolError::execution_failed(format!(
                "Mojeek search error: {}",
                response.status().as_u16()
            )));
        }

        let body = response.text().await?;
        Ok(Value::Array(parse_mojeek(&body, max_results)))
    }
}

#[async_trait]
impl SuspendingTool for MojeekSearchTool {
    async fn call(&self, arguments: Arguments) -> ToolResult<Value> {
        let params: WebSearchParams = parse_params(arguments)?;
        self.execute(params).await
    }
}
