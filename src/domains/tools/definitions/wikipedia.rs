//! Wikipedia search tool using the MediaWiki action API.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::common::{ToolContext, clamp, json_body};
use crate::domains::tools::callable::{Arguments, SuspendingTool, parse_params};
use crate::domains::tools::descriptor::ToolDescriptor;
use crate::domains::tools::error::{ToolError, ToolResult};

/// Parameters for a Wikipedia search.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct WikipediaParams {
    /// The search query
    pub query: String,

    /// Maximum number of results to return (1-5)
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    3
}

/// Wikipedia search tool: article search followed by intro extracts.
#[derive(Debug, Clone)]
pub struct WikipediaSearchTool {
    ctx: ToolContext,
}

impl WikipediaSearchTool {
    pub const NAME: &'static str = "wikipedia_search";
    pub const DESCRIPTION: &'static str = "Search Wikipedia and retrieve article extracts.";

    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::from_params::<WikipediaParams>(Self::NAME, Self::DESCRIPTION).suspending()
    }

    async fn query(&self, params: &[(&str, String)]) -> ToolResult<Value> {
        let response = self
            .ctx
            .client()
            .get(&self.ctx.endpoints().wikipedia)
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ToolError::execution_failed(format!(
                "Wikipedia API error: {}",
                response.status().as_u16()
            )));
        }
        json_body(response).await
    }

    pub async fn execute(&self, params: WikipediaParams) -> ToolResult<Value> {
        let limit = clamp(params.limit, 1, 5);
        info!("Searching Wikipedia for '{}' (limit {})", params.query, limit);

        let search = self
            .query(&[
                ("action", "query".to_string()),
                ("format", "json".to_string()),
                ("list", "search".to_string()),
                ("srsearch", params.query.clone()),
                ("srlimit", limit.to_string()),
            ])
            .await?;

        let page_ids: Vec<String> = search["query"]["search"]
            .as_array()
            .map(|results| {
                results
                    .iter()
                    .filter_map(|r| r["pageid"].as_i64())
                    .map(|id| id.to_string())
                    .collect()
            })
            .unwrap_or_default();

        if page_ids.is_empty() {
            return Ok(json!({ "results": [], "message": "No articles found" }));
        }

        let extracts = self
            .query(&[
                ("action", "query".to_string()),
                ("format", "json".to_string()),
                ("pageids", page_ids.join("|")),
                ("prop", "extracts|info".to_string()),
                ("inprop", "url".to_string()),
                ("exintro", "true".to_string()),
                ("explaintext", "true".to_string()),
            ])
            .await?;

        let pages = &extracts["query"]["pages"];
        let results: Vec<Value> = page_ids
            .iter()
            .filter_map(|id| pages.get(id).map(|page| (id, page)))
            .map(|(id, page)| {
                json!({
                    "title": page["title"].as_str().unwrap_or_default(),
                    "url": page["fullurl"].as_str().unwrap_or_default(),
                    "extract": page["extract"].as_str().unwrap_or_default(),
                    "pageid": id,
                })
            })
            .collect();

        Ok(json!({ "results": results }))
    }
}

#[async_trait]
impl SuspendingTool for WikipediaSearchTool {
    async fn call(&self, arguments: Arguments) -> ToolResult<Value> {
        let params: WikipediaParams = parse_params(arguments)?;
        self.execute(params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::definitions::test_support::{Canned, FixtureServer};

    fn params(query: &str, limit: i64) -> WikipediaParams {
        WikipediaParams {
            query: query.to_string(),
            limit,
        }
    }

    #[tokio::test]
    async fn test_search_then_extracts_in_search_order() {
        let server = FixtureServer::start(vec![
            Canned::get("/w/api.php")
                .matching("list=search")
                .json(json!({"query": {"search": [{"pageid": 22}, {"pageid": 7}]}})),
            Canned::get("/w/api.php").matching("pageids=").json(json!({
                "query": {"pages": {
                    "7": {"title": "Seven", "fullurl": "https://en.wikipedia.org/wiki/Seven", "extract": "7 is a number."},
                    "22": {"title": "Twenty-two", "fullurl": "https://en.wikipedia.org/wiki/22", "extract": "22 is a number."}
                }}
            })),
        ])
        .await;

        let value = WikipediaSearchTool::new(server.context())
            .execute(params("numbers", 10))
            .await
            .unwrap();

        let results = value["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["title"], "Twenty-two");
        assert_eq!(results[0]["pageid"], "22");
        assert_eq!(results[1]["url"], "https://en.wikipedia.org/wiki/Seven");

        let requests = server.requests();
        assert_eq!(requests[0].query_param("srlimit").as_deref(), Some("5"));
        assert_eq!(requests[1].query_param("pageids").as_deref(), Some("22|7"));
    }

    #[tokio::test]
    async fn test_no_articles() {
        let server = FixtureServer::start(vec![
            Canned::get("/w/api.php").json(json!({"query": {"search": []}})),
        ])
        .await;
        let value = WikipediaSearchTool::new(server.context())
            .execute(params("qwxzzy", 3))
            .await
            .unwrap();
        assert_eq!(value, json!({"results": [], "message": "No articles found"}));
    }

    #[tokio::test]
    async fn test_server_error_is_raised() {
        let server = FixtureServer::start(vec![Canned::get("/w/api.php").status(500)]).await;
        let err = WikipediaSearchTool::new(server.context())
            .execute(params("rust", 3))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Wikipedia API error: 500"));
    }
}
