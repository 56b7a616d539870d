//! arXiv search tool using the Atom export API.

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

const SORT_OPTIONS: [&str; 3] = ["relevance", "lastUpdatedDate", "submittedDate"];

/// Parameters for an arXiv search.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ArxivParams {
    /// The search query
    pub query: String,

    /// Maximum number of results to return (1-10)
    #[serde(default = "default_max_results")]
    pub max_results: i64,

    /// Sort order - 'relevance', 'lastUpdatedDate', or 'submittedDate'
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
}

fn default_max_results() -> i64 {
    5
}

fn default_sort_by() -> String {
    "relevance".to_string()
}

/// arXiv paper search tool.
#[derive(Debug, Clone)]
pub struct ArxivSearchTool {
    ctx: ToolContext,
}

impl ArxivSearchTool {
    pub const NAME: &'static str = "arxiv_search";
    pub const DESCRIPTION: &'static str = "Search arXiv for research papers: title, authors, abstract, \
         links and categories.";

    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::from_params::<ArxivParams>(Self::NAME, Self::DESCRIPTION).suspending()
    }

    pub async fn execute(&self, params: ArxivParams) -> ToolResult<Value> {
        let max_results = clamp(params.max_results, 1, 10);
        let sort = SORT_OPTIONS
            .iter()
            .find(|option| **option == params.sort_by)
            .copied()
            .unwrap_or("relevance");
        let query = params.query.replace(' ', "+");

        info!("Searching arXiv for '{}'", params.query);

        let url = format!(
            "{}?search_query=all:{}&start=0&max_results={}&sortBy={}",
            self.ctx.endpoints().arxiv,
            query,
            max_results,
            sort
        );
        let response = self.ctx.client().get(url).send().await?;

        if !response.status().is_success() {
            return Err(ToolError::execution_failed(format!(
                "arXiv API error: {}",
                response.status().as_u16()
            )));
        }

        let body = response.text().await?;
        parse_feed(&body).map(Value::Array)
    }
}

/// Parse an Atom feed into paper records.
pub fn parse_feed(xml: &str) -> ToolResult<Vec<Value>> {
    if markup::open_tags(xml, "feed").is_empty() {
        return Err(ToolError::execution_failed(
            "Invalid arXiv response: no Atom feed",
        ));
    }

    let papers = markup::elements(xml, "entry")
        .into_iter()
        .map(|entry| {
            let links = markup::open_tags(entry, "link");
            let link_where = |attr: &str, value: &str| {
                links
                    .iter()
                    .find(|link| markup::extract_attr(link, attr).as_deref() == Some(value))
                    .and_then(|link| markup::extract_attr(link, "href"))
                    .unwrap_or_default()
            };
            let text = |tag: &str| markup::element_text(entry, tag).unwrap_or_default();

            json!({
                "title": text("title"),
                "authors": markup::elements(entry, "author")
                    .into_iter()
                    .filter_map(|author| markup::element_text(author, "name"))
                    .collect::<Vec<_>>(),
                "summary": text("summary"),
                "published": text("published"),
                "url": link_where("type", "text/html"),
                "pdf_url": link_where("title", "pdf"),
                "categories": markup::open_tags(entry, "category")
                    .into_iter()
                    .filter_map(|c| markup::extract_attr(c, "term"))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    Ok(papers)
}

#[async_trait]
impl SuspendingTool for ArxivSearchTool {
    async fn call(&self, arguments: Arguments) -> ToolResult<Value> {
        let params: ArxivParams = parse_params(arguments)?;
        self.execute(params).await
    }
}
