//! Catalog tool definitions.
//!
//! Each upstream integration lives in its own file. Tools hold a
//! [`ToolContext`] and expose `descriptor()` plus an async `execute()`.

pub mod arxiv;
pub mod calculator;
pub mod common;
pub mod github;
pub mod markup;
pub mod news;
pub mod openmeteo;
pub mod tavily;
pub mod weather;
pub mod web_search;
pub mod wikipedia;

#[cfg(test)]
pub mod test_support;

pub use arxiv::ArxivSearchTool;
pub use calculator::CalculatorTool;
pub use common::ToolContext;
pub use github::{
    GithubCreateIssueTool, GithubGetFileTool, GithubListIssuesTool, GithubListPullRequestsTool,
    GithubSearchCodeTool, GithubUserActivityTool,
};
pub use news::NewsSearchTool;
pub use openmeteo::OpenMeteoForecastTool;
pub use tavily::TavilySearchTool;
pub use weather::FetchWeatherTool;
pub use web_search::{DuckDuckGoSearchTool, MojeekSearchTool};
pub use wikipedia::WikipediaSearchTool;
