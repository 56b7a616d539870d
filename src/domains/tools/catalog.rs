//! Tool catalog - the compiled tool implementations a manifest can bind to.
//!
//! Manifests name an `entrypoint`; the catalog turns that name into a
//! descriptor and a callable sharing one [`ToolContext`].

use super::callable::Callable;
use super::definitions::{
    ArxivSearchTool, CalculatorTool, DuckDuckGoSearchTool, FetchWeatherTool, GithubCreateIssueTool,
    GithubGetFileTool, GithubListIssuesTool, GithubListPullRequestsTool, GithubSearchCodeTool,
    GithubUserActivityTool, MojeekSearchTool, NewsSearchTool, OpenMeteoForecastTool,
    TavilySearchTool, ToolContext, WikipediaSearchTool,
};
use super::descriptor::ToolDescriptor;

/// Every entrypoint the catalog provides, in listing order.
pub const ENTRYPOINTS: [&str; 15] = [
    CalculatorTool::NAME,
    FetchWeatherTool::NAME,
    OpenMeteoForecastTool::NAME,
    WikipediaSearchTool::NAME,
    ArxivSearchTool::NAME,
    NewsSearchTool::NAME,
    TavilySearchTool::NAME,
    DuckDuckGoSearchTool::NAME,
    MojeekSearchTool::NAME,
    GithubGetFileTool::NAME,
    GithubListIssuesTool::NAME,
    GithubCreateIssueTool::NAME,
    GithubListPullRequestsTool::NAME,
    GithubSearchCodeTool::NAME,
    GithubUserActivityTool::NAME,
];

/// Resolves entrypoint names to compiled tools.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    ctx: ToolContext,
}

impl Catalog {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    pub fn entrypoints(&self) -> &'static [&'static str] {
        &ENTRYPOINTS
    }

    pub fn contains(&self, entrypoint: &str) -> bool {
        ENTRYPOINTS.contains(&entrypoint)
    }

    /// Descriptor and callable for an entrypoint, or `None` if unknown.
    pub fn resolve(&self, entrypoint: &str) -> Option<(ToolDescriptor, Callable)> {
        let ctx = self.ctx.clone();
        let resolved = match entrypoint {
            CalculatorTool::NAME => (CalculatorTool::descriptor(), Callable::blocking(CalculatorTool)),
            FetchWeatherTool::NAME => (
                FetchWeatherTool::descriptor(),
                Callable::suspending(FetchWeatherTool::new(ctx)),
            ),
            OpenMeteoForecastTool::NAME => (
                OpenMeteoForecastTool::descriptor(),
                Callable::suspending(OpenMeteoForecastTool::new(ctx)),
            ),
            WikipediaSearchTool::NAME => (
                WikipediaSearchTool::descriptor(),
                Callable::suspending(WikipediaSearchTool::new(ctx)),
            ),
            ArxivSearchTool::NAME => (
                ArxivSearchTool::descriptor(),
                Callable::suspending(ArxivSearchTool::new(ctx)),
            ),
            NewsSearchTool::NAME => (
                NewsSearchTool::descriptor(),
                Callable::suspending(NewsSearchTool::new(ctx)),
            ),
            TavilySearchTool::NAME => (
                TavilySearchTool::descriptor(),
                Callable::suspending(TavilySearchTool::new(ctx)),
            ),
            DuckDuckGoSearchTool::NAME => (
                DuckDuckGoSearchTool::descriptor(),
                Callable::suspending(DuckDuckGoSearchTool::new(ctx)),
            ),
            MojeekSearchTool::NAME => (
                MojeekSearchTool::descriptor(),
                Callable::suspending(MojeekSearchTool::new(ctx)),
            ),
            GithubGetFileTool::NAME => (
                GithubGetFileTool::descriptor(),
                Callable::suspending(GithubGetFileTool::new(ctx)),
            ),
            GithubListIssuesTool::NAME => (
                GithubListIssuesTool::descriptor(),
                Callable::suspending(GithubListIssuesTool::new(ctx)),
            ),
            GithubCreateIssueTool::NAME => (
                GithubCreateIssueTool::descriptor(),
                Callable::suspending(GithubCreateIssueTool::new(ctx)),
            ),
            GithubListPullRequestsTool::NAME => (
                GithubListPullRequestsTool::descriptor(),
                Callable::suspending(GithubListPullRequestsTool::new(ctx)),
            ),
            GithubSearchCodeTool::NAME => (
                GithubSearchCodeTool::descriptor(),
                Callable::suspending(GithubSearchCodeTool::new(ctx)),
            ),
            GithubUserActivityTool::NAME => (
                GithubUserActivityTool::descriptor(),
                Callable::suspending(GithubUserActivityTool::new(ctx)),
            ),
            _ => return None,
        };
        Some(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_entrypoint_resolves_under_its_own_name() {
        let catalog = Catalog::default();
        for entrypoint in catalog.entrypoints() {
            let (descriptor, _) = catalog.resolve(entrypoint).unwrap();
            assert_eq!(descriptor.name(), *entrypoint);
        }
    }

    #[test]
    fn test_unknown_entrypoint() {
        let catalog = Catalog::default();
        assert!(catalog.resolve("os_system").is_none());
        assert!(!catalog.contains("os_system"));
    }

    #[test]
    fn test_only_calculator_is_inline() {
        let catalog = Catalog::default();
        for entrypoint in catalog.entrypoints() {
            let (descriptor, callable) = catalog.resolve(entrypoint).unwrap();
            assert_eq!(descriptor.is_suspending(), callable.is_suspending());
            assert_eq!(callable.is_suspending(), *entrypoint != "calculator");
        }
    }

    #[test]
    fn test_schemas_carry_defaults() {
        let (descriptor, _) = Catalog::default().resolve("arxiv_search").unwrap();
        let sort = descriptor.parameter("sort_by").unwrap();
        assert!(!sort.required);
        assert_eq!(sort.default.as_ref().unwrap(), "relevance");
        assert!(descriptor.parameter("query").unwrap().required);
    }
}
