//! GitHub REST API tools.
//!
//! Six tools share one thin API wrapper. All but `github_user_activity`
//! require `GITHUB_TOKEN` and raise on unexpected statuses; the activity
//! summary reports a failed user lookup as a value and silently skips
//! sub-queries that fail.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{TimeDelta, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::common::{
    ToolContext, env_credential, error_value, field, json_body, repo_from_url, require_credential,
};
use crate::domains::tools::callable::{Arguments, SuspendingTool, parse_params};
use crate::domains::tools::descriptor::ToolDescriptor;
use crate::domains::tools::error::{ToolError, ToolResult};

const TOKEN_VAR: &str = "GITHUB_TOKEN";
const ACCEPT: &str = "application/vnd.github.v3+json";
const SEARCH_CODE_LIMIT: usize = 10;

/// Thin wrapper over the GitHub REST API.
#[derive(Debug, Clone)]
struct GithubApi {
    ctx: ToolContext,
}

impl GithubApi {
    fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.ctx.endpoints().github, path)
    }

    fn request(&self, method: Method, url: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self
            .ctx
            .client()
            .request(method, url)
            .header(reqwest::header::ACCEPT, ACCEPT);
        match token {
            Some(token) => builder.header(reqwest::header::AUTHORIZATION, format!("token {token}")),
            None => builder,
        }
    }

    fn get(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        self.request(Method::GET, &self.url(path), token)
    }
}

/// Raised error carrying the upstream status and body.
async fn api_error(response: Response) -> ToolError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ToolError::execution_failed(format!("GitHub API error: {status} - {body}"))
}

/// Fail unless the response has the expected status, then decode its JSON.
async fn expect_json(response: Response, expected: StatusCode) -> ToolResult<Value> {
    if response.status() != expected {
        return Err(api_error(response).await);
    }
    json_body(response).await
}

fn default_ref() -> String {
    "main".to_string()
}

fn default_state() -> String {
    "open".to_string()
}

fn default_days() -> i64 {
    7
}

// ============================================================================
// github_get_file
// ============================================================================

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GithubGetFileParams {
    /// Repository name in format 'owner/repo'
    pub repo: String,

    /// Path to the file within the repository
    pub path: String,

    /// Branch, tag, or commit SHA
    #[serde(default = "default_ref", rename = "ref")]
    pub git_ref: String,
}

/// Retrieve a file's decoded content from a repository.
#[derive(Debug, Clone)]
pub struct GithubGetFileTool {
    api: GithubApi,
}

impl GithubGetFileTool {
    pub const NAME: &'static str = "github_get_file";
    pub const DESCRIPTION: &'static str = "Retrieve a file from a GitHub repository.";

    pub fn new(ctx: ToolContext) -> Self {
        Self {
            api: GithubApi::new(ctx),
        }
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::from_params::<GithubGetFileParams>(Self::NAME, Self::DESCRIPTION).suspending()
    }

    pub async fn execute(&self, params: GithubGetFileParams) -> ToolResult<Value> {
        let token = require_credential(TOKEN_VAR)?;
        let GithubGetFileParams { repo, path, git_ref } = params;
        info!("Fetching {} from {}@{}", path, repo, git_ref);

        let response = self
            .api
            .get(&format!("/repos/{repo}/contents/{path}"), Some(&token))
            .query(&[("ref", git_ref.as_str())])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(error_value(format!(
                "File not found: {path} in {repo} at {git_ref}"
            )));
        }
        let data = expect_json(response, StatusCode::OK).await?;

        if data["type"] != "file" {
            return Ok(error_value(format!("Path does not point to a file: {path}")));
        }

        let encoded: String = data["content"]
            .as_str()
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| ToolError::execution_failed(format!("Invalid file content: {e}")))?;
        let content = String::from_utf8(bytes)
            .map_err(|e| ToolError::execution_failed(format!("File is not UTF-8 text: {e}")))?;

        Ok(json!({
            "content": content,
            "name": data["name"],
            "path": data["path"],
            "sha": data["sha"],
            "size": data["size"],
            "url": data["html_url"],
        }))
    }
}

#[async_trait]
impl SuspendingTool for GithubGetFileTool {
    async fn call(&self, arguments: Arguments) -> ToolResult<Value> {
        let params: GithubGetFileParams = parse_params(arguments)?;
        self.execute(params).await
    }
}

// ============================================================================
// github_list_issues
// ============================================================================

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GithubListIssuesParams {
    /// Repository name in format 'owner/repo'
    pub repo: String,

    /// Issue state ('open', 'closed', 'all')
    #[serde(default = "default_state")]
    pub state: String,

    /// Comma-separated list of label names
    #[serde(default)]
    pub labels: String,
}

/// List issues (pull requests excluded) in a repository.
#[derive(Debug, Clone)]
pub struct GithubListIssuesTool {
    api: GithubApi,
}

impl GithubListIssuesTool {
    pub const NAME: &'static str = "github_list_issues";
    pub const DESCRIPTION: &'static str = "List issues in a GitHub repository.";

    pub fn new(ctx: ToolContext) -> Self {
        Self {
            api: GithubApi::new(ctx),
        }
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::from_params::<GithubListIssuesParams>(Self::NAME, Self::DESCRIPTION)
            .suspending()
    }

    pub async fn execute(&self, params: GithubListIssuesParams) -> ToolResult<Value> {
        let token = require_credential(TOKEN_VAR)?;

        let mut query = vec![("state", params.state.as_str())];
        if !params.labels.is_empty() {
            query.push(("labels", params.labels.as_str()));
        }

        let response = self
            .api
            .get(&format!("/repos/{}/issues", params.repo), Some(&token))
            .query(&query)
            .send()
            .await?;
        let issues = expect_json(response, StatusCode::OK).await?;

        let issues: Vec<Value> = issues
            .as_array()
            .into_iter()
            .flatten()
            .filter(|issue| issue.get("pull_request").is_none())
            .map(|issue| {
                json!({
                    "number": issue["number"],
                    "title": issue["title"],
                    "state": issue["state"],
                    "created_at": issue["created_at"],
                    "updated_at": issue["updated_at"],
                    "html_url": issue["html_url"],
                    "user": issue["user"]["login"],
                    "labels": issue["labels"]
                        .as_array()
                        .into_iter()
                        .flatten()
                        .map(|label| label["name"].clone())
                        .collect::<Vec<_>>(),
                    "body": issue.get("body").cloned().unwrap_or_else(|| json!("")),
                })
            })
            .collect();

        Ok(Value::Array(issues))
    }
}

#[async_trait]
impl SuspendingTool for GithubListIssuesTool {
    async fn call(&self, arguments: Arguments) -> ToolResult<Value> {
        let params: GithubListIssuesParams = parse_params(arguments)?;
        self.execute(params).await
    }
}

// ============================================================================
// github_create_issue
// ============================================================================

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GithubCreateIssueParams {
    /// Repository name in format 'owner/repo'
    pub repo: String,

    /// Issue title
    pub title: String,

    /// Issue body text
    pub body: String,

    /// List of label names to apply
    #[serde(default)]
    pub labels: Option<Vec<String>>,
}

/// Open a new issue.
#[derive(Debug, Clone)]
pub struct GithubCreateIssueTool {
    api: GithubApi,
}

impl GithubCreateIssueTool {
    pub const NAME: &'static str = "github_create_issue";
    pub const DESCRIPTION: &'static str = "Create a new issue in a GitHub repository.";

    pub fn new(ctx: ToolContext) -> Self {
        Self {
            api: GithubApi::new(ctx),
        }
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::from_params::<GithubCreateIssueParams>(Self::NAME, Self::DESCRIPTION)
            .suspending()
    }

    pub async fn execute(&self, params: GithubCreateIssueParams) -> ToolResult<Value> {
        let token = require_credential(TOKEN_VAR)?;

        let mut payload = json!({ "title": params.title, "body": params.body });
        if let Some(labels) = params.labels.filter(|l| !l.is_empty()) {
            payload["labels"] = json!(labels);
        }

        let url = self.api.url(&format!("/repos/{}/issues", params.repo));
        let response = self
            .api
            .request(Method::POST, &url, Some(&token))
            .json(&payload)
            .send()
            .await?;
        let issue = expect_json(response, StatusCode::CREATED).await?;

        Ok(json!({
            "number": issue["number"],
            "title": issue["title"],
            "html_url": issue["html_url"],
            "state": issue["state"],
            "created_at": issue["created_at"],
        }))
    }
}

#[async_trait]
impl SuspendingTool for GithubCreateIssueTool {
    async fn call(&self, arguments: Arguments) -> ToolResult<Value> {
        let params: GithubCreateIssueParams = parse_params(arguments)?;
        self.execute(params).await
    }
}

// ============================================================================
// github_list_pull_requests
// ============================================================================

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GithubListPullRequestsParams {
    /// Repository name in format 'owner/repo'
    pub repo: String,

    /// PR state ('open', 'closed', 'all')
    #[serde(default = "default_state")]
    pub state: String,
}

/// List pull requests in a repository.
#[derive(Debug, Clone)]
pub struct GithubListPullRequestsTool {
    api: GithubApi,
}

impl GithubListPullRequestsTool {
    pub const NAME: &'static str = "github_list_pull_requests";
    pub const DESCRIPTION: &'static str = "List pull requests in a GitHub repository.";

    pub fn new(ctx: ToolContext) -> Self {
        Self {
            api: GithubApi::new(ctx),
        }
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::from_params::<GithubListPullRequestsParams>(Self::NAME, Self::DESCRIPTION)
            .suspending()
    }

    pub async fn execute(&self, params: GithubListPullRequestsParams) -> ToolResult<Value> {
        let token = require_credential(TOKEN_VAR)?;

        let response = self
            .api
            .get(&format!("/repos/{}/pulls", params.repo), Some(&token))
            .query(&[("state", params.state.as_str())])
            .send()
            .await?;
        let prs = expect_json(response, StatusCode::OK).await?;

        let prs: Vec<Value> = prs
            .as_array()
            .into_iter()
            .flatten()
            .map(|pr| {
                json!({
                    "number": pr["number"],
                    "title": pr["title"],
                    "state": pr["state"],
                    "created_at": pr["created_at"],
                    "updated_at": pr["updated_at"],
                    "html_url": pr["html_url"],
                    "user": pr["user"]["login"],
                    "head": pr["head"]["ref"],
                    "base": pr["base"]["ref"],
                })
            })
            .collect();

        Ok(Value::Array(prs))
    }
}

#[async_trait]
impl SuspendingTool for GithubListPullRequestsTool {
    async fn call(&self, arguments: Arguments) -> ToolResult<Value> {
        let params: GithubListPullRequestsParams = parse_params(arguments)?;
        self.execute(params).await
    }
}

// ============================================================================
// github_search_code
// ============================================================================

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GithubSearchCodeParams {
    /// Search query
    pub query: String,

    /// Optional repository name in format 'owner/repo' to limit search
    #[serde(default)]
    pub repo: Option<String>,
}

/// Code search, first ten hits.
#[derive(Debug, Clone)]
pub struct GithubSearchCodeTool {
    api: GithubApi,
}

impl GithubSearchCodeTool {
    pub const NAME: &'static str = "github_search_code";
    pub const DESCRIPTION: &'static str = "Search for code on GitHub.";

    pub fn new(ctx: ToolContext) -> Self {
        Self {
            api: GithubApi::new(ctx),
        }
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::from_params::<GithubSearchCodeParams>(Self::NAME, Self::DESCRIPTION)
            .suspending()
    }

    pub async fn execute(&self, params: GithubSearchCodeParams) -> ToolResult<Value> {
        let token = require_credential(TOKEN_VAR)?;
        let query = match &params.repo {
            Some(repo) if !repo.is_empty() => format!("{} repo:{}", params.query, repo),
            _ => params.query.clone(),
        };

        let response = self
            .api
            .get("/search/code", Some(&token))
            .query(&[("q", query.as_str())])
            .send()
            .await?;
        let results = expect_json(response, StatusCode::OK).await?;

        let items: Vec<Value> = results["items"]
            .as_array()
            .into_iter()
            .flatten()
            .take(SEARCH_CODE_LIMIT)
            .map(|item| {
                json!({
                    "repository": item["repository"]["full_name"],
                    "path": item["path"],
                    "name": item["name"],
                    "url": item["html_url"],
                })
            })
            .collect();

        Ok(json!({ "total_count": results["total_count"], "items": items }))
    }
}

#[async_trait]
impl SuspendingTool for GithubSearchCodeTool {
    async fn call(&self, arguments: Arguments) -> ToolResult<Value> {
        let params: GithubSearchCodeParams = parse_params(arguments)?;
        self.execute(params).await
    }
}

// ============================================================================
// github_user_activity
// ============================================================================

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GithubUserActivityParams {
    /// GitHub username to analyze
    pub username: String,

    /// Number of days to look back
    #[serde(default = "default_days")]
    pub days: i64,

    /// GitHub personal access token (optional but recommended to avoid rate limits)
    #[serde(default)]
    pub token: Option<String>,
}

/// Summarize a user's recent issues, pull requests, comments and reviews.
#[derive(Debug, Clone)]
pub struct GithubUserActivityTool {
    api: GithubApi,
}

impl GithubUserActivityTool {
    pub const NAME: &'static str = "github_user_activity";
    pub const DESCRIPTION: &'static str = "Summarize a GitHub user's activity over a time period: \
         issues, pull requests, comments and reviews.";

    pub fn new(ctx: ToolContext) -> Self {
        Self {
            api: GithubApi::new(ctx),
        }
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::from_params::<GithubUserActivityParams>(Self::NAME, Self::DESCRIPTION)
            .suspending()
    }

    /// Items of one issue search; `None` when the query fails.
    async fn search_issues(&self, query: String, token: Option<&str>) -> Option<Vec<Value>> {
        let response = self
            .api
            .get("/search/issues", token)
            .query(&[("q", query.as_str()), ("sort", "updated"), ("order", "desc")])
            .send()
            .await
            .ok()?;
        if response.status() != StatusCode::OK {
            debug!("Skipping search '{}': {}", query, response.status());
            return None;
        }
        let data = response.json::<Value>().await.ok()?;
        Some(data["items"].as_array().cloned().unwrap_or_default())
    }

    async fn is_merged(&self, pr_url: &str, token: Option<&str>) -> bool {
        let Ok(response) = self.api.request(Method::GET, pr_url, token).send().await else {
            return false;
        };
        if response.status() != StatusCode::OK {
            return false;
        }
        match response.json::<Value>().await {
            Ok(detail) => detail["merged"].as_bool().unwrap_or(false),
            Err(_) => false,
        }
    }

    pub async fn execute(&self, params: GithubUserActivityParams) -> ToolResult<Value> {
        let GithubUserActivityParams {
            username,
            days,
            token,
        } = params;
        let token = token
            .filter(|t| !t.is_empty())
            .or_else(|| env_credential(TOKEN_VAR));
        let token = token.as_deref();

        let end_date = Utc::now();
        let start_date = TimeDelta::try_days(days)
            .and_then(|window| end_date.checked_sub_signed(window))
            .ok_or_else(|| ToolError::invalid_arguments(format!("days out of range: {days}")))?;
        let since = start_date.format("%Y-%m-%dT%H:%M:%SZ").to_string();

        info!("Summarizing GitHub activity for '{}' since {}", username, since);

        let user = self.api.get(&format!("/users/{username}"), token).send().await?;
        if user.status() != StatusCode::OK {
            return Ok(error_value(format!(
                "GitHub API error: User not found or API limit reached ({})",
                user.status().as_u16()
            )));
        }

        let summary = |item: &Value, date_key: &str| {
            json!({
                "title": field(item, "title"),
                "url": field(item, "html_url"),
                date_key: field(item, date_key),
                "repo": repo_from_url(item),
            })
        };

        let issues_opened: Vec<Value> = self
            .search_issues(format!("author:{username} type:issue created:>={since}"), token)
            .await
            .unwrap_or_default()
            .iter()
            .map(|issue| summary(issue, "created_at"))
            .collect();

        let mut prs_opened = Vec::new();
        let mut prs_merged = Vec::new();
        let prs = self
            .search_issues(format!("author:{username} type:pr created:>={since}"), token)
            .await
            .unwrap_or_default();
        for pr in &prs {
            let mut info = summary(pr, "created_at");
            info["state"] = field(pr, "state");
            if let Some(url) = pr["pull_request"]["url"].as_str() {
                if self.is_merged(url, token).await {
                    prs_merged.push(info.clone());
                }
            }
            prs_opened.push(info);
        }

        // Commented pull requests are not counted; only issues are.
        let issues_commented: Vec<Value> = self
            .search_issues(format!("commenter:{username} updated:>={since}"), token)
            .await
            .unwrap_or_default()
            .iter()
            .filter(|item| item.get("pull_request").is_none())
            .map(|item| summary(item, "updated_at"))
            .collect();

        let pr_reviews: Vec<Value> = self
            .search_issues(format!("reviewed-by:{username} updated:>={since}"), token)
            .await
            .unwrap_or_default()
            .iter()
            .map(|item| summary(item, "updated_at"))
            .collect();

        Ok(json!({
            "username": username,
            "period": format!(
                "Last {} days ({} to {})",
                days,
                start_date.format("%Y-%m-%d"),
                end_date.format("%Y-%m-%d")
            ),
            "summary": {
                "issues_opened_count": issues_opened.len(),
                "issues_commented_count": issues_commented.len(),
                "prs_opened_count": prs_opened.len(),
                "prs_merged_count": prs_merged.len(),
                "pr_reviews_count": pr_reviews.len(),
            },
            "issues_opened": issues_opened,
            "issues_commented": issues_commented,
            "prs_opened": prs_opened,
            "prs_merged": prs_merged,
            "pr_reviews": pr_reviews,
        }))
    }
}

#[async_trait]
impl SuspendingTool for GithubUserActivityTool {
    async fn call(&self, arguments: Arguments) -> ToolResult<Value> {
        let params: GithubUserActivityParams = parse_params(arguments)?;
        self.execute(params).await
    }
}
