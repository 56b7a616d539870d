//! Command grammar the language model answers in.
//!
//! A reply whose first word is a known command keyword is a tool command;
//! anything else is ordinary chat. A known keyword with the wrong shape is
//! reported as malformed rather than silently treated as chat.

use serde_json::{Value, json};

use crate::domains::tools::Arguments;

/// A tool request extracted from a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCommand {
    Weather { location: String },
    Forecast { location: String },
    Wiki { query: String },
    Calc { expression: String },
    Arxiv { query: String },
    Search { query: String },
    SearchCode { query: String },
    GetFile { repo: String, path: String },
    ListIssues { repo: String },
    ListPrs { repo: String },
    Activity { username: String },
}

/// Classification of one model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedReply {
    Command(ToolCommand),
    Chat(String),
    Malformed(String),
}

/// Keywords with their argument shape, for the system prompt.
pub const GRAMMAR: &[&str] = &[
    "WEATHER <location>",
    "FORECAST <location>",
    "WIKI <query>",
    "CALC <expression>",
    "ARXIV <query>",
    "SEARCH <query>",
    "SEARCH_CODE <query>",
    "GET_FILE <owner>/<repo> <file_path>",
    "LIST_ISSUES <owner>/<repo>",
    "LIST_PRS <owner>/<repo>",
    "ACTIVITY <github_username>",
];

impl ToolCommand {
    /// Registered tool this command calls.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::Weather { .. } => "fetch_weather",
            Self::Forecast { .. } => "openmeteo_forecast",
            Self::Wiki { .. } => "wikipedia_search",
            Self::Calc { .. } => "calculator",
            Self::Arxiv { .. } => "arxiv_search",
            Self::Search { .. } => "duckduckgo_search",
            Self::SearchCode { .. } => "github_search_code",
            Self::GetFile { .. } => "github_get_file",
            Self::ListIssues { .. } => "github_list_issues",
            Self::ListPrs { .. } => "github_list_pull_requests",
            Self::Activity { .. } => "github_user_activity",
        }
    }

    /// Keyword arguments for the call.
    pub fn arguments(&self) -> Arguments {
        let value = match self {
            Self::Weather { location } | Self::Forecast { location } => {
                json!({ "location": location })
            }
            Self::Wiki { query }
            | Self::Arxiv { query }
            | Self::Search { query }
            | Self::SearchCode { query } => json!({ "query": query }),
            Self::Calc { expression } => json!({ "expression": expression }),
            Self::GetFile { repo, path } => json!({ "repo": repo, "path": path }),
            Self::ListIssues { repo } | Self::ListPrs { repo } => json!({ "repo": repo }),
            Self::Activity { username } => json!({ "username": username }),
        };
        match value {
            Value::Object(map) => map,
            _ => Arguments::new(),
        }
    }
}

/// Parse a model reply.
pub fn parse_reply(reply: &str) -> ParsedReply {
    let reply = reply.trim();
    let mut words = reply.split_whitespace();
    let Some(keyword) = words.next() else {
        return ParsedReply::Chat(String::new());
    };
    let rest: Vec<&str> = words.collect();
    let joined = rest.join(" ");

    let command = match keyword {
        "WEATHER" => free_text(&joined).map(|location| ToolCommand::Weather { location }),
        "FORECAST" => free_text(&joined).map(|location| ToolCommand::Forecast { location }),
        "WIKI" => free_text(&joined).map(|query| ToolCommand::Wiki { query }),
        "CALC" => free_text(&joined).map(|expression| ToolCommand::Calc { expression }),
        "ARXIV" => free_text(&joined).map(|query| ToolCommand::Arxiv { query }),
        "SEARCH" => free_text(&joined).map(|query| ToolCommand::Search { query }),
        "SEARCH_CODE" => free_text(&joined).map(|query| ToolCommand::SearchCode { query }),
        "GET_FILE" => match rest.as_slice() {
            [repo, path] => owner_repo(repo).map(|repo| ToolCommand::GetFile {
                repo,
                path: path.to_string(),
            }),
            _ => Err("GET_FILE expects <owner>/<repo> <file_path>".to_string()),
        },
        "LIST_ISSUES" => single_repo("LIST_ISSUES", &rest).map(|repo| ToolCommand::ListIssues { repo }),
        "LIST_PRS" => single_repo("LIST_PRS", &rest).map(|repo| ToolCommand::ListPrs { repo }),
        "ACTIVITY" => match rest.as_slice() {
            [username] => Ok(ToolCommand::Activity {
                username: username.to_string(),
            }),
            _ => Err("ACTIVITY expects a single GitHub username".to_string()),
        },
        _ => return ParsedReply::Chat(reply.to_string()),
    };

    match command {
        Ok(command) => ParsedReply::Command(command),
        Err(reason) => ParsedReply::Malformed(reason),
    }
}

fn free_text(text: &str) -> Result<String, String> {
    if text.is_empty() {
        Err("command is missing its argument".to_string())
    } else {
        Ok(text.to_string())
    }
}

fn single_repo(keyword: &str, rest: &[&str]) -> Result<String, String> {
    match rest {
        [repo] => owner_repo(repo),
        _ => Err(format!("{keyword} expects <owner>/<repo>")),
    }
}

fn owner_repo(text: &str) -> Result<String, String> {
    match text.split('/').collect::<Vec<_>>().as_slice() {
        [owner, repo] if !owner.is_empty() && !repo.is_empty() => Ok(text.to_string()),
        _ => Err(format!("Invalid owner/repo format '{text}'. Use owner/repo.")),
    }
}
