//! The chat loop: model reply → command → tool call → history.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::Colorize;
use rmcp::model::{CallToolRequestParam, CallToolResult};
use rmcp::service::RunningService;
use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
use rmcp::{RoleClient, ServiceExt};
use serde_json::{Value, json};
use tokio::process::Command;
use tracing::{info, warn};

use super::command::{GRAMMAR, ParsedReply, parse_reply};
use super::llm::{ChatMessage, LlmError, OllamaClient};
use crate::domains::tools::Arguments;

/// Variables passed through to the host process; everything else is dropped.
pub const FORWARDED_ENV: &[&str] = &[
    "PATH",
    "HOME",
    "RUST_LOG",
    "GITHUB_TOKEN",
    "GITHUB_PERSONAL_ACCESS_TOKEN",
    "NEWSAPI_KEY",
    "TAVILY_API_KEY",
    "OPENWEATHER_API_KEY",
];

const APOLOGY: &str = "Sorry, I encountered an error trying to process that. Please try again.";

/// Something that can answer a conversation.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

#[async_trait]
impl ChatModel for OllamaClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.chat(messages).await
    }
}

/// Something that can run tools by name.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    async fn tool_names(&self) -> Result<Vec<String>, String>;
    async fn call(&self, name: &str, arguments: Arguments) -> Result<Value, String>;
}

/// A tool host running as a child process, spoken to over MCP stdio.
pub struct HostProcess {
    service: RunningService<RoleClient, ()>,
}

impl HostProcess {
    /// Spawn `binary` with the given manifest paths and connect to it.
    pub async fn spawn(binary: &Path, tools_paths: &[PathBuf], log: Option<&Path>) -> Result<Self> {
        let command = Command::new(binary).configure(|cmd| {
            if let Some(log) = log {
                cmd.arg("--log").arg(log);
            }
            cmd.args(tools_paths);
            cmd.env_clear();
            for name in FORWARDED_ENV {
                if let Ok(value) = std::env::var(name) {
                    cmd.env(name, value);
                }
            }
        });

        let transport = TokioChildProcess::new(command)
            .with_context(|| format!("failed to start {}", binary.display()))?;
        let service = ()
            .serve(transport)
            .await
            .context("failed to initialize MCP session with the tool host")?;

        info!("Connected to tool host {}", binary.display());
        Ok(Self { service })
    }

    pub async fn shutdown(self) {
        if let Err(e) = self.service.cancel().await {
            warn!("Tool host did not shut down cleanly: {}", e);
        }
    }
}

#[async_trait]
impl ToolBackend for HostProcess {
    async fn tool_names(&self) -> Result<Vec<String>, String> {
        let tools = self.service.list_all_tools().await.map_err(|e| e.to_string())?;
        Ok(tools.into_iter().map(|t| t.name.to_string()).collect())
    }

    async fn call(&self, name: &str, arguments: Arguments) -> Result<Value, String> {
        let request: CallToolRequestParam =
            serde_json::from_value(json!({ "name": name, "arguments": arguments }))
                .map_err(|e| e.to_string())?;
        let result = self.service.call_tool(request).await.map_err(|e| e.to_string())?;
        call_result_value(result)
    }
}

/// Decode a tool result into JSON, or its error text.
pub fn call_result_value(result: CallToolResult) -> Result<Value, String> {
    let text = result
        .content
        .iter()
        .filter_map(|c| c.as_text().map(|t| t.text.as_str()))
        .collect::<Vec<_>>()
        .join("\n");

    if result.is_error == Some(true) {
        return Err(text);
    }
    if let Some(structured) = result.structured_content {
        return Ok(structured);
    }
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

/// What happened in one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The model answered in prose.
    Reply(String),
    /// A tool ran successfully.
    ToolResult { tool: String, value: Value },
    /// The turn was discarded.
    Failed(String),
}

/// Conversation state plus the collaborators it drives.
pub struct ChatSession<M, B> {
    model: M,
    backend: B,
    history: Vec<ChatMessage>,
}

impl<M: ChatModel, B: ToolBackend> ChatSession<M, B> {
    pub fn new(model: M, backend: B) -> Self {
        Self {
            model,
            backend,
            history: vec![ChatMessage::system(system_prompt())],
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Check the model answers at all.
    pub async fn probe(&self) -> Result<(), LlmError> {
        self.model
            .complete(&[ChatMessage::user("Hello")])
            .await
            .map(|_| ())
    }

    /// Run one user turn. Failed turns leave the history as it was.
    pub async fn turn(&mut self, input: &str) -> TurnOutcome {
        self.history.push(ChatMessage::user(input));

        let reply = match self.model.complete(&self.history).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Model call failed: {}", e);
                return self.discard(e.to_string());
            }
        };

        match parse_reply(&reply) {
            ParsedReply::Chat(text) => {
                self.history.push(ChatMessage::assistant(text.clone()));
                TurnOutcome::Reply(text)
            }
            ParsedReply::Malformed(reason) => self.discard(reason),
            ParsedReply::Command(command) => {
                let tool = command.tool_name();
                info!("Calling {} with {:?}", tool, command.arguments());
                match self.backend.call(tool, command.arguments()).await {
                    Ok(value) => {
                        self.history.push(ChatMessage::assistant(reply.trim()));
                        self.history.push(ChatMessage::system(format!(
                            "Tool '{tool}' Response: {value}"
                        )));
                        TurnOutcome::ToolResult { tool: tool.to_string(), value }
                    }
                    Err(e) => self.discard(format!("Error calling tool '{tool}': {e}")),
                }
            }
        }
    }

    fn discard(&mut self, reason: String) -> TurnOutcome {
        self.history.pop();
        TurnOutcome::Failed(reason)
    }
}

/// System prompt describing the command grammar.
pub fn system_prompt() -> String {
    let mut prompt = String::from(
        "You are an assistant with access to tools. When the user's request matches one of \
         the commands below, respond *only* with the command string. Use the repository \
         owner and name where required. Otherwise, respond naturally as a helpful assistant.\n\
         Available commands:\n",
    );
    for line in GRAMMAR {
        prompt.push_str(line);
        prompt.push('\n');
    }
    prompt
}

/// Print a turn outcome to the terminal.
pub fn render(outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Reply(text) => println!("{} {}", "Assistant:".green(), text),
        TurnOutcome::ToolResult { tool, value } => {
            println!("{} {}", "Tool response from".yellow(), tool.yellow());
            let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            println!("{pretty}");
        }
        TurnOutcome::Failed(reason) => {
            println!("{} {}", "Assistant:".green(), APOLOGY);
            eprintln!("{}", reason.red());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::{Envelope, Gateway, InvocationRequest, ToolRegistry, register_builtins};
    use crate::domains::tools::{Callable, ToolOrigin};
    use crate::domains::tools::definitions::CalculatorTool;
    use std::sync::Mutex;

    struct Scripted(Mutex<Vec<Result<String, LlmError>>>);

    impl Scripted {
        fn new(replies: Vec<Result<String, LlmError>>) -> Self {
            Self(Mutex::new(replies.into_iter().rev().collect()))
        }
    }

    #[async_trait]
    impl ChatModel for Scripted {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, LlmError> {
            self.0
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(LlmError::Response("script exhausted".into())))
        }
    }

    #[async_trait]
    impl ToolBackend for Gateway {
        async fn tool_names(&self) -> Result<Vec<String>, String> {
            Ok(self.registry().tool_names().into_iter().map(String::from).collect())
        }

        async fn call(&self, name: &str, arguments: Arguments) -> Result<Value, String> {
            match self.invoke(InvocationRequest::new(name, arguments)).await.envelope {
                Envelope::Result(value) => Ok(value),
                Envelope::Error(message) => Err(message),
            }
        }
    }

    fn gateway() -> Gateway {
        let mut registry = ToolRegistry::new();
        register_builtins(&mut registry);
        registry.register(
            CalculatorTool::descriptor(),
            Callable::blocking(CalculatorTool),
            ToolOrigin::BuiltIn,
        );
        Gateway::new(registry)
    }

    fn session(replies: Vec<Result<String, LlmError>>) -> ChatSession<Scripted, Gateway> {
        ChatSession::new(Scripted::new(replies), gateway())
    }

    #[tokio::test]
    async fn test_command_turn_records_tool_response() {
        let mut session = session(vec![Ok("CALC 2 + 3".into())]);
        let outcome = session.turn("what is 2 plus 3").await;

        let TurnOutcome::ToolResult { tool, value } = outcome else {
            panic!("expected tool result, got {outcome:?}");
        };
        assert_eq!(tool, "calculator");
        assert_eq!(value["result"], 5);

        let history = session.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[2], ChatMessage::assistant("CALC 2 + 3"));
        assert!(history[3].content.starts_with("Tool 'calculator' Response:"));
    }

    #[tokio::test]
    async fn test_chat_turn_appends_reply() {
        let mut session = session(vec![Ok("Hi there!".into())]);
        assert_eq!(session.turn("hello").await, TurnOutcome::Reply("Hi there!".into()));
        assert_eq!(session.history().len(), 3);
    }

    #[tokio::test]
    async fn test_failures_pop_the_user_message() {
        let mut session = session(vec![
            Err(LlmError::Response("down".into())),
            Ok("LIST_ISSUES not-a-repo".into()),
        ]);

        assert!(matches!(session.turn("first").await, TurnOutcome::Failed(_)));
        assert!(matches!(session.turn("second").await, TurnOutcome::Failed(_)));
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn test_tool_error_discards_turn() {
        // wikipedia_search is not registered in this gateway.
        let mut session = session(vec![Ok("WIKI Rust".into())]);
        let TurnOutcome::Failed(reason) = session.turn("tell me about rust").await else {
            panic!("expected failure");
        };
        assert!(reason.contains("wikipedia_search"));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_call_result_value() {
        let result = CallToolResult::success(vec![rmcp::model::Content::text("{\"a\":1}")]);
        assert_eq!(call_result_value(result).unwrap(), json!({"a": 1}));

        let result = CallToolResult::success(vec![rmcp::model::Content::text("plain")]);
        assert_eq!(call_result_value(result).unwrap(), json!("plain"));

        let result = CallToolResult::error(vec![rmcp::model::Content::text("boom")]);
        assert_eq!(call_result_value(result).unwrap_err(), "boom");
    }

    #[test]
    fn test_system_prompt_lists_grammar() {
        let prompt = system_prompt();
        assert!(prompt.contains("GET_FILE <owner>/<repo> <file_path>"));
        assert!(prompt.contains("ACTIVITY"));
    }
}
