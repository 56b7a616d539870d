//! Minimal Ollama chat client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_SERVER: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2:3b";
const TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("model server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected model response: {0}")]
    Response(String),
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
    error: Option<String>,
}

/// Ollama `/api/chat` client.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    server: String,
    model: String,
}

impl OllamaClient {
    pub fn new(server: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let server = server.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(|source| LlmError::Request { url: server.clone(), source })?;
        Ok(Self { client, server, model: model.into() })
    }

    /// Configure from `OLLAMA_SERVER` and `OLLAMA_MODEL`.
    pub fn from_env() -> Result<Self, LlmError> {
        let server = std::env::var("OLLAMA_SERVER").unwrap_or_else(|_| DEFAULT_SERVER.to_string());
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::new(server, model)
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send the conversation and return the assistant's reply text.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.server);
        debug!("Sending {} messages to {}", messages.len(), self.model);

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { model: &self.model, messages, stream: false })
            .send()
            .await
            .map_err(|source| LlmError::Request { url: url.clone(), source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Response(e.to_string()))?;
        if let Some(error) = body.error {
            return Err(LlmError::Response(error));
        }
        body.message
            .map(|m| m.content)
            .ok_or_else(|| LlmError::Response("missing message".to_string()))
    }
}
