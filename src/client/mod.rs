//! Interactive chat front end for the tool host.
//!
//! A local language model turns each user line into either prose or a
//! one-line command; commands become tool calls against a host spawned as
//! an MCP child process.

pub mod command;
pub mod llm;
pub mod session;

pub use command::{ParsedReply, ToolCommand, parse_reply};
pub use llm::{ChatMessage, LlmError, OllamaClient};
pub use session::{ChatModel, ChatSession, HostProcess, ToolBackend, TurnOutcome};
