//! Transport layer for the tool host.
//!
//! Three adapters sit in front of the same [`Gateway`](crate::domains::tools::Gateway):
//! - **STDIO**: MCP JSON-RPC over stdin/stdout (default) - feature: `stdio`
//! - **SSE**: MCP over server-sent events with JSON-RPC POSTs - feature: `sse`
//! - **Lines**: newline-delimited `{tool_name, arguments}` envelopes - always built
//!
//! # Feature Flags
//!
//! - `stdio` (default): STDIO transport - no extra dependencies
//! - `sse` (default): SSE transport - adds axum, tower-http, tokio-stream

mod config;
mod error;
mod service;

pub mod lines;

#[cfg(feature = "stdio")]
pub mod stdio;

#[cfg(feature = "sse")]
pub mod sse;

pub use config::{DEFAULT_PORT, SseConfig, TransportConfig};
pub use error::{TransportError, TransportResult};
pub use service::TransportService;
