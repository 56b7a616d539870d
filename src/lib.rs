//! MCP Tool Host Library
//!
//! A registry of named tools, an invocation gateway that binds keyword
//! arguments and shapes every outcome into a result or error envelope, and
//! transports that expose the gateway to clients.
//!
//! # Architecture
//!
//! - **core**: configuration, CLI, logging, the MCP handler and transports
//! - **domains::tools**: descriptors, registry, gateway, manifest loader,
//!   built-in and catalog tools
//! - **client**: the interactive `tool-chat` front end
//!
//! # Example
//!
//! ```rust,no_run
//! use mcp_tool_host::core::{Config, ToolServer};
//! use mcp_tool_host::domains::tools::{Gateway, ToolRegistry, register_builtins};
//!
//! let mut registry = ToolRegistry::new();
//! register_builtins(&mut registry);
//! let server = ToolServer::new(Gateway::new(registry), Config::from_env().server);
//! assert_eq!(server.tools().len(), 2);
//! ```

pub mod client;
pub mod core;
pub mod domains;

pub use core::{Config, Error, Result, ToolServer};
