//! Core infrastructure shared by every transport.
//!
//! Configuration, command-line parsing, logging, error types, the MCP
//! handler and the transport layer live here; tool semantics live in
//! [`crate::domains::tools`].

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod transport;

pub use cli::Cli;
pub use config::Config;
pub use error::{Error, Result};
pub use server::ToolServer;
pub use transport::{TransportConfig, TransportService};
