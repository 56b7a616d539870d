//! Command-line surface of the tool host.

use std::fmt;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Which transport adapter serves the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    /// MCP JSON-RPC over stdin/stdout.
    Stdio,
    /// MCP over server-sent events plus JSON-RPC over POST.
    Sse,
    /// Newline-delimited `{tool_name, arguments}` envelopes over stdin/stdout.
    Lines,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Sse => "sse",
            Self::Lines => "lines",
        }
    }

    /// Parse a transport name as accepted on the command line.
    pub fn parse(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host a registry of tools behind an MCP transport.
#[derive(Debug, Clone, Parser)]
#[command(name = "mcp_tool_host", version, about)]
pub struct Cli {
    /// Tool manifest files or directories to load, in order.
    #[arg(value_name = "TOOLS_PATHS")]
    pub tools_paths: Vec<PathBuf>,

    /// Write detailed DEBUG logs to this file (truncated on startup).
    #[arg(long, value_name = "FILENAME")]
    pub log: Option<PathBuf>,

    /// Transport to serve on [default: stdio].
    #[arg(long, value_enum)]
    pub transport: Option<TransportKind>,

    /// Port for the network transport [default: 8080].
    #[arg(long)]
    pub port: Option<u16>,

    /// Bind address for the network transport [default: 127.0.0.1].
    #[arg(long)]
    pub host: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::parse_from(["mcp_tool_host"]);
        assert!(cli.tools_paths.is_empty());
        assert!(cli.log.is_none());
        assert!(cli.transport.is_none());
        assert!(cli.port.is_none());
    }

    #[test]
    fn test_parse_full() {
        let cli = Cli::parse_from([
            "mcp_tool_host",
            "--transport",
            "sse",
            "--port",
            "9000",
            "--log",
            "debug.log",
            "tools/",
        ]);
        assert_eq!(cli.transport, Some(TransportKind::Sse));
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.log, Some(PathBuf::from("debug.log")));
        assert_eq!(cli.tools_paths, vec![PathBuf::from("tools/")]);
    }

    #[test]
    fn test_unsupported_transport_is_rejected() {
        let result = Cli::try_parse_from(["mcp_tool_host", "--transport", "carrier-pigeon"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_kind_parse_is_case_insensitive() {
        assert_eq!(TransportKind::parse("LINES"), Some(TransportKind::Lines));
        assert_eq!(TransportKind::parse("tcp"), None);
    }
}
