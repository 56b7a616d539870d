//! Interactive chat client that drives the tool host through a local model.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use mcp_tool_host::client::session::render;
use mcp_tool_host::client::{ChatSession, HostProcess, OllamaClient, ToolBackend};

/// Chat with a local model that can call the host's tools.
#[derive(Debug, Parser)]
#[command(name = "tool-chat", version, about)]
struct Args {
    /// Tool host executable to spawn.
    #[arg(long, default_value = "mcp_tool_host", value_name = "PATH")]
    host_binary: PathBuf,

    /// Log file handed to the host (`--log`).
    #[arg(long, value_name = "FILENAME")]
    log: Option<PathBuf>,

    /// Tool manifest files or directories passed to the host.
    #[arg(value_name = "TOOLS_PATHS")]
    tools_paths: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let model = OllamaClient::from_env()?;

    println!("Starting tool host {} ...", args.host_binary.display());
    let host = HostProcess::spawn(&args.host_binary, &args.tools_paths, args.log.as_deref()).await?;

    match host.tool_names().await {
        Ok(names) => println!("Available tools: {}", names.join(", ")),
        Err(e) => eprintln!("{} {}", "Could not list tools:".yellow(), e),
    }

    let mut session = ChatSession::new(model.clone(), host);

    println!("Checking model {} at {} ...", model.model(), model.server());
    if let Err(e) = session.probe().await {
        session.into_backend().shutdown().await;
        bail!("cannot reach model {} at {}: {e}", model.model(), model.server());
    }

    println!("{}", "=".repeat(60).green());
    println!("Chatting with {}. Type 'quit', 'exit' or 'bye' to end.", model.model());
    println!("{}", "=".repeat(60).green());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "You:".cyan());
        std::io::stdout().flush().context("stdout closed")?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "quit" | "exit" | "bye") {
            break;
        }

        let outcome = session.turn(input).await;
        render(&outcome);
    }

    println!("Exiting chat...");
    session.into_backend().shutdown().await;
    Ok(())
}
