//! Tool host entry point.
//!
//! Parses the command line, loads configuration and tool manifests, then
//! serves the gateway on the selected transport.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use mcp_tool_host::core::{Cli, Config, ToolServer, TransportService, logging};
use mcp_tool_host::domains::tools::definitions::ToolContext;
use mcp_tool_host::domains::tools::{
    Catalog, Gateway, ToolLoader, ToolRegistry, register_builtins,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // One thread is enough. Blocking tools run inline on it and are short and
    // CPU bound; everything else is I/O bound.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(run(cli))?;
    Ok(())
}

async fn run(cli: Cli) -> mcp_tool_host::Result<()> {
    let config = Config::from_env().apply_cli(&cli);
    logging::init(&config.logging)?;

    info!("Starting {} v{}", config.server.name, config.server.version);

    let ctx = ToolContext::from_config(&config)?;
    let mut registry = ToolRegistry::new();
    register_builtins(&mut registry);

    let loader = ToolLoader::new(Catalog::new(ctx));
    for tool in loader.discover(&config.tools.paths) {
        registry.register_tool(tool);
    }
    registry.log_banner();

    let gateway = Gateway::new(registry).with_default_timeout(config.tools.timeout());
    let server = ToolServer::new(gateway, config.server.clone());

    TransportService::new(config.transport).run(server).await?;

    info!("Server shutting down");
    Ok(())
}
