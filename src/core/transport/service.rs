//! Transport service - picks the adapter and runs it until shutdown.

use tracing::info;

use super::lines::LinesTransport;
use super::{TransportConfig, TransportResult};
use crate::core::ToolServer;

#[cfg(not(all(feature = "stdio", feature = "sse")))]
use super::TransportError;

#[cfg(feature = "stdio")]
use super::stdio::StdioTransport;

#[cfg(feature = "sse")]
use super::sse::SseTransport;

/// Manages the transport layer for the tool host.
pub struct TransportService {
    config: TransportConfig,
}

impl TransportService {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Log information about the configured transport.
    pub fn log_info(&self) {
        info!("Starting transport: {}", self.config.description());
    }

    /// Serve `server` on the configured transport.
    ///
    /// Returns when the transport finishes (end of input, client
    /// disconnect) or on Ctrl-C.
    pub async fn run(self, server: ToolServer) -> TransportResult<()> {
        self.log_info();

        let serve = Self::dispatch(self.config, server);
        tokio::select! {
            result = serve => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Received interrupt, shutting down");
                Ok(())
            }
        }
    }

    async fn dispatch(config: TransportConfig, server: ToolServer) -> TransportResult<()> {
        match config {
            TransportConfig::Lines => LinesTransport::run(server).await,
            #[cfg(feature = "stdio")]
            TransportConfig::Stdio => StdioTransport::run(server).await,
            #[cfg(not(feature = "stdio"))]
            TransportConfig::Stdio => Err(TransportError::init(
                "stdio transport not compiled in (enable the `stdio` feature)",
            )),
            #[cfg(feature = "sse")]
            TransportConfig::Sse(cfg) => SseTransport::new(cfg).run(server).await,
            #[cfg(not(feature = "sse"))]
            TransportConfig::Sse(_) => Err(TransportError::init(
                "sse transport not compiled in (enable the `sse` feature)",
            )),
        }
    }
}
