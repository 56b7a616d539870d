//! Newline-delimited envelope transport.
//!
//! One JSON request per input line, one JSON response per output line:
//!
//! ```text
//! → {"id": 1, "tool_name": "calculator", "arguments": {"expression": "2+2"}}
//! ← {"id": 1, "result": {"result": 4, "expression": "2+2"}}
//! ```
//!
//! Requests are dispatched in arrival order but run concurrently, so
//! responses can come back out of order; `id` correlates them. Malformed
//! lines get an error envelope with a null id. At end of input the transport
//! waits for in-flight calls, then returns.

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::TransportResult;
use crate::core::ToolServer;
use crate::domains::tools::{Arguments, Envelope, Gateway, InvocationRequest};

/// Lines transport handler.
pub struct LinesTransport;

#[derive(Debug, Deserialize)]
struct LineRequest {
    #[serde(default)]
    id: Value,
    tool_name: String,
    #[serde(default)]
    arguments: Arguments,
}

impl LinesTransport {
    /// Serve stdin/stdout until end of input.
    pub async fn run(server: ToolServer) -> TransportResult<()> {
        info!("Ready - reading newline-delimited requests from stdin");
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        serve(server.gateway().clone(), stdin, &mut stdout).await?;
        info!("Lines transport finished");
        Ok(())
    }
}

/// Serve requests from `input`, writing one response line per request to `output`.
pub async fn serve<R, W>(gateway: Gateway, input: R, mut output: W) -> TransportResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut in_flight: JoinSet<(Value, Envelope)> = JoinSet::new();
    let mut eof = false;

    loop {
        tokio::select! {
            line = lines.next_line(), if !eof => {
                match line? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => match serde_json::from_str::<LineRequest>(&line) {
                        Ok(request) => {
                            debug!("Dispatching {}", request.tool_name);
                            let gateway = gateway.clone();
                            in_flight.spawn(async move {
                                let outcome = gateway
                                    .invoke(InvocationRequest::new(request.tool_name, request.arguments))
                                    .await;
                                (request.id, outcome.envelope)
                            });
                        }
                        Err(e) => {
                            warn!("Malformed request line: {}", e);
                            let envelope = Envelope::Error(format!("Malformed request: {e}"));
                            write_response(&mut output, Value::Null, envelope).await?;
                        }
                    },
                    None => eof = true,
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                match joined {
                    Ok((id, envelope)) => write_response(&mut output, id, envelope).await?,
                    Err(e) => {
                        error!("Invocation task failed: {}", e);
                        let envelope = Envelope::Error(format!("Internal error: {e}"));
                        write_response(&mut output, Value::Null, envelope).await?;
                    }
                }
            }
            else => break,
        }
    }

    output.flush().await?;
    Ok(())
}

async fn write_response<W>(output: &mut W, id: Value, envelope: Envelope) -> TransportResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut response = Map::new();
    response.insert("id".to_string(), id);
    match envelope {
        Envelope::Result(value) => response.insert("result".to_string(), value),
        Envelope::Error(message) => response.insert("error".to_string(), Value::String(message)),
    };

    let mut line = serde_json::to_vec(&Value::Object(response))?;
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await?;
    Ok(())
}
