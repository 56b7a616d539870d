//! MCP server handler.
//!
//! `ToolServer` implements the rmcp `ServerHandler` trait by marshalling
//! `tools/list` and `tools/call` to and from the [`Gateway`]. It holds no
//! tool logic of its own; the SSE transport reuses the same mapping so both
//! MCP transports answer identically.

use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, model::*, service::RequestContext};
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::config::ServerConfig;
use crate::domains::tools::{
    Arguments, Envelope, ErrorKind, Gateway, InvocationOutcome, InvocationRequest,
    InvocationState,
};

const INSTRUCTIONS: &str = "Tool host exposing registered tools. Use tools/list to discover them \
     and tools/call to invoke one by name with keyword arguments.";

/// The MCP server handler.
#[derive(Debug, Clone)]
pub struct ToolServer {
    gateway: Gateway,
    info: ServerConfig,
}

impl ToolServer {
    pub fn new(gateway: Gateway, info: ServerConfig) -> Self {
        Self { gateway, info }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn version(&self) -> &str {
        &self.info.version
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn instructions(&self) -> &'static str {
        INSTRUCTIONS
    }

    /// Tool models in registration order.
    pub fn tools(&self) -> Vec<Tool> {
        self.gateway.registry().get_all_tools()
    }

    /// Invoke a tool and map the outcome to an MCP result.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        let request = InvocationRequest::new(name, arguments.unwrap_or_default());
        let outcome = self.gateway.invoke(request).await;
        to_call_tool_result(outcome)
    }
}

/// Map a gateway outcome to an MCP tool result.
///
/// Lookup and binding failures are protocol errors (`invalid_params`); a
/// failing tool is a successful response carrying `is_error`.
pub fn to_call_tool_result(outcome: InvocationOutcome) -> Result<CallToolResult, McpError> {
    match (outcome.state, outcome.envelope) {
        (_, Envelope::Result(value)) => {
            let text = match &value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let structured = value.is_object().then_some(value);
            Ok(CallToolResult {
                content: vec![Content::text(text)],
                structured_content: structured,
                is_error: Some(false),
                meta: None,
            })
        }
        (
            InvocationState::Failed(ErrorKind::ToolNotFound | ErrorKind::InvalidArguments),
            Envelope::Error(message),
        ) => Err(McpError::invalid_params(message, None)),
        (_, Envelope::Error(message)) => Ok(CallToolResult::error(vec![Content::text(message)])),
    }
}

impl ServerHandler for ToolServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.info.name.clone(),
                version: self.info.version.clone(),
                ..Implementation::default()
            },
            ..Default::default()
        }
    }

    #[instrument(skip(self, _context))]
    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        info!("Listing tools");
        Ok(ListToolsResult {
            tools: self.tools(),
            next_cursor: None,
            meta: None,
        })
    }

    #[instrument(skip(self, request, _context), fields(tool = %request.name))]
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        info!("Calling tool");
        let result = self.call(&request.name, request.arguments).await;
        if let Err(e) = &result {
            warn!("Rejected call: {}", e.message);
        }
        result
    }
}

/// Decode `tools/call` arguments that arrived as loose JSON.
pub fn arguments_from_value(value: Option<Value>) -> Result<Arguments, String> {
    match value {
        None | Some(Value::Null) => Ok(Arguments::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err("arguments must be an object".to_string()),
    }
}
