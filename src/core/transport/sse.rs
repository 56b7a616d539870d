//! SSE transport implementation.
//!
//! MCP over server-sent events: a client opens `GET /sse`, receives an
//! `endpoint` event naming its message URL, then POSTs JSON-RPC messages to
//! `/messages?session_id=<id>`. Each response arrives as a `message` event on
//! the same stream. `POST /mcp` answers JSON-RPC directly in the HTTP
//! response for plain HTTP clients (curl, scripts).

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt, wrappers::UnboundedReceiverStream};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, instrument, warn};

use super::{TransportError, TransportResult, config::SseConfig};
use crate::core::ToolServer;
use crate::core::server::arguments_from_value;

const PROTOCOL_VERSION: &str = "2024-11-05";

/// SSE transport handler.
pub struct SseTransport {
    config: SseConfig,
}

/// JSON-RPC request structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Method not found error.
    pub fn method_not_found(id: Option<Value>) -> Self {
        Self::error(id, -32601, "Method not found")
    }

    /// Invalid request error.
    pub fn invalid_request(id: Option<Value>) -> Self {
        Self::error(id, -32600, "Invalid Request")
    }

    /// Invalid params error.
    pub fn invalid_params(id: Option<Value>, msg: impl Into<String>) -> Self {
        Self::error(id, -32602, msg)
    }

    /// Internal error.
    pub fn internal_error(id: Option<Value>, msg: impl Into<String>) -> Self {
        Self::error(id, -32603, msg)
    }
}

type Sessions = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Event>>>>;

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    server: ToolServer,
    sessions: Sessions,
}

impl AppState {
    pub fn new(server: ToolServer) -> Self {
        Self {
            server,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn sender(&self, session_id: &str) -> Option<mpsc::UnboundedSender<Event>> {
        self.sessions
            .lock()
            .ok()
            .and_then(|sessions| sessions.get(session_id).cloned())
    }
}

/// Removes a session once its event stream is dropped.
struct SessionGuard {
    sessions: Sessions,
    id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.remove(&self.id);
        }
        debug!("SSE session {} closed", self.id);
    }
}

impl SseTransport {
    pub fn new(config: SseConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the router serving every endpoint.
    pub fn router(server: ToolServer, enable_cors: bool) -> Router {
        let app = Router::new()
            .route("/sse", get(handle_sse))
            .route("/messages", post(handle_message))
            .route("/mcp", post(handle_rpc))
            .route("/health", get(health_check))
            .route("/", get(root_handler))
            .with_state(AppState::new(server));

        if enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            app.layer(cors)
        } else {
            app
        }
    }

    /// Run the SSE transport.
    pub async fn run(self, server: ToolServer) -> TransportResult<()> {
        let addr = self.address();
        let app = Self::router(server, self.config.enable_cors);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        info!("Ready - listening on http://{}", addr);
        info!("  → Events:   GET /sse");
        info!("  → Messages: POST /messages?session_id=<id>");
        info!("  → JSON-RPC: POST /mcp");
        info!("  → Health:   GET /health");

        axum::serve(listener, app)
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        Ok(())
    }
}

/// Root handler - provides API info.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "name": state.server.name(),
        "version": state.server.version(),
        "transport": "SSE",
        "endpoints": {
            "sse": "/sse",
            "messages": "/messages",
            "rpc": "/mcp",
            "health": "/health"
        },
        "protocol": "JSON-RPC 2.0"
    }))
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Open an event stream for a new session.
async fn handle_sse(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let id = uuid::Uuid::new_v4().simple().to_string();
    let (tx, rx) = mpsc::unbounded_channel();

    if let Ok(mut sessions) = state.sessions.lock() {
        sessions.insert(id.clone(), tx);
    }
    info!("SSE session {} opened", id);

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?session_id={id}"));
    let guard = SessionGuard {
        sessions: state.sessions.clone(),
        id,
    };

    let stream = tokio_stream::once(endpoint)
        .chain(UnboundedReceiverStream::new(rx))
        .map(move |event| {
            let _session = &guard;
            Ok(event)
        });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: String,
}

/// Accept a JSON-RPC message for a session; the reply goes out on its stream.
#[instrument(skip_all, fields(session, method))]
async fn handle_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    Json(request): Json<JsonRpcRequest>,
) -> StatusCode {
    let span = tracing::Span::current();
    span.record("session", query.session_id.as_str());
    span.record("method", request.method.as_str());

    let Some(sender) = state.sender(&query.session_id) else {
        warn!("Unknown session");
        return StatusCode::NOT_FOUND;
    };

    tokio::spawn(async move {
        let is_notification = request.id.is_none();
        let response = process_request(&state, request).await;
        if is_notification {
            return;
        }
        deliver(&sender, &response);
    });

    StatusCode::ACCEPTED
}

/// Push a response onto a session stream. Returns false when it was dropped.
fn deliver(sender: &mpsc::UnboundedSender<Event>, response: &JsonRpcResponse) -> bool {
    let data = match serde_json::to_string(response) {
        Ok(data) => data,
        Err(e) => {
            warn!("Failed to encode response: {}", e);
            return false;
        }
    };
    match sender.send(Event::default().event("message").data(data)) {
        Ok(()) => true,
        Err(_) => {
            debug!("Session stream closed, dropping response");
            false
        }
    }
}

/// Handle JSON-RPC requests answered in the HTTP response.
#[instrument(skip_all, fields(method))]
async fn handle_rpc(
    State(state): State<AppState>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    tracing::Span::current().record("method", request.method.as_str());
    info!("Received JSON-RPC request: {}", request.method);
    let response = process_request(&state, request).await;
    (StatusCode::OK, Json(response))
}

/// Process a JSON-RPC request and return the response.
async fn process_request(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    if request.jsonrpc != "2.0" {
        return JsonRpcResponse::invalid_request(request.id);
    }

    match request.method.as_str() {
        "initialize" => handle_initialize(state, request),
        "ping" => JsonRpcResponse::success(request.id, json!({})),
        "tools/list" => handle_tools_list(state, request),
        "tools/call" => handle_tools_call(state, request).await,
        method if method.starts_with("notifications/") => {
            debug!("Received notification: {}", method);
            JsonRpcResponse::success(request.id, Value::Null)
        }
        _ => {
            warn!("Unknown method: {}", request.method);
            JsonRpcResponse::method_not_found(request.id)
        }
    }
}

fn handle_initialize(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    info!("Processing initialize request");
    let result = json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": state.server.name(),
            "version": state.server.version()
        },
        "instructions": state.server.instructions()
    });
    JsonRpcResponse::success(request.id, result)
}

fn handle_tools_list(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    match serde_json::to_value(state.server.tools()) {
        Ok(tools) => JsonRpcResponse::success(request.id, json!({ "tools": tools })),
        Err(e) => JsonRpcResponse::internal_error(request.id, e.to_string()),
    }
}

async fn handle_tools_call(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    let Some(params) = request.params else {
        return JsonRpcResponse::invalid_params(request.id, "Missing params");
    };
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return JsonRpcResponse::invalid_params(request.id, "Missing tool name");
    };
    let arguments = match arguments_from_value(params.get("arguments").cloned()) {
        Ok(arguments) => arguments,
        Err(e) => return JsonRpcResponse::invalid_params(request.id, e),
    };

    match state.server.call(name, Some(arguments)).await {
        Ok(result) => match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(e) => JsonRpcResponse::internal_error(request.id, e.to_string()),
        },
        Err(e) => JsonRpcResponse::error(request.id, e.code.0, e.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::domains::tools::{Gateway, ToolRegistry, register_builtins};

    async fn spawn_server() -> String {
        let mut registry = ToolRegistry::new();
        register_builtins(&mut registry);
        let server = ToolServer::new(Gateway::new(registry), Config::default().server);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let app = SseTransport::router(server, false);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        base
    }

    async fn rpc(base: &str, body: Value) -> Value {
        reqwest::Client::new()
            .post(format!("{base}/mcp"))
            .json(&body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    #[test]
    fn test_deliver_to_closed_stream() {
        let response = JsonRpcResponse::success(Some(json!(1)), json!({}));

        let (tx, mut rx) = mpsc::unbounded_channel();
        assert!(deliver(&tx, &response));
        assert!(rx.try_recv().is_ok());

        drop(rx);
        assert!(!deliver(&tx, &response));
    }

    #[tokio::test]
    async fn test_tools_list_over_post() {
        let base = spawn_server().await;
        let response = rpc(&base, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;
        let names: Vec<_> = response["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["echo", "health"]);
    }

    #[tokio::test]
    async fn test_tools_call_over_post() {
        let base = spawn_server().await;
        let response = rpc(
            &base,
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                   "params": {"name": "echo", "arguments": {"city": "Paris"}}}),
        )
        .await;
        assert_eq!(
            response["result"]["structuredContent"],
            json!({"args": [], "kwargs": {"city": "Paris"}})
        );
        assert_eq!(response["result"]["isError"], false);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_invalid_params() {
        let base = spawn_server().await;
        let response = rpc(
            &base,
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                   "params": {"name": "nonexistent_tool"}}),
        )
        .await;
        assert_eq!(response["error"]["code"], -32602);
        assert_eq!(response["id"], 3);
    }

    #[tokio::test]
    async fn test_unknown_method_and_version() {
        let base = spawn_server().await;
        let response = rpc(&base, json!({"jsonrpc": "2.0", "id": 4, "method": "resources/list"})).await;
        assert_eq!(response["error"]["code"], -32601);

        let response = rpc(&base, json!({"jsonrpc": "1.0", "id": 5, "method": "ping"})).await;
        assert_eq!(response["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let base = spawn_server().await;
        let status = reqwest::Client::new()
            .post(format!("{base}/messages?session_id=nope"))
            .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
    }

    /// Read from the event stream until `needle` shows up.
    async fn read_until(response: &mut reqwest::Response, buffer: &mut String, needle: &str) {
        while !buffer.contains(needle) {
            let chunk = response.chunk().await.unwrap().unwrap();
            buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let base = spawn_server().await;
        let client = reqwest::Client::new();

        let flow = async {
            let mut stream = client.get(format!("{base}/sse")).send().await.unwrap();
            let mut buffer = String::new();
            read_until(&mut stream, &mut buffer, "/messages?session_id=").await;
            read_until(&mut stream, &mut buffer, "\n\n").await;

            let endpoint = buffer
                .lines()
                .find_map(|line| line.strip_prefix("data: "))
                .unwrap()
                .trim()
                .to_string();
            assert!(buffer.contains("event: endpoint"));

            let status = client
                .post(format!("{base}{endpoint}"))
                .json(&json!({"jsonrpc": "2.0", "id": 9, "method": "tools/call",
                              "params": {"name": "health"}}))
                .send()
                .await
                .unwrap()
                .status();
            assert_eq!(status, reqwest::StatusCode::ACCEPTED);

            buffer.clear();
            read_until(&mut stream, &mut buffer, "ready").await;
            assert!(buffer.contains("event: message"));
            assert!(buffer.contains(r#""id":9"#));
        };

        tokio::time::timeout(Duration::from_secs(10), flow)
            .await
            .unwrap();
    }
}
