//! Invocation Gateway - resolves, binds and executes one tool call.
//!
//! Each request walks `Received → Resolved → Bound → Executing` and ends in
//! exactly one of `Completed` or `Failed`. The gateway never returns an `Err`
//! and never lets a panic escape: every outcome is turned into an
//! [`Envelope`] that a transport can marshal as-is.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::callable::{Arguments, Callable};
use super::descriptor::ToolDescriptor;
use super::error::ToolError;
use super::registry::ToolRegistry;

/// Default bound on a suspending tool's execution time.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// A single call as decoded by a transport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub tool_name: String,

    #[serde(default)]
    pub arguments: Arguments,
}

impl InvocationRequest {
    pub fn new(tool_name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// Why an invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ToolNotFound,
    InvalidArguments,
    ToolExecutionError,
}

/// Per-request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Received,
    Resolved,
    Bound,
    Executing,
    Completed,
    Failed(ErrorKind),
}

/// Result wrapper returned by one invocation.
///
/// Serializes as `{"result": <value>}` or `{"error": "<message>"}`, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    Result(Value),
    Error(String),
}

/// Terminal state of one invocation plus its envelope.
#[derive(Debug, Clone)]
pub struct InvocationOutcome {
    pub tool_name: String,
    pub state: InvocationState,
    pub envelope: Envelope,
}

impl InvocationOutcome {
    fn completed(tool_name: &str, value: Value) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            state: InvocationState::Completed,
            envelope: Envelope::Result(value),
        }
    }

    fn failed(tool_name: &str, kind: ErrorKind, message: String) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            state: InvocationState::Failed(kind),
            envelope: Envelope::Error(message),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == InvocationState::Completed
    }

    /// The failure kind, if the invocation failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self.state {
            InvocationState::Failed(kind) => Some(kind),
            _ => None,
        }
    }

    /// Whether the tool completed but returned an `{"error": ...}`-shaped value.
    pub fn is_reported_error(&self) -> bool {
        match (&self.state, &self.envelope) {
            (InvocationState::Completed, Envelope::Result(Value::Object(map))) => {
                map.contains_key("error")
            }
            _ => false,
        }
    }
}

/// Dispatches invocation requests against a frozen registry.
#[derive(Debug, Clone)]
pub struct Gateway {
    registry: Arc<ToolRegistry>,
    default_timeout: Duration,
}

impl Gateway {
    /// Freeze the registry and build a gateway over it.
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            default_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one invocation to completion.
    #[instrument(skip(self, request), fields(tool = %request.tool_name))]
    pub async fn invoke(&self, request: InvocationRequest) -> InvocationOutcome {
        let InvocationRequest {
            tool_name,
            arguments,
        } = request;
        trace_state(&tool_name, InvocationState::Received);

        let tool = match self.registry.lookup(&tool_name) {
            Ok(tool) => tool,
            Err(e) => {
                return fail(&tool_name, ErrorKind::ToolNotFound, e.to_string());
            }
        };
        trace_state(&tool_name, InvocationState::Resolved);

        let arguments = match bind_arguments(&tool.descriptor, arguments) {
            Ok(arguments) => arguments,
            Err(e) => {
                return fail(
                    &tool_name,
                    ErrorKind::InvalidArguments,
                    format!("Invalid arguments for tool {}: {}", tool_name, reason(&e)),
                );
            }
        };
        trace_state(&tool_name, InvocationState::Bound);

        trace_state(&tool_name, InvocationState::Executing);
        let timeout = tool.descriptor.timeout().unwrap_or(self.default_timeout);
        let result = execute(&tool.callable, arguments, timeout).await;

        match result {
            Ok(value) => {
                let outcome = InvocationOutcome::completed(&tool_name, value);
                if outcome.is_reported_error() {
                    debug!("Tool '{}' reported a domain error", tool_name);
                }
                trace_state(&tool_name, outcome.state);
                outcome
            }
            Err(ToolError::InvalidArguments(msg)) => fail(
                &tool_name,
                ErrorKind::InvalidArguments,
                format!("Invalid arguments for tool {}: {}", tool_name, msg),
            ),
            Err(e) => fail(
                &tool_name,
                ErrorKind::ToolExecutionError,
                format!("Error executing tool {}: {}", tool_name, e),
            ),
        }
    }
}

fn trace_state(tool_name: &str, state: InvocationState) {
    debug!(tool = tool_name, ?state, "invocation state");
}

fn fail(tool_name: &str, kind: ErrorKind, message: String) -> InvocationOutcome {
    warn!("{}", message);
    let outcome = InvocationOutcome::failed(tool_name, kind, message);
    trace_state(tool_name, outcome.state);
    outcome
}

/// The bare message of a binding error, without the variant prefix.
fn reason(err: &ToolError) -> String {
    match err {
        ToolError::InvalidArguments(msg) => msg.clone(),
        other => other.to_string(),
    }
}

/// Bind caller arguments to the descriptor's parameters.
///
/// Unknown keys are rejected unless the tool accepts extras, missing required
/// parameters are rejected, and declared defaults fill absent optionals.
pub fn bind_arguments(
    descriptor: &ToolDescriptor,
    mut arguments: Arguments,
) -> Result<Arguments, ToolError> {
    if !descriptor.accepts_extra() {
        let unknown: Vec<&str> = arguments
            .keys()
            .filter(|key| descriptor.parameter(key).is_none())
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(ToolError::invalid_arguments(format!(
                "unexpected argument(s): {}",
                unknown.join(", ")
            )));
        }
    }

    let missing: Vec<&str> = descriptor
        .parameters()
        .iter()
        .filter(|p| p.required && !arguments.contains_key(&p.name))
        .map(|p| p.name.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(ToolError::invalid_arguments(format!(
            "missing required argument(s): {}",
            missing.join(", ")
        )));
    }

    for param in descriptor.parameters() {
        if let Some(default) = &param.default {
            arguments
                .entry(param.name.clone())
                .or_insert_with(|| default.clone());
        }
    }

    Ok(arguments)
}

async fn execute(
    callable: &Callable,
    arguments: Arguments,
    timeout: Duration,
) -> Result<Value, ToolError> {
    match callable {
        Callable::Blocking(tool) => {
            std::panic::catch_unwind(AssertUnwindSafe(|| tool.call(arguments)))
                .unwrap_or_else(|payload| Err(panic_error(payload)))
        }
        Callable::Suspending(tool) => {
            let call = AssertUnwindSafe(tool.call(arguments)).catch_unwind();
            match tokio::time::timeout(timeout, call).await {
                Ok(Ok(result)) => result,
                Ok(Err(payload)) => Err(panic_error(payload)),
                Err(_) => Err(ToolError::Timeout(timeout.as_secs())),
            }
        }
    }
}

fn panic_error(payload: Box<dyn Any + Send>) -> ToolError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    ToolError::internal(format!("tool panicked: {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::builtin::register_builtins;
    use crate::domains::tools::callable::{BlockingTool, SuspendingTool};
    use crate::domains::tools::catalog::Catalog;
    use crate::domains::tools::descriptor::ParamSpec;
    use crate::domains::tools::definitions::common::ToolContext;
    use crate::domains::tools::error::ToolResult;
    use crate::domains::tools::registry::ToolOrigin;
    use async_trait::async_trait;
    use serde_json::json;
    use std::path::PathBuf;

    struct Panicky;

    impl BlockingTool for Panicky {
        fn call(&self, _arguments: Arguments) -> ToolResult<Value> {
            panic!("boom");
        }
    }

    struct Sleepy;

    #[async_trait]
    impl SuspendingTool for Sleepy {
        async fn call(&self, _arguments: Arguments) -> ToolResult<Value> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Value::Null)
        }
    }

    struct Failing;

    #[async_trait]
    impl SuspendingTool for Failing {
        async fn call(&self, _arguments: Arguments) -> ToolResult<Value> {
            Err(ToolError::execution_failed("Wikipedia API error: 500"))
        }
    }

    struct Reporting;

    impl BlockingTool for Reporting {
        fn call(&self, _arguments: Arguments) -> ToolResult<Value> {
            Ok(json!({"error": "City not found"}))
        }
    }

    fn args(value: Value) -> Arguments {
        match value {
            Value::Object(map) => map,
            _ => Arguments::new(),
        }
    }

    fn gateway_with(extra: impl FnOnce(&mut ToolRegistry)) -> Gateway {
        let mut registry = ToolRegistry::new();
        register_builtins(&mut registry);
        extra(&mut registry);
        Gateway::new(registry)
    }

    #[tokio::test]
    async fn test_nonexistent_tool_is_not_found() {
        let gateway = gateway_with(|_| {});
        let outcome = gateway
            .invoke(InvocationRequest::new("nonexistent_tool", Arguments::new()))
            .await;
        assert_eq!(outcome.state, InvocationState::Failed(ErrorKind::ToolNotFound));
        assert!(matches!(outcome.envelope, Envelope::Error(ref m) if m.contains("nonexistent_tool")));
    }

    #[tokio::test]
    async fn test_echo_round_trips_keywords() {
        let gateway = gateway_with(|_| {});
        let outcome = gateway
            .invoke(InvocationRequest::new("echo", args(json!({"a": 1, "b": 2}))))
            .await;
        assert!(outcome.is_completed());
        assert_eq!(
            outcome.envelope,
            Envelope::Result(json!({"args": [], "kwargs": {"a": 1, "b": 2}}))
        );
    }

    #[tokio::test]
    async fn test_health_is_ready() {
        let gateway = gateway_with(|_| {});
        let outcome = gateway
            .invoke(InvocationRequest::new("health", Arguments::new()))
            .await;
        assert_eq!(outcome.envelope, Envelope::Result(json!("ready")));
    }

    #[tokio::test]
    async fn test_health_rejects_arguments() {
        let gateway = gateway_with(|_| {});
        let outcome = gateway
            .invoke(InvocationRequest::new("health", args(json!({"x": 1}))))
            .await;
        assert_eq!(
            outcome.error_kind(),
            Some(ErrorKind::InvalidArguments)
        );
    }

    #[tokio::test]
    async fn test_calculator_is_idempotent() {
        let catalog = Catalog::new(ToolContext::default());
        let gateway = gateway_with(|registry| {
            let (descriptor, callable) = catalog.resolve("calculator").unwrap();
            registry.register(
                descriptor,
                callable,
                ToolOrigin::Catalog {
                    entrypoint: "calculator".into(),
                    manifest: PathBuf::from("calculator.json"),
                },
            );
        });

        for _ in 0..3 {
            let outcome = gateway
                .invoke(InvocationRequest::new(
                    "calculator",
                    args(json!({"expression": "2 + 2"})),
                ))
                .await;
            assert_eq!(
                outcome.envelope,
                Envelope::Result(json!({"result": 4, "expression": "2 + 2"}))
            );
        }
        assert_eq!(gateway.registry().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_required_argument() {
        let gateway = gateway_with(|registry| {
            registry.register(
                ToolDescriptor::new("needs", "", vec![ParamSpec::required("text", "string")]),
                Callable::blocking(Reporting),
                ToolOrigin::BuiltIn,
            );
        });
        let outcome = gateway
            .invoke(InvocationRequest::new("needs", Arguments::new()))
            .await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::InvalidArguments));
        assert!(matches!(outcome.envelope, Envelope::Error(ref m) if m.contains("text")));
    }

    #[test]
    fn test_bind_fills_defaults() {
        let descriptor = ToolDescriptor::new(
            "weather",
            "",
            vec![
                ParamSpec::required("location", "string"),
                ParamSpec::optional("units", "string", json!("metric")),
            ],
        );
        let bound = bind_arguments(&descriptor, args(json!({"location": "Paris"}))).unwrap();
        assert_eq!(Value::Object(bound), json!({"location": "Paris", "units": "metric"}));
    }

    #[tokio::test]
    async fn test_reported_error_is_completed() {
        let gateway = gateway_with(|registry| {
            registry.register(
                ToolDescriptor::new("reporting", "", vec![]),
                Callable::blocking(Reporting),
                ToolOrigin::BuiltIn,
            );
        });
        let outcome = gateway
            .invoke(InvocationRequest::new("reporting", Arguments::new()))
            .await;
        assert!(outcome.is_completed());
        assert!(outcome.is_reported_error());
    }

    #[tokio::test]
    async fn test_raised_error_is_wrapped_with_tool_name() {
        let gateway = gateway_with(|registry| {
            registry.register(
                ToolDescriptor::new("wiki", "", vec![]).suspending(),
                Callable::suspending(Failing),
                ToolOrigin::BuiltIn,
            );
        });
        let outcome = gateway
            .invoke(InvocationRequest::new("wiki", Arguments::new()))
            .await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::ToolExecutionError));
        assert_eq!(
            outcome.envelope,
            Envelope::Error("Error executing tool wiki: Wikipedia API error: 500".into())
        );
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let gateway = gateway_with(|registry| {
            registry.register(
                ToolDescriptor::new("panicky", "", vec![]),
                Callable::blocking(Panicky),
                ToolOrigin::BuiltIn,
            );
        });
        let outcome = gateway
            .invoke(InvocationRequest::new("panicky", Arguments::new()))
            .await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::ToolExecutionError));
        assert!(matches!(outcome.envelope, Envelope::Error(ref m) if m.contains("boom")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspending_tool_times_out() {
        let gateway = gateway_with(|registry| {
            registry.register(
                ToolDescriptor::new("sleepy", "", vec![])
                    .suspending()
                    .with_timeout(Duration::from_secs(1)),
                Callable::suspending(Sleepy),
                ToolOrigin::BuiltIn,
            );
        });
        let outcome = gateway
            .invoke(InvocationRequest::new("sleepy", Arguments::new()))
            .await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::ToolExecutionError));
        assert!(matches!(outcome.envelope, Envelope::Error(ref m) if m.contains("timed out")));
    }

    #[test]
    fn test_envelope_shape() {
        assert_eq!(
            serde_json::to_value(Envelope::Result(json!(4))).unwrap(),
            json!({"result": 4})
        );
        assert_eq!(
            serde_json::to_value(Envelope::Error("nope".into())).unwrap(),
            json!({"error": "nope"})
        );
    }
}
