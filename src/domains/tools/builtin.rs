//! Built-in tools, registered before anything discovered from disk.

use serde_json::{Value, json};

use super::callable::{Arguments, BlockingTool, Callable};
use super::descriptor::ToolDescriptor;
use super::error::ToolResult;
use super::registry::{ToolOrigin, ToolRegistry};

/// Diagnostic passthrough that echoes its keyword arguments back.
#[derive(Debug, Clone, Copy)]
pub struct EchoTool;

impl EchoTool {
    pub const NAME: &'static str = "echo";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            Self::NAME,
            "Echo back any arguments passed to the tool.",
            vec![],
        )
        .accepting_extra()
    }
}

impl BlockingTool for EchoTool {
    fn call(&self, arguments: Arguments) -> ToolResult<Value> {
        // Keyword-only calling convention: positional args are always empty.
        Ok(json!({ "args": [], "kwargs": arguments }))
    }
}

/// Liveness probe.
#[derive(Debug, Clone, Copy)]
pub struct HealthTool;

impl HealthTool {
    pub const NAME: &'static str = "health";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, "Check whether the server is ready.", vec![])
    }
}

impl BlockingTool for HealthTool {
    fn call(&self, _arguments: Arguments) -> ToolResult<Value> {
        Ok(Value::String("ready".to_string()))
    }
}

/// Register `echo` and `health`.
pub fn register_builtins(registry: &mut ToolRegistry) {
    registry.register(
        EchoTool::descriptor(),
        Callable::blocking(EchoTool),
        ToolOrigin::BuiltIn,
    );
    registry.register(
        HealthTool::descriptor(),
        Callable::blocking(HealthTool),
        ToolOrigin::BuiltIn,
    );
}
