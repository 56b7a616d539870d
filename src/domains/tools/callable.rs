//! Callables - the executable half of a registered tool.
//!
//! A tool is either invoked inline (`Blocking`) or awaited (`Suspending`).
//! Every concrete tool, compiled or plugin, implements one of the two
//! traits below; the gateway only ever sees a [`Callable`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::error::{ToolError, ToolResult};

/// Keyword arguments after binding against the descriptor.
pub type Arguments = Map<String, Value>;

/// A tool invoked inline that returns immediately.
pub trait BlockingTool: Send + Sync {
    /// Execute the tool with bound arguments.
    fn call(&self, arguments: Arguments) -> ToolResult<Value>;
}

/// A tool whose invocation suspends on I/O and must be awaited.
#[async_trait]
pub trait SuspendingTool: Send + Sync {
    /// Execute the tool with bound arguments.
    async fn call(&self, arguments: Arguments) -> ToolResult<Value>;
}

/// The executable part of a registered tool.
#[derive(Clone)]
pub enum Callable {
    /// Invoked synchronously.
    Blocking(Arc<dyn BlockingTool>),

    /// Invoked asynchronously.
    Suspending(Arc<dyn SuspendingTool>),
}

impl Callable {
    pub fn blocking(tool: impl BlockingTool + 'static) -> Self {
        Self::Blocking(Arc::new(tool))
    }

    pub fn suspending(tool: impl SuspendingTool + 'static) -> Self {
        Self::Suspending(Arc::new(tool))
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, Self::Suspending(_))
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocking(_) => f.write_str("Callable::Blocking"),
            Self::Suspending(_) => f.write_str("Callable::Suspending"),
        }
    }
}

/// Deserialize bound arguments into a tool's typed parameter struct.
///
/// Type mismatches (a string where an integer is declared, ...) surface as
/// [`ToolError::InvalidArguments`].
pub fn parse_params<P: DeserializeOwned>(arguments: Arguments) -> ToolResult<P> {
    serde_json::from_value(Value::Object(arguments))
        .map_err(|e| ToolError::invalid_arguments(e.to_string()))
}
