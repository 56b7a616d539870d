//! Tool Registry - process-wide table of named tools.
//!
//! This module provides:
//! - Registration with last-write-wins semantics
//! - Lookup by name
//! - Enumeration in registration order (built-ins first, then discovered tools)
//!
//! The registry is filled during startup through `&mut self` and then frozen
//! behind an `Arc` by the gateway, so it cannot change once serving begins.
//! Re-registering a name replaces the earlier tool; the only trace of that is
//! a warning in the log.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use rmcp::model::Tool;
use tracing::{debug, info, warn};

use super::callable::Callable;
use super::descriptor::ToolDescriptor;
use super::error::{ToolError, ToolResult};

/// Where a registered tool came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOrigin {
    /// Compiled into the host and always present.
    BuiltIn,

    /// A compiled catalog entrypoint exposed by a manifest.
    Catalog { entrypoint: String, manifest: PathBuf },

    /// A subprocess plugin declared by a manifest.
    Command { manifest: PathBuf },
}

impl fmt::Display for ToolOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuiltIn => f.write_str("built-in"),
            Self::Catalog {
                entrypoint,
                manifest,
            } => write!(f, "{} via {}", entrypoint, manifest.display()),
            Self::Command { manifest } => write!(f, "command via {}", manifest.display()),
        }
    }
}

/// A tool as stored in the registry.
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub callable: Callable,
    pub origin: ToolOrigin,
}

impl RegisteredTool {
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }
}

/// Tool registry - manages all available tools.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tool, replacing any tool already registered under the same name.
    ///
    /// A replaced tool keeps its original listing position.
    pub fn register(&mut self, descriptor: ToolDescriptor, callable: Callable, origin: ToolOrigin) {
        let name = descriptor.name().to_string();
        let entry = RegisteredTool {
            descriptor,
            callable,
            origin,
        };

        match self.index.get(&name) {
            Some(&position) => {
                warn!(
                    "Tool '{}' re-registered from {}; replacing definition from {}",
                    name, entry.origin, self.tools[position].origin
                );
                self.tools[position] = entry;
            }
            None => {
                debug!("Registered tool '{}' ({})", name, entry.origin);
                self.index.insert(name, self.tools.len());
                self.tools.push(entry);
            }
        }
    }

    /// Register a tool that was already assembled elsewhere.
    pub fn register_tool(&mut self, tool: RegisteredTool) {
        self.register(tool.descriptor, tool.callable, tool.origin);
    }

    /// Look up a tool by name.
    pub fn lookup(&self, name: &str) -> ToolResult<&RegisteredTool> {
        self.index
            .get(name)
            .map(|&position| &self.tools[position])
            .ok_or_else(|| ToolError::not_found(name))
    }

    /// Whether a tool with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All registered tools in registration order.
    pub fn list(&self) -> &[RegisteredTool] {
        &self.tools
    }

    /// Get all tool names in registration order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(RegisteredTool::name).collect()
    }

    /// All descriptors in registration order.
    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        self.tools.iter().map(|t| &t.descriptor).collect()
    }

    /// Get all tools as Tool models (metadata).
    ///
    /// This is the single source of truth for `tools/list` on every transport.
    pub fn get_all_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.descriptor.to_tool()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Log the "available tools" banner.
    pub fn log_banner(&self) {
        info!("Available tools:");
        for tool in &self.tools {
            info!("  - {} (from {})", tool.name(), tool.origin);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::callable::{Arguments, BlockingTool};
    use serde_json::{Value, json};

    struct Constant(Value);

    impl BlockingTool for Constant {
        fn call(&self, _arguments: Arguments) -> ToolResult<Value> {
            Ok(self.0.clone())
        }
    }

    fn constant(name: &str, value: Value) -> (ToolDescriptor, Callable) {
        (
            ToolDescriptor::new(name, "", vec![]),
            Callable::blocking(Constant(value)),
        )
    }

    #[test]
    fn test_lookup_returns_registered_tool() {
        let mut registry = ToolRegistry::new();
        let (descriptor, callable) = constant("alpha", json!(1));
        registry.register(descriptor, callable, ToolOrigin::BuiltIn);

        let tool = registry.lookup("alpha").unwrap();
        assert_eq!(tool.name(), "alpha");
        assert_eq!(tool.origin, ToolOrigin::BuiltIn);
        assert!(!tool.callable.is_suspending());
    }

    #[test]
    fn test_lookup_unknown_is_not_found() {
        let registry = ToolRegistry::new();
        let err = registry.lookup("missing").unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "missing"));
    }

    #[test]
    fn test_reregistration_is_last_write_wins() {
        let mut registry = ToolRegistry::new();
        let (d1, c1) = constant("alpha", json!(1));
        let (d2, c2) = constant("beta", json!(2));
        let (d3, c3) = constant("alpha", json!(3));
        registry.register(d1, c1, ToolOrigin::BuiltIn);
        registry.register(d2, c2, ToolOrigin::BuiltIn);
        registry.register(
            d3,
            c3,
            ToolOrigin::Command {
                manifest: PathBuf::from("alpha.json"),
            },
        );

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.tool_names(), vec!["alpha", "beta"]);

        let tool = registry.lookup("alpha").unwrap();
        assert!(matches!(tool.origin, ToolOrigin::Command { .. }));
        let Callable::Blocking(callable) = &tool.callable else {
            panic!("expected blocking callable");
        };
        assert_eq!(callable.call(Arguments::new()).unwrap(), json!(3));
    }

    #[test]
    fn test_list_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["echo", "health", "zeta", "alpha"] {
            let (descriptor, callable) = constant(name, Value::Null);
            registry.register(descriptor, callable, ToolOrigin::BuiltIn);
        }
        assert_eq!(registry.tool_names(), vec!["echo", "health", "zeta", "alpha"]);
        assert_eq!(registry.get_all_tools().len(), 4);
        assert_eq!(registry.descriptors()[2].name(), "zeta");
    }

    #[test]
    fn test_origin_display() {
        let origin = ToolOrigin::Catalog {
            entrypoint: "fetch_weather".into(),
            manifest: PathBuf::from("tools/fetch_weather.json"),
        };
        assert_eq!(origin.to_string(), "fetch_weather via tools/fetch_weather.json");
        assert_eq!(ToolOrigin::BuiltIn.to_string(), "built-in");
    }
}
