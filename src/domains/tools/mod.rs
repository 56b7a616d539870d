//! Tools domain module.
//!
//! Everything between "a manifest on disk" and "a JSON result for a caller":
//!
//! - `descriptor.rs` - Static tool metadata and its MCP input schema
//! - `callable.rs` - Blocking and suspending tool traits
//! - `loader.rs` - Manifest discovery (catalog entrypoints and subprocess commands)
//! - `catalog.rs` - Compiled tools a manifest can bind to
//! - `command.rs` - Subprocess plugins
//! - `registry.rs` - Name to tool table, frozen before serving
//! - `gateway.rs` - Resolve, bind, execute and wrap one invocation
//! - `builtin.rs` - `echo` and `health`
//! - `definitions/` - Catalog tool implementations (one file per upstream)
//!
//! ## Adding a New Tool
//!
//! 1. Create a file in `definitions/` with params, `descriptor()` and `execute()`
//! 2. Export it in `definitions/mod.rs`
//! 3. Add its entrypoint in `catalog.rs`
//! 4. Ship a manifest in `tools/`

pub mod builtin;
pub mod callable;
pub mod catalog;
pub mod command;
pub mod definitions;
pub mod descriptor;
mod error;
pub mod gateway;
pub mod loader;
pub mod registry;

pub use builtin::register_builtins;
pub use callable::{Arguments, BlockingTool, Callable, SuspendingTool};
pub use catalog::Catalog;
pub use descriptor::{ParamSpec, ToolDescriptor};
pub use error::{LoaderError, ToolError, ToolResult};
pub use gateway::{Envelope, ErrorKind, Gateway, InvocationOutcome, InvocationRequest, InvocationState};
pub use loader::{LoadedTool, ToolLoader};
pub use registry::{RegisteredTool, ToolOrigin, ToolRegistry};
