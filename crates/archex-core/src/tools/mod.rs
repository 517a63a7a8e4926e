//! Tools available to agents
//!
//! Provides the tool registry and the built-in tool implementations.

pub mod implementations;
pub mod registry;

pub use implementations::{register_delegation_tools, register_filesystem_tools};
pub use registry::{parse_params, Tool, ToolContext, ToolRegistry, ToolResult};
