//! Model-facing types
//!
//! - `types`: conversation messages and tool calls
//! - `client`: the `ModelClient` seam and the retrying decorator
//! - `retry`: backoff policy shared by anything that calls a model

pub mod client;
pub mod retry;
pub mod types;

pub use client::{ModelCallError, ModelClient, ModelRequest, ModelResponse, RetryingModel};
pub use types::{AiTool, AiToolCall, Content, ModelMessage, Role};
