//! Tool implementations
//!
//! - read_file: Read files (the second phase of skill disclosure)
//! - write_file: Create/overwrite files (the default terminal tool)
//! - task: Delegate one sub-task to an isolated sub-agent
//! - task_batch: Delegate several independent sub-tasks concurrently
//!
//! `write_todos` is not here: it mutates the calling agent's own state, so
//! the agent's executor handles it.

pub mod read;
pub mod task;
pub mod write;

pub use read::{ReadFileTool, READ_FILE_TOOL};
pub use task::{TaskBatchTool, TaskTool, TASK_BATCH_TOOL, TASK_TOOL};
pub use write::{WriteFileTool, WRITE_FILE_TOOL};

use std::sync::Arc;

use crate::agent::subagent::DelegationRouter;
use crate::tools::registry::ToolRegistry;

/// Register the file tools every agent gets
pub async fn register_filesystem_tools(registry: &ToolRegistry) {
    registry.register(Arc::new(ReadFileTool)).await;
    registry.register(Arc::new(WriteFileTool)).await;
}

/// Register the delegation tools (coordinator only)
pub async fn register_delegation_tools(registry: &ToolRegistry, router: Arc<DelegationRouter>) {
    registry.register(Arc::new(TaskTool::new(router.clone()))).await;
    registry.register(Arc::new(TaskBatchTool::new(router))).await;
}
