//! Agent control plane
//!
//! ## Loop
//! - `AgentLoop` - model call, tool calls, repeat until a terminal state
//! - `AgentState` - per-run history, todos and termination flag
//! - `AgentRun` - what a finished run reports
//!
//! ## Hooks
//! - `HookPipeline` - ordered middleware per lifecycle point
//! - `AgentMiddleware` - one method per point, all no-ops by default
//! - `middleware` - logging, skills, early exit, artifact guard
//!
//! ## Delegation
//! - `DelegationRouter` - isolated sub-agents behind the `task` tools
//! - `coordinator` - the skills-aware agent that delegates per view

pub mod agent_loop;
pub mod coordinator;
pub mod executor;
pub mod hooks;
pub mod middleware;
pub mod pipeline;
pub mod state;
pub mod subagent;
pub mod todos;

pub use agent_loop::{AgentLoop, AgentRun};
pub use coordinator::{
    architecture_extractor, build_coordinator, coordinator_pipeline, COORDINATOR_AGENT,
};
pub use executor::ToolExecutor;
pub use hooks::{AgentMiddleware, HookPoint, ModelNext, ToolNext};
pub use pipeline::{HookPipeline, HookRegistration};
pub use state::{AgentState, LoopStatus};
pub use subagent::{
    subagent_pipeline, DelegationRecord, DelegationRouter, DelegationStatus, DelegationTask,
    SubAgentDefinition,
};
pub use todos::{TodoItem, TodoList, TodoStatus, WRITE_TODOS_TOOL};
