//! archex core
//!
//! Agent control plane for extracting architecture views from text: lifecycle
//! hooks around every model and tool call, skill bundles with progressive
//! disclosure, and delegation to isolated sub-agents that stop once their
//! result is written.
//!
//! The language model is a collaborator behind [`ai::ModelClient`]; this
//! crate ships no transport.

pub mod agent;
pub mod ai;
pub mod config;
pub mod error;
pub mod paths;
pub mod skills;
pub mod tools;
pub mod views;

#[cfg(test)]
mod testing;

pub use agent::{AgentLoop, AgentRun, HookPipeline, LoopStatus};
pub use config::ControlPlaneConfig;
pub use error::{AgentError, AgentResult, SkillParseError};
pub use skills::SkillRegistry;
