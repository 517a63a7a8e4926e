//! Sub-agent definitions and delegation records

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::hooks::AgentMiddleware;
use crate::ai::client::ModelClient;

/// Lifecycle of one delegation. Only `Running` may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationStatus {
    Running,
    Completed,
    Failed,
}

/// One coordinator-to-sub-agent hand-off
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationRecord {
    pub task_id: Uuid,
    pub parent_agent: String,
    pub child_agent_kind: String,
    pub input: String,
    pub output: Option<String>,
    pub status: DelegationStatus,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl DelegationRecord {
    pub fn start(
        parent_agent: impl Into<String>,
        child_agent_kind: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            parent_agent: parent_agent.into(),
            child_agent_kind: child_agent_kind.into(),
            input: input.into(),
            output: None,
            status: DelegationStatus::Running,
            error: None,
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == DelegationStatus::Running
    }

    pub fn is_completed(&self) -> bool {
        self.status == DelegationStatus::Completed
    }

    /// No-op unless still running
    pub fn complete(&mut self, output: Option<String>) {
        if !self.is_running() {
            return;
        }
        self.status = DelegationStatus::Completed;
        self.output = output;
        self.stamp();
    }

    /// No-op unless still running
    pub fn fail(&mut self, error: impl Into<String>) {
        if !self.is_running() {
            return;
        }
        self.status = DelegationStatus::Failed;
        self.error = Some(error.into());
        self.stamp();
    }

    fn stamp(&mut self) {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        self.duration_ms = elapsed.num_milliseconds().max(0) as u64;
    }
}

/// A named kind of sub-agent the router can start
#[derive(Clone)]
pub struct SubAgentDefinition {
    pub kind: String,
    pub description: String,
    pub system_prompt: String,
    pub model: Arc<dyn ModelClient>,
    /// The one file this agent may write; its terminal output
    pub artifact_path: Option<PathBuf>,
    /// Registered after the built-in sub-agent middleware
    pub middleware: Vec<Arc<dyn AgentMiddleware>>,
}

impl SubAgentDefinition {
    pub fn new(
        kind: impl Into<String>,
        description: impl Into<String>,
        model: Arc<dyn ModelClient>,
    ) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
            system_prompt: String::new(),
            model,
            artifact_path: None,
            middleware: Vec::new(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_path = Some(path.into());
        self
    }

    pub fn with_middleware(mut self, middleware: Arc<dyn AgentMiddleware>) -> Self {
        self.middleware.push(middleware);
        self
    }
}

impl std::fmt::Debug for SubAgentDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubAgentDefinition")
            .field("kind", &self.kind)
            .field("description", &self.description)
            .field("artifact_path", &self.artifact_path)
            .field(
                "middleware",
                &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
