//! Delegation router
//!
//! Turns a `(kind, input)` pair into a finished [`DelegationRecord`]. Every
//! delegation builds a fresh sub-agent: its own tool registry, its own
//! pipeline and a child cancellation token. Nothing but the input string
//! crosses into the child, and nothing but the record comes back.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::agent_loop::AgentLoop;
use crate::agent::executor::ToolExecutor;
use crate::agent::middleware::{ArtifactGuard, EarlyExitPolicy, LoggingMiddleware};
use crate::agent::pipeline::HookPipeline;
use crate::config::{
    ControlPlaneConfig, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_TOOL_OUTPUT_CHARS,
    DEFAULT_TOOL_TIMEOUT_SECS,
};
use crate::tools::implementations::{register_filesystem_tools, WRITE_FILE_TOOL};
use crate::tools::registry::{ToolContext, ToolRegistry};

use super::types::{DelegationRecord, SubAgentDefinition};

/// One sub-task as the coordinator's model phrases it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DelegationTask {
    #[serde(alias = "subagent_type")]
    pub kind: String,
    #[serde(alias = "description")]
    pub input: String,
}

impl DelegationTask {
    pub fn new(kind: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            input: input.into(),
        }
    }
}

/// Pipeline of every sub-agent, in registration order:
/// logging, early exit, then the artifact guard when an artifact is set.
/// Takes no skill registry: sub-agents never see skill metadata.
pub fn subagent_pipeline(
    name: &str,
    terminal_tools: &[String],
    artifact: Option<&Path>,
    working_dir: &Path,
) -> HookPipeline {
    let mut pipeline = HookPipeline::new()
        .with(Arc::new(LoggingMiddleware::new(name)))
        .with(Arc::new(EarlyExitPolicy::new(terminal_tools.iter().cloned())));
    if let Some(artifact) = artifact {
        pipeline.register(Arc::new(ArtifactGuard::new(artifact, working_dir)));
    }
    pipeline
}

pub struct DelegationRouter {
    definitions: BTreeMap<String, SubAgentDefinition>,
    working_dir: PathBuf,
    max_iterations: usize,
    tool_timeout: Duration,
    max_tool_output_chars: usize,
    terminal_tools: Vec<String>,
    /// Upper bound on one whole sub-agent run
    delegation_timeout: Option<Duration>,
}

impl DelegationRouter {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            definitions: BTreeMap::new(),
            working_dir: working_dir.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            max_tool_output_chars: DEFAULT_MAX_TOOL_OUTPUT_CHARS,
            terminal_tools: vec![WRITE_FILE_TOOL.to_string()],
            delegation_timeout: None,
        }
    }

    pub fn from_config(config: &ControlPlaneConfig, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            max_iterations: config.max_iterations,
            tool_timeout: config.tool_timeout(),
            max_tool_output_chars: config.max_tool_output_chars,
            terminal_tools: config.terminal_tools.clone(),
            delegation_timeout: Some(config.delegation_timeout()),
            ..Self::new(working_dir)
        }
    }

    pub fn with_definition(mut self, definition: SubAgentDefinition) -> Self {
        self.register(definition);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_delegation_timeout(mut self, timeout: Duration) -> Self {
        self.delegation_timeout = Some(timeout);
        self
    }

    /// Add or replace the definition for `definition.kind`
    pub fn register(&mut self, definition: SubAgentDefinition) {
        self.definitions.insert(definition.kind.clone(), definition);
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<&str> {
        self.definitions.keys().map(String::as_str).collect()
    }

    pub fn definition(&self, kind: &str) -> Option<&SubAgentDefinition> {
        self.definitions.get(kind)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &SubAgentDefinition> {
        self.definitions.values()
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Build a ready-to-run sub-agent for `definition`
    pub async fn build_subagent(
        &self,
        definition: &SubAgentDefinition,
        cancel: CancellationToken,
    ) -> AgentLoop {
        let registry = ToolRegistry::new().with_timeout(self.tool_timeout);
        register_filesystem_tools(&registry).await;

        // Sub-agents never touch files outside the working directory
        let sandbox = self
            .working_dir
            .canonicalize()
            .unwrap_or_else(|_| self.working_dir.clone());
        let ctx = ToolContext::new(self.working_dir.clone())
            .with_sandbox(sandbox)
            .with_agent_name(&definition.kind)
            .with_cancellation(cancel.clone());
        let executor = ToolExecutor::new(Arc::new(registry), ctx)
            .with_max_output_chars(self.max_tool_output_chars);

        let mut pipeline = subagent_pipeline(
            &definition.kind,
            &self.terminal_tools,
            definition.artifact_path.as_deref(),
            &self.working_dir,
        );
        for middleware in &definition.middleware {
            pipeline.register(middleware.clone());
        }

        let mut agent = AgentLoop::new(&definition.kind, definition.model.clone(), pipeline, executor)
            .with_max_iterations(self.max_iterations)
            .with_cancellation(cancel);
        if !definition.system_prompt.is_empty() {
            agent = agent.with_system_prompt(&definition.system_prompt);
        }
        agent
    }

    /// Run one sub-agent to a terminal state.
    ///
    /// Never fails: an unknown kind, a failed run or an exceeded deadline
    /// comes back as a record with `status: failed`. The child is never
    /// dropped mid-run; on a deadline its token is cancelled and the run is
    /// awaited, so its `AfterAgent` hooks still fire.
    pub async fn delegate(
        &self,
        kind: &str,
        input: &str,
        parent: &str,
        cancel: &CancellationToken,
    ) -> DelegationRecord {
        let mut record = DelegationRecord::start(parent, kind, input);

        let Some(definition) = self.definitions.get(kind) else {
            warn!(parent, kind, "Delegation to unknown sub-agent type");
            record.fail(format!(
                "unknown sub-agent type `{}`; available: {}",
                kind,
                self.kinds().join(", ")
            ));
            return record;
        };

        info!(task_id = %record.task_id, parent, kind, "Delegating sub-task");

        let child = cancel.child_token();
        let agent = self.build_subagent(definition, child.clone()).await;
        let running = agent.run(input);
        tokio::pin!(running);

        let mut timed_out = None;
        let finished = match self.delegation_timeout {
            Some(limit) => tokio::select! {
                run = &mut running => Some(run),
                _ = tokio::time::sleep(limit) => {
                    timed_out = Some(limit);
                    None
                }
            },
            None => None,
        };
        let run = match finished {
            Some(run) => run,
            None => {
                if let Some(limit) = timed_out {
                    warn!(
                        task_id = %record.task_id,
                        kind,
                        timeout_ms = limit.as_millis() as u64,
                        "Delegation deadline reached, cancelling sub-agent"
                    );
                    child.cancel();
                }
                running.await
            }
        };
        let iterations = run.iterations;

        match run.into_result() {
            Ok(output) => record.complete(output),
            Err(e) => match timed_out {
                Some(limit) => record.fail(format!(
                    "sub-agent timed out after {} ms",
                    limit.as_millis()
                )),
                None => record.fail(e.to_string()),
            },
        }

        info!(
            task_id = %record.task_id,
            parent,
            kind,
            status = ?record.status,
            iterations,
            duration_ms = record.duration_ms,
            "Delegation finished"
        );
        record
    }

    /// Run independent sub-tasks concurrently; records come back in input order
    pub async fn delegate_all(
        &self,
        tasks: &[DelegationTask],
        parent: &str,
        cancel: &CancellationToken,
    ) -> Vec<DelegationRecord> {
        info!(parent, count = tasks.len(), "Delegating sub-tasks concurrently");
        join_all(
            tasks
                .iter()
                .map(|task| self.delegate(&task.kind, &task.input, parent, cancel)),
        )
        .await
    }
}
