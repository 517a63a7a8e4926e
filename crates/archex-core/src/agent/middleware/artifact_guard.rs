//! Confines a sub-agent's `write_file` calls to its own artifact path.
//!
//! A write anywhere else is answered with an error result without running
//! the tool, so concurrent sub-agents never overwrite each other's output.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::agent::hooks::{AgentMiddleware, HookPoint, ToolNext};
use crate::agent::state::AgentState;
use crate::ai::types::AiToolCall;
use crate::error::AgentResult;
use crate::tools::implementations::WRITE_FILE_TOOL;
use crate::tools::registry::ToolResult;

pub const ARTIFACT_GUARD_MIDDLEWARE: &str = "artifact_guard";

pub struct ArtifactGuard {
    artifact: PathBuf,
    working_dir: PathBuf,
}

#[derive(Deserialize)]
struct WriteTarget {
    file_path: String,
}

impl ArtifactGuard {
    /// `artifact` may be relative; both it and requested paths resolve
    /// against `working_dir`.
    pub fn new(artifact: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        let working_dir = working_dir.into();
        let artifact = normalize(&working_dir.join(artifact.into()));
        Self {
            artifact,
            working_dir,
        }
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    pub fn permits(&self, requested: &str) -> bool {
        normalize(&self.working_dir.join(requested)) == self.artifact
    }
}

/// Lexical normalization; the artifact usually does not exist yet
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[async_trait]
impl AgentMiddleware for ArtifactGuard {
    fn name(&self) -> &str {
        ARTIFACT_GUARD_MIDDLEWARE
    }

    fn hook_points(&self) -> &'static [HookPoint] {
        &[HookPoint::WrapToolCall]
    }

    async fn wrap_tool_call(
        &self,
        state: &mut AgentState,
        call: &AiToolCall,
        next: ToolNext<'_>,
    ) -> AgentResult<ToolResult> {
        if call.name != WRITE_FILE_TOOL {
            return next.run(state, call).await;
        }

        // Malformed arguments are left for the tool to report
        let Ok(target) = serde_json::from_value::<WriteTarget>(call.arguments.clone()) else {
            return next.run(state, call).await;
        };

        if self.permits(&target.file_path) {
            return next.run(state, call).await;
        }

        warn!(
            agent = %state.agent,
            requested = %target.file_path,
            artifact = %self.artifact.display(),
            "Write outside assigned artifact blocked"
        );
        Ok(ToolResult::error_with_code(
            "blocked_by_policy",
            format!(
                "Access denied: this agent may only write its own result file {}",
                self.artifact.display()
            ),
        ))
    }
}
