//! Stops a sub-agent after it has delivered its result.
//!
//! Once a terminal tool succeeds the agent's state is marked terminated.
//! Any later tool call in the same run, including the rest of the batch the
//! terminal call arrived in, is a policy violation and ends the run.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::agent::hooks::{AgentMiddleware, HookPoint, ToolNext};
use crate::agent::state::AgentState;
use crate::ai::types::AiToolCall;
use crate::error::{AgentError, AgentResult};
use crate::tools::registry::ToolResult;

pub const EARLY_EXIT_MIDDLEWARE: &str = "early_exit";

pub struct EarlyExitPolicy {
    terminal_tools: HashSet<String>,
}

impl EarlyExitPolicy {
    pub fn new<I, S>(terminal_tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terminal_tools: terminal_tools.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_terminal(&self, tool: &str) -> bool {
        self.terminal_tools.contains(tool)
    }
}

#[async_trait]
impl AgentMiddleware for EarlyExitPolicy {
    fn name(&self) -> &str {
        EARLY_EXIT_MIDDLEWARE
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
        if state.is_terminated() {
            warn!(
                agent = %state.agent,
                tool = %call.name,
                "Tool call after terminal tool rejected"
            );
            return Err(AgentError::policy(format!(
                "agent `{}` requested `{}` after its terminal tool completed",
                state.agent, call.name
            )));
        }

        let result = next.run(state, call).await?;

        if self.is_terminal(&call.name) && !result.is_error {
            info!(agent = %state.agent, tool = %call.name, "Terminal tool succeeded, ending run");
            state.terminate();
        }
        Ok(result)
    }
}
