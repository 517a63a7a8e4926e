//! Per-run agent state
//!
//! One `AgentState` exists per agent run and is never shared: a delegated
//! sub-agent starts from a fresh state holding only its task input.

use std::collections::VecDeque;

use serde::Serialize;

use crate::ai::client::ModelResponse;
use crate::ai::types::{AiToolCall, ModelMessage, Role};
use crate::skills::SkillDescriptor;
use crate::tools::registry::ToolResult;

use super::todos::TodoList;

/// Terminal outcome of a loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct AgentState {
    /// Name of the agent that owns this state
    pub agent: String,
    pub history: Vec<ModelMessage>,
    pub todos: TodoList,
    /// Calls from the latest response that have not run yet, in order
    pub pending_tool_calls: VecDeque<AiToolCall>,
    /// Skill metadata exposed to this agent (coordinator only)
    pub skills_metadata: Vec<SkillDescriptor>,
    terminated: bool,
    iterations: usize,
    tool_calls: usize,
}

impl AgentState {
    pub fn new(agent: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            history: vec![ModelMessage::user(input)],
            todos: TodoList::default(),
            pending_tool_calls: VecDeque::new(),
            skills_metadata: Vec::new(),
            terminated: false,
            iterations: 0,
            tool_calls: 0,
        }
    }

    /// Once set, the loop issues no further model calls and the early-exit
    /// policy rejects any further tool call.
    pub fn terminate(&mut self) {
        self.terminated = true;
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Model rounds started so far
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Tool calls that produced a result so far
    pub fn tool_calls(&self) -> usize {
        self.tool_calls
    }

    pub(crate) fn begin_iteration(&mut self) {
        self.iterations += 1;
    }

    /// Append the assistant turn and queue its tool calls
    pub(crate) fn record_response(&mut self, response: &ModelResponse) {
        self.history
            .push(ModelMessage::assistant(&response.text, &response.tool_calls));
        self.pending_tool_calls = response.tool_calls.iter().cloned().collect();
    }

    pub(crate) fn record_tool_result(&mut self, call: &AiToolCall, result: &ToolResult) {
        self.tool_calls += 1;
        self.history.push(ModelMessage::tool_result(
            &call.id,
            &result.output,
            result.is_error,
        ));
    }

    /// Output of the most recent successful tool result
    pub fn last_tool_output(&self) -> Option<String> {
        self.history
            .iter()
            .rev()
            .filter_map(|m| m.tool_output())
            .find(|(_, is_error)| !is_error)
            .map(|(output, _)| output.to_string())
    }

    /// What a terminated run reports: the model's own words if it wrote any
    /// alongside the terminal call, otherwise the terminal tool's result.
    pub fn final_output(&self) -> Option<String> {
        let last_assistant = self
            .history
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.text())
            .filter(|t| !t.trim().is_empty());
        last_assistant.or_else(|| self.last_tool_output())
    }
}
