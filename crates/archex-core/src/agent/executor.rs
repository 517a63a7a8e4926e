//! Tool execution at the innermost end of the tool-call chain.
//!
//! Handles:
//! - `write_todos`, which mutates the calling agent's own state
//! - Regular tool execution via `ToolRegistry::execute()`
//! - Output truncation

use std::sync::Arc;

use crate::ai::types::{AiTool, AiToolCall};
use crate::config::DEFAULT_MAX_TOOL_OUTPUT_CHARS;
use crate::tools::registry::{ToolContext, ToolRegistry, ToolResult};

use super::state::AgentState;
use super::todos::{self, WRITE_TODOS_TOOL};

pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    ctx: ToolContext,
    planning: bool,
    max_output_chars: usize,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, ctx: ToolContext) -> Self {
        Self {
            registry,
            ctx,
            planning: true,
            max_output_chars: DEFAULT_MAX_TOOL_OUTPUT_CHARS,
        }
    }

    /// Offer `write_todos` to the model (on by default)
    pub fn with_planning(mut self, enabled: bool) -> Self {
        self.planning = enabled;
        self
    }

    pub fn with_max_output_chars(mut self, max: usize) -> Self {
        self.max_output_chars = max;
        self
    }

    pub fn context(&self) -> &ToolContext {
        &self.ctx
    }

    pub(crate) fn context_mut(&mut self) -> &mut ToolContext {
        &mut self.ctx
    }

    /// Tool definitions advertised on every model request
    pub async fn tool_definitions(&self) -> Vec<AiTool> {
        let mut tools = self.registry.get_ai_tools().await;
        if self.planning {
            tools.push(todos::write_todos_tool());
        }
        tools
    }

    pub(crate) async fn execute(&self, state: &mut AgentState, call: &AiToolCall) -> ToolResult {
        let result = if self.planning && call.name == WRITE_TODOS_TOOL {
            todos::handle_write_todos(call, state)
        } else {
            match self
                .registry
                .execute(&call.name, call.arguments.clone(), &self.ctx)
                .await
            {
                Some(result) => result,
                None => ToolResult::error(format!("Unknown tool: {}", call.name)),
            }
        };

        ToolResult {
            output: truncate_output(&result.output, self.max_output_chars),
            is_error: result.is_error,
        }
    }
}

/// Cut long output at a line boundary and say how much was dropped
pub(crate) fn truncate_output(output: &str, max_chars: usize) -> String {
    if output.len() <= max_chars {
        return output.to_string();
    }

    let truncated_len = floor_char_boundary(output, max_chars);
    let truncated = &output[..truncated_len];
    let break_point = truncated.rfind('\n').unwrap_or(truncated_len);
    let clean = &output[..break_point];
    format!(
        "{}\n\n[... OUTPUT TRUNCATED: {} chars -> {} chars ...]",
        clean,
        output.len(),
        clean.len()
    )
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut boundary = index.min(text.len());
    while boundary > 0 && !text.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}
