//! Structured tracing of every hook point for one agent

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::agent::hooks::{AgentMiddleware, HookPoint, ModelNext, ToolNext};
use crate::agent::state::{AgentState, LoopStatus};
use crate::ai::client::{ModelRequest, ModelResponse};
use crate::ai::types::AiToolCall;
use crate::error::AgentResult;
use crate::tools::registry::ToolResult;

pub struct LoggingMiddleware {
    agent: String,
    model_calls: AtomicUsize,
}

impl LoggingMiddleware {
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            model_calls: AtomicUsize::new(0),
        }
    }

    /// Model calls observed so far
    pub fn model_calls(&self) -> usize {
        self.model_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AgentMiddleware for LoggingMiddleware {
    fn name(&self) -> &str {
        "logging"
    }

    fn hook_points(&self) -> &'static [HookPoint] {
        &HookPoint::ALL
    }

    async fn before_agent(&self, state: &mut AgentState) -> AgentResult<()> {
        info!(agent = %self.agent, history = state.history.len(), "before_agent");
        Ok(())
    }

    async fn before_model(&self, state: &mut AgentState) -> AgentResult<()> {
        debug!(
            agent = %self.agent,
            iteration = state.iterations(),
            todos = state.todos.items().len(),
            "before_model"
        );
        Ok(())
    }

    async fn wrap_model_call(
        &self,
        state: &AgentState,
        request: ModelRequest,
        next: ModelNext<'_>,
    ) -> AgentResult<ModelResponse> {
        let call = self.model_calls.fetch_add(1, Ordering::Relaxed) + 1;
        info!(agent = %self.agent, call, "Model call");
        debug!(
            agent = %self.agent,
            messages = request.messages.len(),
            tools = ?request.tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            system_prompt_chars = request.system_prompt.as_deref().map_or(0, str::len),
            "Model request"
        );

        let start = Instant::now();
        let result = next.run(state, request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(response) => debug!(
                agent = %self.agent,
                call,
                duration_ms,
                text_chars = response.text.len(),
                tool_calls = response.tool_calls.len(),
                "Model response"
            ),
            Err(e) => info!(agent = %self.agent, call, duration_ms, error = %e, "Model call failed"),
        }
        result
    }

    async fn after_model(
        &self,
        _state: &mut AgentState,
        response: &mut ModelResponse,
    ) -> AgentResult<()> {
        for call in &response.tool_calls {
            info!(agent = %self.agent, tool = %call.name, "Tool requested");
        }
        Ok(())
    }

    async fn wrap_tool_call(
        &self,
        state: &mut AgentState,
        call: &AiToolCall,
        next: ToolNext<'_>,
    ) -> AgentResult<ToolResult> {
        debug!(agent = %self.agent, tool = %call.name, arguments = %call.arguments, "Tool call");
        let start = Instant::now();
        let result = next.run(state, call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(r) => {
                info!(
                    agent = %self.agent,
                    tool = %call.name,
                    duration_ms,
                    is_error = r.is_error,
                    output_len = r.output.len(),
                    "Tool execution completed"
                );
                debug!(agent = %self.agent, tool = %call.name, output = %r.output, "Tool result");
            }
            Err(e) => info!(agent = %self.agent, tool = %call.name, duration_ms, error = %e, "Tool call rejected"),
        }
        result
    }

    async fn after_agent(&self, state: &AgentState, status: LoopStatus) -> AgentResult<()> {
        info!(
            agent = %self.agent,
            ?status,
            model_calls = self.model_calls(),
            iterations = state.iterations(),
            tool_calls = state.tool_calls(),
            "after_agent"
        );
        Ok(())
    }
}
