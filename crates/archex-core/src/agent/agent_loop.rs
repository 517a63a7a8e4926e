//! The agent loop: model call, tool calls, repeat.
//!
//! ```text
//! BeforeAgent
//! loop:
//!     terminated?          -> Completed
//!     BeforeModel
//!     WrapModelCall(model)
//!     AfterModel
//!     no tool calls?       -> Completed
//!     WrapToolCall(tool)   for each call, in order
//! AfterAgent               always, with the outcome
//! ```
//!
//! Recoverable tool errors go back to the model as error results. Policy
//! violations, model failures, cancellation and the iteration limit end the
//! run as `Failed`. Cancellation drops an in-flight model call but lets an
//! in-flight tool call finish, since tools observe the same token.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::ai::client::{ModelClient, ModelRequest};
use crate::config::DEFAULT_MAX_ITERATIONS;
use crate::error::{AgentError, AgentResult};
use crate::tools::registry::ToolResult;

use super::executor::ToolExecutor;
use super::pipeline::HookPipeline;
use super::state::{AgentState, LoopStatus};
use super::todos::TodoItem;

/// Summary of one finished run. The state itself is dropped.
#[derive(Debug, Serialize)]
pub struct AgentRun {
    pub agent: String,
    pub status: LoopStatus,
    pub output: Option<String>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<AgentError>,
    pub iterations: usize,
    pub tool_calls: usize,
    pub todos: Vec<TodoItem>,
    pub duration_ms: u64,
}

fn serialize_error<S: serde::Serializer>(
    error: &Option<AgentError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

impl AgentRun {
    pub fn is_completed(&self) -> bool {
        self.status == LoopStatus::Completed
    }

    pub fn into_result(self) -> AgentResult<Option<String>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.output),
        }
    }
}

pub struct AgentLoop {
    name: String,
    system_prompt: Option<String>,
    model: Arc<dyn ModelClient>,
    pipeline: HookPipeline,
    executor: ToolExecutor,
    max_iterations: usize,
    cancel: CancellationToken,
}

impl AgentLoop {
    pub fn new(
        name: impl Into<String>,
        model: Arc<dyn ModelClient>,
        pipeline: HookPipeline,
        mut executor: ToolExecutor,
    ) -> Self {
        let name = name.into();
        let cancel = executor.context().cancel.clone();
        executor.context_mut().agent_name = name.clone();
        Self {
            name,
            system_prompt: None,
            model,
            pipeline,
            executor,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            cancel,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Cancelling `token` stops the run at its next await point. Tools see
    /// the same token, so delegations derive child tokens from it.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.executor.context_mut().cancel = token.clone();
        self.cancel = token;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pipeline(&self) -> &HookPipeline {
        &self.pipeline
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run to a terminal state from a fresh state holding only `input`
    pub async fn run(&self, input: impl Into<String>) -> AgentRun {
        let start = Instant::now();
        let mut state = AgentState::new(&self.name, input);
        info!(agent = %self.name, max_iterations = self.max_iterations, "Agent run starting");

        let outcome = self.drive(&mut state).await;
        let status = if outcome.is_ok() {
            LoopStatus::Completed
        } else {
            LoopStatus::Failed
        };

        self.pipeline.after_agent(&state, status).await;

        let duration_ms = start.elapsed().as_millis() as u64;
        match &outcome {
            Ok(_) => info!(
                agent = %self.name,
                iterations = state.iterations(),
                tool_calls = state.tool_calls(),
                duration_ms,
                "Agent run completed"
            ),
            Err(e) => warn!(
                agent = %self.name,
                iterations = state.iterations(),
                duration_ms,
                error = %e,
                "Agent run failed"
            ),
        }

        let (output, error) = match outcome {
            Ok(output) => (output, None),
            Err(e) => (None, Some(e)),
        };
        AgentRun {
            agent: self.name.clone(),
            status,
            output,
            error,
            iterations: state.iterations(),
            tool_calls: state.tool_calls(),
            todos: state.todos.items().to_vec(),
            duration_ms,
        }
    }

    async fn drive(&self, state: &mut AgentState) -> AgentResult<Option<String>> {
        self.pipeline.before_agent(state).await?;

        loop {
            if self.cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            if state.is_terminated() {
                return Ok(state.final_output());
            }
            if state.iterations() >= self.max_iterations {
                return Err(AgentError::IterationLimit(self.max_iterations));
            }

            state.begin_iteration();
            self.pipeline.before_model(state).await?;

            let request = ModelRequest {
                system_prompt: self.system_prompt.clone(),
                messages: state.history.clone(),
                tools: self.executor.tool_definitions().await,
            };
            let mut response = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(AgentError::Cancelled),
                response = self.pipeline.wrap_model_call(state, request, self.model.as_ref()) => response?,
            };

            self.pipeline.after_model(state, &mut response).await?;
            state.record_response(&response);

            if state.pending_tool_calls.is_empty() {
                return Ok(Some(response.text));
            }

            while let Some(call) = state.pending_tool_calls.pop_front() {
                // A cancelled tool call is awaited, not dropped: tools see the
                // same token, and a delegation must let its child clean up.
                let result = {
                    let tool = self.pipeline.wrap_tool_call(state, &call, &self.executor);
                    tokio::pin!(tool);
                    let finished = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => None,
                        result = &mut tool => Some(result),
                    };
                    match finished {
                        Some(result) => result,
                        None => tool.await,
                    }
                };
                if self.cancel.is_cancelled() {
                    if let Ok(result) = &result {
                        state.record_tool_result(&call, result);
                    }
                    return Err(AgentError::Cancelled);
                }
                let result = match result {
                    Ok(result) => result,
                    Err(e) if e.is_recoverable() => {
                        warn!(agent = %self.name, tool = %call.name, error = %e, "Tool failed, reporting to model");
                        ToolResult::error_with_code("tool_error", e)
                    }
                    Err(e) => return Err(e),
                };
                state.record_tool_result(&call, &result);
            }
        }
    }
}
