//! Lifecycle hooks for agent runs
//!
//! Middleware attach to six fixed points of a run:
//!
//! | point            | style      | runs                                   |
//! |------------------|------------|----------------------------------------|
//! | `BeforeAgent`    | sequential | once, before the first model call      |
//! | `BeforeModel`    | sequential | before every model call                |
//! | `WrapModelCall`  | wrapping   | around every model call                |
//! | `AfterModel`     | sequential | after every model response             |
//! | `WrapToolCall`   | wrapping   | around every tool call                 |
//! | `AfterAgent`     | sequential | once, on both success and failure      |
//!
//! Sequential hooks run in registration order. Wrapping hooks nest with the
//! first registered outermost. A wrapper receives its continuation by value
//! ([`ModelNext`], [`ToolNext`]), so it can invoke the rest of the chain at
//! most once; returning without invoking it short-circuits the call.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::ai::client::{ModelClient, ModelRequest, ModelResponse};
use crate::ai::types::AiToolCall;
use crate::error::AgentResult;
use crate::tools::registry::ToolResult;

use super::executor::ToolExecutor;
use super::state::{AgentState, LoopStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum HookPoint {
    BeforeAgent,
    BeforeModel,
    WrapModelCall,
    AfterModel,
    WrapToolCall,
    AfterAgent,
}

impl HookPoint {
    pub const ALL: [HookPoint; 6] = [
        HookPoint::BeforeAgent,
        HookPoint::BeforeModel,
        HookPoint::WrapModelCall,
        HookPoint::AfterModel,
        HookPoint::WrapToolCall,
        HookPoint::AfterAgent,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HookPoint::BeforeAgent => "before_agent",
            HookPoint::BeforeModel => "before_model",
            HookPoint::WrapModelCall => "wrap_model_call",
            HookPoint::AfterModel => "after_model",
            HookPoint::WrapToolCall => "wrap_tool_call",
            HookPoint::AfterAgent => "after_agent",
        }
    }

    /// Wrapping points own a continuation; the rest are sequential
    pub fn is_wrapping(self) -> bool {
        matches!(self, HookPoint::WrapModelCall | HookPoint::WrapToolCall)
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of cross-cutting behavior attached to an agent's lifecycle.
///
/// The pipeline only dispatches to the points listed by `hook_points`;
/// every method defaults to a pass-through.
#[async_trait]
pub trait AgentMiddleware: Send + Sync {
    /// Owner name, used for logs and pipeline introspection
    fn name(&self) -> &str;

    fn hook_points(&self) -> &'static [HookPoint];

    /// Failures abort the run as `Initialization` errors
    async fn before_agent(&self, _state: &mut AgentState) -> AgentResult<()> {
        Ok(())
    }

    async fn before_model(&self, _state: &mut AgentState) -> AgentResult<()> {
        Ok(())
    }

    async fn wrap_model_call(
        &self,
        state: &AgentState,
        request: ModelRequest,
        next: ModelNext<'_>,
    ) -> AgentResult<ModelResponse> {
        next.run(state, request).await
    }

    async fn after_model(
        &self,
        _state: &mut AgentState,
        _response: &mut ModelResponse,
    ) -> AgentResult<()> {
        Ok(())
    }

    async fn wrap_tool_call(
        &self,
        state: &mut AgentState,
        call: &AiToolCall,
        next: ToolNext<'_>,
    ) -> AgentResult<ToolResult> {
        next.run(state, call).await
    }

    /// Failures are logged and never replace the run's outcome
    async fn after_agent(&self, _state: &AgentState, _status: LoopStatus) -> AgentResult<()> {
        Ok(())
    }
}

/// The remainder of a model-call chain
pub struct ModelNext<'a> {
    handlers: &'a [Arc<dyn AgentMiddleware>],
    model: &'a dyn ModelClient,
}

impl<'a> ModelNext<'a> {
    pub(crate) fn new(handlers: &'a [Arc<dyn AgentMiddleware>], model: &'a dyn ModelClient) -> Self {
        Self { handlers, model }
    }

    /// Invoke the next wrapper, or the model itself at the end of the chain
    pub async fn run(self, state: &AgentState, request: ModelRequest) -> AgentResult<ModelResponse> {
        match self.handlers.split_first() {
            Some((outer, inner)) => {
                let next = ModelNext {
                    handlers: inner,
                    model: self.model,
                };
                outer.wrap_model_call(state, request, next).await
            }
            None => Ok(self.model.complete(&request).await?),
        }
    }
}

/// The remainder of a tool-call chain
pub struct ToolNext<'a> {
    handlers: &'a [Arc<dyn AgentMiddleware>],
    executor: &'a ToolExecutor,
}

impl<'a> ToolNext<'a> {
    pub(crate) fn new(handlers: &'a [Arc<dyn AgentMiddleware>], executor: &'a ToolExecutor) -> Self {
        Self { handlers, executor }
    }

    /// Invoke the next wrapper, or execute the tool at the end of the chain
    pub async fn run(self, state: &mut AgentState, call: &AiToolCall) -> AgentResult<ToolResult> {
        match self.handlers.split_first() {
            Some((outer, inner)) => {
                let next = ToolNext {
                    handlers: inner,
                    executor: self.executor,
                };
                outer.wrap_tool_call(state, call, next).await
            }
            None => Ok(self.executor.execute(state, call).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_are_indexable_in_order() {
        for (i, point) in HookPoint::ALL.iter().enumerate() {
            assert_eq!(point.index(), i);
        }
        assert!(HookPoint::WrapModelCall.is_wrapping());
        assert!(!HookPoint::AfterAgent.is_wrapping());
        assert_eq!(HookPoint::WrapToolCall.to_string(), "wrap_tool_call");
    }
}
