//! Ordered middleware dispatch per hook point

use std::fmt;
use std::sync::Arc;

use crate::ai::client::{ModelClient, ModelRequest, ModelResponse};
use crate::ai::types::AiToolCall;
use crate::error::{AgentError, AgentResult};
use crate::tools::registry::ToolResult;

use super::executor::ToolExecutor;
use super::hooks::{AgentMiddleware, HookPoint, ModelNext, ToolNext};
use super::state::{AgentState, LoopStatus};

/// One middleware attached at one hook point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookRegistration {
    pub point: HookPoint,
    pub owner: String,
    /// Position among the handlers of the same point
    pub order: usize,
}

/// Middleware registered per hook point, in registration order.
///
/// Built once per agent and immutable while that agent runs.
#[derive(Clone, Default)]
pub struct HookPipeline {
    handlers: [Vec<Arc<dyn AgentMiddleware>>; 6],
}

impl fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for point in HookPoint::ALL {
            map.entry(&point.as_str(), &self.owners(point));
        }
        map.finish()
    }
}

impl HookPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, middleware: Arc<dyn AgentMiddleware>) -> Self {
        self.register(middleware);
        self
    }

    /// Attach `middleware` at every point it declares, after anything already
    /// registered there.
    pub fn register(&mut self, middleware: Arc<dyn AgentMiddleware>) {
        let mut seen = [false; 6];
        for point in middleware.hook_points() {
            if std::mem::replace(&mut seen[point.index()], true) {
                continue;
            }
            self.handlers[point.index()].push(Arc::clone(&middleware));
        }
        tracing::debug!(
            middleware = middleware.name(),
            points = ?middleware.hook_points(),
            "Registered middleware"
        );
    }

    /// Owner names at `point`, in execution order (outermost first for
    /// wrapping points)
    pub fn owners(&self, point: HookPoint) -> Vec<&str> {
        self.handlers[point.index()]
            .iter()
            .map(|m| m.name())
            .collect()
    }

    /// Every registration across all points
    pub fn registrations(&self) -> Vec<HookRegistration> {
        HookPoint::ALL
            .iter()
            .flat_map(|&point| {
                self.handlers[point.index()]
                    .iter()
                    .enumerate()
                    .map(move |(order, m)| HookRegistration {
                        point,
                        owner: m.name().to_string(),
                        order,
                    })
            })
            .collect()
    }

    /// Whether any middleware named `owner` is attached anywhere
    pub fn contains(&self, owner: &str) -> bool {
        self.handlers
            .iter()
            .flatten()
            .any(|m| m.name() == owner)
    }

    fn at(&self, point: HookPoint) -> &[Arc<dyn AgentMiddleware>] {
        &self.handlers[point.index()]
    }

    pub async fn before_agent(&self, state: &mut AgentState) -> AgentResult<()> {
        for middleware in self.at(HookPoint::BeforeAgent) {
            middleware.before_agent(state).await.map_err(|e| match e {
                AgentError::Initialization(_) => e,
                other => AgentError::Initialization(format!("{}: {}", middleware.name(), other)),
            })?;
        }
        Ok(())
    }

    pub async fn before_model(&self, state: &mut AgentState) -> AgentResult<()> {
        for middleware in self.at(HookPoint::BeforeModel) {
            middleware.before_model(state).await?;
        }
        Ok(())
    }

    /// Run the model call through every wrapper, outermost first
    pub async fn wrap_model_call(
        &self,
        state: &AgentState,
        request: ModelRequest,
        model: &dyn ModelClient,
    ) -> AgentResult<ModelResponse> {
        ModelNext::new(self.at(HookPoint::WrapModelCall), model)
            .run(state, request)
            .await
    }

    pub async fn after_model(
        &self,
        state: &mut AgentState,
        response: &mut ModelResponse,
    ) -> AgentResult<()> {
        for middleware in self.at(HookPoint::AfterModel) {
            middleware.after_model(state, response).await?;
        }
        Ok(())
    }

    /// Run one tool call through every wrapper, outermost first
    pub async fn wrap_tool_call(
        &self,
        state: &mut AgentState,
        call: &AiToolCall,
        executor: &ToolExecutor,
    ) -> AgentResult<ToolResult> {
        ToolNext::new(self.at(HookPoint::WrapToolCall), executor)
            .run(state, call)
            .await
    }

    /// Every handler runs; failures are logged, never propagated
    pub async fn after_agent(&self, state: &AgentState, status: LoopStatus) {
        for middleware in self.at(HookPoint::AfterAgent) {
            if let Err(e) = middleware.after_agent(state, status).await {
                tracing::warn!(
                    agent = %state.agent,
                    middleware = middleware.name(),
                    error = %e,
                    "after_agent hook failed"
                );
            }
        }
    }
}
