//! Test doubles and fixtures shared by unit tests

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::agent::hooks::{AgentMiddleware, HookPoint, ModelNext, ToolNext};
use crate::agent::state::{AgentState, LoopStatus};
use crate::ai::client::{ModelCallError, ModelClient, ModelRequest, ModelResponse};
use crate::ai::types::AiToolCall;
use crate::error::AgentResult;
use crate::tools::registry::ToolResult;

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn events() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Create `<dir>/<folder>/SKILL.md` and return the bundle directory
pub fn write_skill(dir: &Path, folder: &str, frontmatter: &str, body: &str) -> PathBuf {
    let bundle = dir.join(folder);
    fs::create_dir_all(&bundle).unwrap();
    fs::write(
        bundle.join("SKILL.md"),
        format!("---\n{frontmatter}\n---\n\n{body}\n"),
    )
    .unwrap();
    bundle
}

/// Tool call with a process-unique id
pub fn tool_call(name: &str, arguments: Value) -> AiToolCall {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    AiToolCall::new(format!("call_{n}"), name, arguments)
}

type Respond = dyn Fn(&ModelRequest) -> Result<ModelResponse, ModelCallError> + Send + Sync;

/// Model that answers every request with a closure
pub struct FnModel {
    respond: Box<Respond>,
    calls: AtomicUsize,
}

impl FnModel {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&ModelRequest) -> Result<ModelResponse, ModelCallError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for FnModel {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, ModelCallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(request)
    }
}

/// Model that never answers
pub struct PendingModel;

#[async_trait]
impl ModelClient for PendingModel {
    async fn complete(&self, _request: &ModelRequest) -> Result<ModelResponse, ModelCallError> {
        std::future::pending().await
    }
}

/// Middleware at every point that logs `<name>:<event>`
pub struct Recorder {
    name: String,
    log: EventLog,
}

impl Recorder {
    pub fn all(name: &str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
        })
    }

    fn push(&self, event: &str) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, event));
    }
}

#[async_trait]
impl AgentMiddleware for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn hook_points(&self) -> &'static [HookPoint] {
        &HookPoint::ALL
    }

    async fn before_agent(&self, _state: &mut AgentState) -> AgentResult<()> {
        self.push("before_agent");
        Ok(())
    }

    async fn before_model(&self, _state: &mut AgentState) -> AgentResult<()> {
        self.push("before_model");
        Ok(())
    }

    async fn wrap_model_call(
        &self,
        state: &AgentState,
        request: ModelRequest,
        next: ModelNext<'_>,
    ) -> AgentResult<ModelResponse> {
        self.push("enter_model");
        let response = next.run(state, request).await;
        self.push("exit_model");
        response
    }

    async fn after_model(
        &self,
        _state: &mut AgentState,
        _response: &mut ModelResponse,
    ) -> AgentResult<()> {
        self.push("after_model");
        Ok(())
    }

    async fn wrap_tool_call(
        &self,
        state: &mut AgentState,
        call: &AiToolCall,
        next: ToolNext<'_>,
    ) -> AgentResult<ToolResult> {
        self.push("enter_tool");
        let result = next.run(state, call).await;
        self.push("exit_tool");
        result
    }

    async fn after_agent(&self, _state: &AgentState, _status: LoopStatus) -> AgentResult<()> {
        self.push("after_agent");
        Ok(())
    }
}
