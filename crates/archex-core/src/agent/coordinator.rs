//! The coordinating agent
//!
//! The coordinator is the only agent that sees skills and the only one that
//! can delegate. It reads the input, decides which views it mentions and
//! hands each view to its extractor through `task` or `task_batch`.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::agent::agent_loop::AgentLoop;
use crate::agent::executor::ToolExecutor;
use crate::agent::middleware::{LoggingMiddleware, SkillsMiddleware};
use crate::agent::pipeline::HookPipeline;
use crate::agent::subagent::DelegationRouter;
use crate::ai::client::{ModelClient, RetryingModel};
use crate::config::ControlPlaneConfig;
use crate::error::AgentResult;
use crate::skills::SkillRegistry;
use crate::tools::implementations::{register_delegation_tools, register_filesystem_tools};
use crate::tools::registry::{ToolContext, ToolRegistry};
use crate::views::view_definitions;

pub const COORDINATOR_AGENT: &str = "architecture-extractor";

/// Skills first, so every later wrapper already sees the skills section
pub fn coordinator_pipeline(name: &str, skills: Arc<SkillRegistry>) -> HookPipeline {
    HookPipeline::new()
        .with(Arc::new(SkillsMiddleware::new(skills)))
        .with(Arc::new(LoggingMiddleware::new(name)))
}

pub fn coordinator_prompt(router: &DelegationRouter) -> String {
    let agents = router
        .definitions()
        .map(|d| format!("- `{}`: {}", d.kind, d.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You coordinate the extraction of architecture views from natural-language text.

## Sub-agents
{agents}

## How to work
1. Read the input and decide which views it contains.
2. Delegate one sub-task per view to the matching extractor. Use `task_batch` when
   several views are present; the extractors run concurrently.
3. Put all text relevant to a view in its task description. Extractors see nothing else.
4. Never write result files yourself. Each extractor writes its own.
5. When every delegation has finished, reply with a short summary of what was extracted
   and which delegations failed."#
    )
}

/// Assemble the coordinator around an existing skill registry and router
pub async fn build_coordinator(
    config: &ControlPlaneConfig,
    working_dir: &Path,
    model: Arc<dyn ModelClient>,
    skills: Arc<SkillRegistry>,
    router: Arc<DelegationRouter>,
) -> AgentLoop {
    let registry = ToolRegistry::new().with_timeout(config.tool_timeout());
    register_filesystem_tools(&registry).await;
    register_delegation_tools(&registry, router.clone()).await;

    let ctx = ToolContext::new(working_dir.to_path_buf()).with_agent_name(COORDINATOR_AGENT);
    let executor = ToolExecutor::new(Arc::new(registry), ctx)
        .with_max_output_chars(config.max_tool_output_chars);

    AgentLoop::new(
        COORDINATOR_AGENT,
        model,
        coordinator_pipeline(COORDINATOR_AGENT, skills),
        executor,
    )
    .with_system_prompt(coordinator_prompt(&router))
    .with_max_iterations(config.max_iterations)
}

/// Discover skills, register one extractor per view and build the coordinator.
///
/// Every agent's model calls go through the configured retry policy.
pub async fn architecture_extractor(
    config: &ControlPlaneConfig,
    working_dir: &Path,
    model: Arc<dyn ModelClient>,
) -> AgentResult<AgentLoop> {
    let skills = SkillRegistry::discover(&config.skills_dir, config.project_skills_dir.clone())?;
    for warning in skills.warnings() {
        warn!(%warning, "Skipped skill bundle");
    }

    let model: Arc<dyn ModelClient> = Arc::new(RetryingModel::new(model, config.retry.clone()));

    let mut router = DelegationRouter::from_config(config, working_dir);
    for definition in view_definitions(config, model.clone()) {
        router.register(definition);
    }
    info!(
        skills = skills.descriptors().len(),
        subagents = ?router.kinds(),
        "Architecture extractor assembled"
    );

    Ok(build_coordinator(config, working_dir, model, Arc::new(skills), Arc::new(router)).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::hooks::HookPoint;
    use crate::agent::subagent::{subagent_pipeline, DelegationStatus, DelegationTask};
    use crate::ai::client::{ModelCallError, ModelRequest, ModelResponse};
    use crate::ai::retry::RetryConfig;
    use crate::ai::types::Role;
    use crate::agent::subagent::SubAgentDefinition;
    use crate::error::AgentError;
    use crate::testing::{events, tool_call, write_skill, EventLog, FnModel, PendingModel, Recorder};
    use crate::views::{ResultLayout, ViewKind};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::sync::Barrier;
    use tokio_util::sync::CancellationToken;

    fn config(skills_dir: &Path) -> ControlPlaneConfig {
        ControlPlaneConfig {
            skills_dir: skills_dir.to_path_buf(),
            retry: RetryConfig::disabled(),
            ..Default::default()
        }
    }

    /// The artifact path named in an extractor's system prompt
    fn artifact_in_prompt(req: &ModelRequest) -> Option<String> {
        let prompt = req.system_prompt.as_deref()?;
        let rest = prompt.split("to `").nth(1)?;
        rest.split('`').next().map(str::to_string)
    }

    /// Coordinator on the first round, extractor otherwise
    fn scripted_model() -> Arc<FnModel> {
        Arc::new(FnModel::new(|req| {
            if let Some(artifact) = artifact_in_prompt(req) {
                return Ok(ModelResponse::tool_calls(vec![tool_call(
                    "write_file",
                    json!({"file_path": artifact, "content": format!("{{\"source\":\"{}\"}}", artifact)}),
                )]));
            }
            let delegated = req.messages.iter().any(|m| m.role == Role::Tool);
            if delegated {
                Ok(ModelResponse::text("requirement and use case views extracted"))
            } else {
                Ok(ModelResponse::tool_calls(vec![tool_call(
                    "task_batch",
                    json!({"tasks": [
                        {"subagent_type": "requirement-extractor", "description": "电池续航≥8小时"},
                        {"subagent_type": "usecase-extractor", "description": "参与者有飞行员"}
                    ]}),
                )]))
            }
        }))
    }

    #[tokio::test]
    async fn test_routes_views_to_separate_artifacts() {
        let skills = tempdir().unwrap();
        let work = tempdir().unwrap();
        write_skill(
            skills.path(),
            "sysml-basics",
            "name: sysml-basics\ndescription: SysML view vocabulary",
            "Long reference text.",
        );
        let config = config(skills.path());
        let model = scripted_model();

        let coordinator = architecture_extractor(&config, work.path(), model.clone())
            .await
            .unwrap();
        let run = coordinator.run("电池续航≥8小时，参与者有飞行员").await;

        assert!(run.is_completed(), "{:?}", run.error);
        assert_eq!(
            run.output.as_deref(),
            Some("requirement and use case views extracted")
        );
        // coordinator x2, one round per extractor
        assert_eq!(model.calls(), 4);

        let layout = ResultLayout::new(work.path().join("result"), "json");
        let requirement = std::fs::read_to_string(layout.path_for(ViewKind::Requirement)).unwrap();
        let usecase = std::fs::read_to_string(layout.path_for(ViewKind::Usecase)).unwrap();
        assert!(requirement.contains("requirement_result"));
        assert!(usecase.contains("usecase_result"));
        for view in [ViewKind::Action, ViewKind::State, ViewKind::Bdd, ViewKind::Ibd] {
            assert!(!layout.path_for(view).exists());
        }
    }

    #[tokio::test]
    async fn test_only_coordinator_sees_skills() {
        let skills = tempdir().unwrap();
        let work = tempdir().unwrap();
        write_skill(
            skills.path(),
            "sysml-basics",
            "name: sysml-basics\ntitle: SysML Basics\ndescription: SysML view vocabulary",
            "",
        );
        let config = config(skills.path());
        let model = Arc::new(FnModel::new(|req| {
            let prompt = req.system_prompt.clone().unwrap_or_default();
            if let Some(artifact) = artifact_in_prompt(req) {
                assert!(!prompt.contains("SysML Basics"));
                return Ok(ModelResponse::tool_calls(vec![tool_call(
                    "write_file",
                    json!({"file_path": artifact, "content": "{}"}),
                )]));
            }
            assert!(prompt.contains("**SysML Basics**"));
            if req.messages.iter().any(|m| m.role == Role::Tool) {
                Ok(ModelResponse::text("done"))
            } else {
                Ok(ModelResponse::tool_calls(vec![tool_call(
                    "task",
                    json!({"subagent_type": "bdd-extractor", "description": "drone blocks"}),
                )]))
            }
        }));

        let coordinator = architecture_extractor(&config, work.path(), model)
            .await
            .unwrap();
        assert!(coordinator.pipeline().contains("skills"));
        assert_eq!(
            coordinator.pipeline().owners(HookPoint::BeforeAgent),
            vec!["skills", "logging"]
        );

        let run = coordinator.run("the drone has a battery block").await;
        assert!(run.is_completed(), "{:?}", run.error);
    }

    #[test]
    fn test_subagent_before_agent_has_no_skills() {
        for view in ViewKind::ALL {
            let pipeline = subagent_pipeline(
                &view.agent_name(),
                &["write_file".to_string()],
                None,
                Path::new("."),
            );
            assert!(!pipeline
                .owners(HookPoint::BeforeAgent)
                .contains(&"skills"));
        }
    }

    #[tokio::test]
    async fn test_failed_delegation_reaches_coordinator_as_result() {
        let skills = tempdir().unwrap();
        let work = tempdir().unwrap();
        let config = config(skills.path());
        let model = Arc::new(FnModel::new(|req| {
            if artifact_in_prompt(req).is_some() {
                return Err(ModelCallError::new("bad request").with_status(400));
            }
            let failure = req.messages.iter().find_map(|m| m.tool_output());
            match failure {
                Some((output, is_error)) => {
                    assert!(is_error);
                    assert!(output.contains("delegation_failed"));
                    Ok(ModelResponse::text("state extraction failed"))
                }
                None => Ok(ModelResponse::tool_calls(vec![tool_call(
                    "task",
                    json!({"subagent_type": "state-extractor", "description": "door opens"}),
                )])),
            }
        }));

        let coordinator = architecture_extractor(&config, work.path(), model)
            .await
            .unwrap();
        let run = coordinator.run("the door opens and closes").await;

        assert!(run.is_completed(), "{:?}", run.error);
        assert_eq!(run.output.as_deref(), Some("state extraction failed"));
    }

    /// Router with one extractor whose model never answers
    fn stalled_router(work: &Path, log: &EventLog) -> DelegationRouter {
        DelegationRouter::new(work).with_definition(
            SubAgentDefinition::new("action-extractor", "Activities", Arc::new(PendingModel))
                .with_middleware(Recorder::all("child", log)),
        )
    }

    /// Delegates once, then answers with the delegation result it got back
    fn delegating_model() -> Arc<FnModel> {
        Arc::new(FnModel::new(|req| {
            match req.messages.iter().find_map(|m| m.tool_output()) {
                Some((output, _)) => Ok(ModelResponse::text(output)),
                None => Ok(ModelResponse::tool_calls(vec![tool_call(
                    "task",
                    json!({"subagent_type": "action-extractor", "description": "pilot takes off"}),
                )])),
            }
        }))
    }

    #[tokio::test]
    async fn test_cancelled_coordinator_waits_for_child_cleanup() {
        let skills = tempdir().unwrap();
        let work = tempdir().unwrap();
        let log = events();
        let config = config(skills.path());
        let router = Arc::new(stalled_router(work.path(), &log));
        let registry = Arc::new(SkillRegistry::discover(skills.path(), None).unwrap());

        let coordinator =
            build_coordinator(&config, work.path(), delegating_model(), registry, router).await;
        let token = coordinator.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        let run = tokio::time::timeout(Duration::from_secs(5), coordinator.run("take off"))
            .await
            .expect("cancelled coordinator hung");

        assert!(matches!(run.error, Some(AgentError::Cancelled)), "{:?}", run.error);
        let log = log.lock().unwrap().clone();
        assert_eq!(log.last().map(String::as_str), Some("child:after_agent"));
    }

    #[tokio::test]
    async fn test_delegation_deadline_reaches_coordinator_as_failed_record() {
        let skills = tempdir().unwrap();
        let work = tempdir().unwrap();
        let log = events();
        let config = config(skills.path());
        let router = Arc::new(
            stalled_router(work.path(), &log).with_delegation_timeout(Duration::from_millis(50)),
        );
        let registry = Arc::new(SkillRegistry::discover(skills.path(), None).unwrap());

        let coordinator =
            build_coordinator(&config, work.path(), delegating_model(), registry, router).await;
        let run = tokio::time::timeout(Duration::from_secs(5), coordinator.run("take off"))
            .await
            .expect("deadline never fired");

        assert!(run.is_completed(), "{:?}", run.error);
        let reply: Value = serde_json::from_str(run.output.as_deref().unwrap()).unwrap();
        assert_eq!(reply["error"]["code"], "delegation_failed");
        assert_eq!(reply["data"]["status"], "failed");
        assert_eq!(reply["data"]["error"], "sub-agent timed out after 50 ms");
        let log = log.lock().unwrap().clone();
        assert_eq!(log.last().map(String::as_str), Some("child:after_agent"));
    }

    /// Writes its artifact only after every sibling has reached the barrier
    struct BarrierModel {
        barrier: Arc<Barrier>,
    }

    #[async_trait]
    impl ModelClient for BarrierModel {
        async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, ModelCallError> {
            self.barrier.wait().await;
            let artifact = artifact_in_prompt(request)
                .ok_or_else(|| ModelCallError::new("no artifact in prompt"))?;
            Ok(ModelResponse::tool_calls(vec![tool_call(
                "write_file",
                json!({"file_path": artifact, "content": "{}"}),
            )]))
        }
    }

    #[tokio::test]
    async fn test_concurrent_delegations_both_complete() {
        let skills = tempdir().unwrap();
        let work = tempdir().unwrap();
        let config = config(skills.path());
        let model: Arc<dyn ModelClient> = Arc::new(BarrierModel {
            barrier: Arc::new(Barrier::new(2)),
        });

        let mut router = DelegationRouter::from_config(&config, work.path());
        for definition in view_definitions(&config, model) {
            router.register(definition);
        }

        let tasks = vec![
            DelegationTask::new("requirement-extractor", "电池续航≥8小时"),
            DelegationTask::new("usecase-extractor", "参与者有飞行员"),
        ];
        // Sequential delegation would deadlock on the barrier
        let records = tokio::time::timeout(
            Duration::from_secs(5),
            router.delegate_all(&tasks, COORDINATOR_AGENT, &CancellationToken::new()),
        )
        .await
        .expect("delegations ran sequentially");

        assert!(records
            .iter()
            .all(|r| r.status == DelegationStatus::Completed));
        let layout = config.result_layout();
        let requirement = work.path().join(layout.path_for(ViewKind::Requirement));
        let usecase = work.path().join(layout.path_for(ViewKind::Usecase));
        assert_ne!(requirement, usecase);
        assert!(requirement.exists());
        assert!(usecase.exists());

        let outputs: Vec<Value> = records
            .iter()
            .map(|r| serde_json::from_str(r.output.as_deref().unwrap()).unwrap())
            .collect();
        assert_eq!(outputs[0]["ok"], true);
        assert_eq!(outputs[1]["ok"], true);
    }
}
