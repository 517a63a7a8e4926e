//! Exposes skill metadata to the coordinator.
//!
//! `before_agent` copies the registry's descriptors into the state;
//! `wrap_model_call` appends the skills section to every system prompt.
//! Bodies are never injected; the model reads them with `read_file`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::agent::hooks::{AgentMiddleware, HookPoint, ModelNext};
use crate::agent::state::AgentState;
use crate::ai::client::{ModelRequest, ModelResponse};
use crate::error::AgentResult;
use crate::skills::SkillRegistry;

pub const SKILLS_MIDDLEWARE: &str = "skills";

pub struct SkillsMiddleware {
    registry: Arc<SkillRegistry>,
    section: String,
}

impl SkillsMiddleware {
    pub fn new(registry: Arc<SkillRegistry>) -> Self {
        let section = registry.prompt_section();
        Self { registry, section }
    }
}

#[async_trait]
impl AgentMiddleware for SkillsMiddleware {
    fn name(&self) -> &str {
        SKILLS_MIDDLEWARE
    }

    fn hook_points(&self) -> &'static [HookPoint] {
        &[HookPoint::BeforeAgent, HookPoint::WrapModelCall]
    }

    async fn before_agent(&self, state: &mut AgentState) -> AgentResult<()> {
        state.skills_metadata = self.registry.descriptors().to_vec();
        info!(
            agent = %state.agent,
            count = state.skills_metadata.len(),
            skills = ?state.skills_metadata.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            "Skills exposed to agent"
        );
        Ok(())
    }

    async fn wrap_model_call(
        &self,
        state: &AgentState,
        mut request: ModelRequest,
        next: ModelNext<'_>,
    ) -> AgentResult<ModelResponse> {
        request.append_system_prompt(&self.section);
        next.run(state, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::pipeline::HookPipeline;
    use crate::testing::{write_skill, FnModel};
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_injects_metadata_but_not_bodies() {
        let temp = tempdir().unwrap();
        write_skill(
            temp.path(),
            "bdd",
            "id: bdd\ntitle: Block Definition\nsummary: Blocks and their parts",
            "BODY-SHOULD-STAY-ON-DISK",
        );
        let registry = Arc::new(SkillRegistry::discover(temp.path(), None).unwrap());
        let pipeline = HookPipeline::new().with(Arc::new(SkillsMiddleware::new(registry)));

        let seen = Arc::new(Mutex::new(None::<String>));
        let model = FnModel::new({
            let seen = seen.clone();
            move |req| {
                *seen.lock().unwrap() = req.system_prompt.clone();
                Ok(ModelResponse::text("ok"))
            }
        });

        let mut state = AgentState::new("coordinator", "go");
        pipeline.before_agent(&mut state).await.unwrap();
        assert_eq!(state.skills_metadata.len(), 1);

        let request = ModelRequest {
            system_prompt: Some("You coordinate extractors.".to_string()),
            ..Default::default()
        };
        pipeline
            .wrap_model_call(&state, request, &model)
            .await
            .unwrap();

        let prompt = seen.lock().unwrap().clone().unwrap();
        assert!(prompt.starts_with("You coordinate extractors.\n\n## Skills System"));
        assert!(prompt.contains("**Block Definition**: Blocks and their parts"));
        assert!(!prompt.contains("BODY-SHOULD-STAY-ON-DISK"));
    }
}
