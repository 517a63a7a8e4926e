//! Architecture views and their extractor sub-agents
//!
//! Each view gets one `<view>-extractor` sub-agent. The agent's prompt lives
//! at `<skills_dir>/architecture-extractor/<view>_prompt.md` and its only
//! output is `<result_root>/<view>_result.<ext>`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::agent::subagent::SubAgentDefinition;
use crate::ai::client::ModelClient;
use crate::config::ControlPlaneConfig;

/// Folder under the skills directory that holds the per-view prompts
pub const PROMPTS_DIR: &str = "architecture-extractor";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Requirement,
    Usecase,
    Action,
    State,
    Bdd,
    Ibd,
}

impl ViewKind {
    pub const ALL: [ViewKind; 6] = [
        ViewKind::Requirement,
        ViewKind::Usecase,
        ViewKind::Action,
        ViewKind::State,
        ViewKind::Bdd,
        ViewKind::Ibd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewKind::Requirement => "requirement",
            ViewKind::Usecase => "usecase",
            ViewKind::Action => "action",
            ViewKind::State => "state",
            ViewKind::Bdd => "bdd",
            ViewKind::Ibd => "ibd",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == s)
    }

    /// Sub-agent kind, e.g. `usecase-extractor`
    pub fn agent_name(self) -> String {
        format!("{}-extractor", self.as_str())
    }

    pub fn from_agent_name(name: &str) -> Option<Self> {
        name.strip_suffix("-extractor").and_then(Self::parse)
    }

    pub fn description(self) -> &'static str {
        match self {
            ViewKind::Requirement => {
                "Requirement view extractor: pulls requirements and their constraints from the input"
            }
            ViewKind::Usecase => {
                "Use case view extractor: pulls actors and the use cases they take part in"
            }
            ViewKind::Action => "Activity view extractor: pulls actions and control flow",
            ViewKind::State => "State machine view extractor: pulls states and transitions",
            ViewKind::Bdd => "Block definition view extractor: pulls blocks and their properties",
            ViewKind::Ibd => "Internal block view extractor: pulls parts, ports and connectors",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where each view's result artifact goes. Distinct views never share a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLayout {
    root: PathBuf,
    extension: String,
}

impl ResultLayout {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn path_for(&self, view: ViewKind) -> PathBuf {
        self.root
            .join(format!("{}_result.{}", view.as_str(), self.extension))
    }
}

pub fn prompt_path(skills_dir: &Path, view: ViewKind) -> PathBuf {
    skills_dir
        .join(PROMPTS_DIR)
        .join(format!("{}_prompt.md", view.as_str()))
}

/// Read the view's prompt file, falling back to a one-line prompt
pub fn load_view_prompt(skills_dir: &Path, view: ViewKind) -> String {
    let path = prompt_path(skills_dir, view);
    match std::fs::read_to_string(&path) {
        Ok(prompt) => {
            debug!(view = %view, path = %path.display(), "Loaded view prompt");
            prompt
        }
        Err(e) => {
            error!(view = %view, path = %path.display(), error = %e, "Failed to load view prompt");
            format!("You are the {} view extractor.", view.as_str())
        }
    }
}

/// Full system prompt: the view prompt plus the artifact instructions
pub fn view_prompt(skills_dir: &Path, view: ViewKind, artifact: &Path) -> String {
    format!(
        "{}\n\n## Output\n\nWrite your result with `write_file` to `{}`. \
         It is the only file you may write, and writing it ends your task.",
        load_view_prompt(skills_dir, view).trim_end(),
        artifact.display()
    )
}

pub fn view_definition(
    config: &ControlPlaneConfig,
    view: ViewKind,
    model: Arc<dyn ModelClient>,
) -> SubAgentDefinition {
    let artifact = config.result_layout().path_for(view);
    SubAgentDefinition::new(view.agent_name(), view.description(), model)
        .with_system_prompt(view_prompt(&config.skills_dir, view, &artifact))
        .with_artifact(artifact)
}

/// One extractor definition per view, all sharing `model`
pub fn view_definitions(
    config: &ControlPlaneConfig,
    model: Arc<dyn ModelClient>,
) -> Vec<SubAgentDefinition> {
    ViewKind::ALL
        .into_iter()
        .map(|view| view_definition(config, view, model.clone()))
        .collect()
}
