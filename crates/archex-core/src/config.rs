//! Control-plane configuration
//!
//! Loaded from a TOML file. Every key is optional; a missing file yields the
//! defaults. Unknown keys are rejected so typos do not pass silently.
//!
//! ```toml
//! max_iterations = 25
//! terminal_tools = ["write_file"]
//! skills_dir = "agent/skills"
//! result_root = "./result"
//!
//! [retry]
//! max_retries = 3
//! ```

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ai::retry::RetryConfig;
use crate::error::{AgentError, AgentResult};
use crate::paths;
use crate::views::ResultLayout;

/// Default bound on model rounds per agent run
pub const DEFAULT_MAX_ITERATIONS: usize = 25;

/// Default per-tool timeout in seconds
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 120;

/// Default cap on characters of tool output fed back to the model
pub const DEFAULT_MAX_TOOL_OUTPUT_CHARS: usize = 30_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlPlaneConfig {
    pub max_iterations: usize,
    pub tool_timeout_secs: u64,
    pub max_tool_output_chars: usize,
    /// Tools whose successful execution ends a sub-agent's loop
    pub terminal_tools: Vec<String>,
    pub skills_dir: PathBuf,
    pub project_skills_dir: Option<PathBuf>,
    pub result_root: PathBuf,
    pub result_extension: String,
    pub retry: RetryConfig,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            max_tool_output_chars: DEFAULT_MAX_TOOL_OUTPUT_CHARS,
            terminal_tools: vec!["write_file".to_string()],
            skills_dir: paths::user_skills_dir(),
            project_skills_dir: None,
            result_root: PathBuf::from("./result"),
            result_extension: "json".to_string(),
            retry: RetryConfig::default(),
        }
    }
}

impl ControlPlaneConfig {
    /// Load from a TOML file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?;

        let config =
            Self::from_toml_str(&content).with_context(|| format!("Failed to parse {:?}", path))?;

        tracing::info!(
            max_iterations = config.max_iterations,
            terminal_tools = ?config.terminal_tools,
            "Loaded control-plane config from {:?}",
            path
        );

        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> AgentResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| AgentError::Config(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AgentResult<()> {
        if self.max_iterations == 0 {
            return Err(AgentError::Config(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.tool_timeout_secs == 0 {
            return Err(AgentError::Config(
                "tool_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.result_root.is_absolute()
            || self
                .result_root
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(AgentError::Config(format!(
                "result_root `{}` must be a relative path inside the working directory",
                self.result_root.display()
            )));
        }
        let ext = &self.result_extension;
        if ext.is_empty() || ext.contains(['.', '/', '\\']) {
            return Err(AgentError::Config(format!(
                "result_extension `{ext}` must be a bare extension like `json`"
            )));
        }
        Ok(())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Deadline for one delegation: a sub-agent run spans up to
    /// `max_iterations` rounds of tool calls
    pub fn delegation_timeout(&self) -> Duration {
        self.tool_timeout()
            .saturating_mul(self.max_iterations.min(u32::MAX as usize) as u32)
    }

    pub fn result_layout(&self) -> ResultLayout {
        ResultLayout::new(&self.result_root, &self.result_extension)
    }
}
