//! Error taxonomy for the agent control plane
//!
//! `AgentError` is what the loop, pipeline and router hand back to callers.
//! Skill bundles that fail to parse produce `SkillParseError`, which discovery
//! downgrades to a warning instead of aborting.

use std::path::PathBuf;

use thiserror::Error;

use crate::ai::client::ModelCallError;

pub type AgentResult<T, E = AgentError> = Result<T, E>;

#[derive(Debug, Error)]
pub enum AgentError {
    /// Skill discovery or pipeline setup failed before the first model call.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// The model collaborator failed and the retry policy gave up.
    #[error("model call failed: {0}")]
    ModelCall(#[from] ModelCallError),

    /// A tool invocation failed. The loop feeds this back to the model.
    #[error("tool `{tool}` failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// A middleware invariant was breached. Fatal for the running agent.
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("skill `{0}` not found")]
    NotFound(String),

    #[error("agent exceeded the limit of {0} model rounds")]
    IterationLimit(usize),

    #[error("agent run was cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AgentError {
    pub fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization(message.into())
    }

    pub fn policy(message: impl Into<String>) -> Self {
        Self::PolicyViolation(message.into())
    }

    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors the loop can hand back to the model instead of terminating.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ToolExecution { .. })
    }
}

/// Why a single skill bundle was skipped during discovery.
#[derive(Debug, Error)]
pub enum SkillParseError {
    #[error("missing front matter block")]
    MissingFrontmatter,

    #[error("invalid front matter: {0}")]
    InvalidFrontmatter(#[from] serde_yaml::Error),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid skill id `{id}`: {reason}")]
    InvalidId { id: String, reason: String },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_tool_errors_are_recoverable() {
        assert!(AgentError::tool("read_file", "missing").is_recoverable());
        assert!(!AgentError::policy("tool after terminal tool").is_recoverable());
        assert!(!AgentError::initialization("no skills").is_recoverable());
        assert!(!AgentError::Cancelled.is_recoverable());
    }

    #[test]
    fn messages_name_the_offender() {
        let err = AgentError::tool("write_file", "disk full");
        assert_eq!(err.to_string(), "tool `write_file` failed: disk full");

        let err = AgentError::NotFound("web-research".to_string());
        assert_eq!(err.to_string(), "skill `web-research` not found");
    }
}
