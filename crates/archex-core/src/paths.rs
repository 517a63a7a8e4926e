//! Centralized path utilities
//!
//! All application paths in one place for consistency

use std::path::PathBuf;

const CONFIG_DIR_NAME: &str = ".archex";

/// Get the archex config directory (~/.archex)
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Get the config file (~/.archex/config.toml)
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the user skills directory (~/.archex/agent/skills)
pub fn user_skills_dir() -> PathBuf {
    config_dir().join("agent").join("skills")
}

/// Project-scoped skills live under `.archex/skills` in the working directory
pub fn project_skills_dir(working_dir: &std::path::Path) -> PathBuf {
    working_dir.join(CONFIG_DIR_NAME).join("skills")
}
