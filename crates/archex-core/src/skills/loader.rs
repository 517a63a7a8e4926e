//! Skill filesystem loading

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::skill::{SkillDescriptor, SkillSource, SKILL_FILE};
use crate::error::{AgentError, AgentResult, SkillParseError};

/// A bundle that was skipped during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillWarning {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for SkillWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Outcome of scanning one skills root
#[derive(Debug, Default)]
pub struct Discovery {
    pub skills: Vec<SkillDescriptor>,
    pub warnings: Vec<SkillWarning>,
}

/// Scan `root` for bundles, one per immediate subdirectory.
///
/// A missing root yields nothing. Bundles that fail to parse are skipped and
/// reported as warnings. Only an unreadable root is an error.
pub fn discover(root: &Path, source: SkillSource) -> AgentResult<Discovery> {
    let mut discovery = Discovery::default();

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No skills directory at {:?}", root);
            return Ok(discovery);
        }
        Err(e) => {
            return Err(AgentError::initialization(format!(
                "cannot read skills directory {}: {e}",
                root.display()
            )))
        }
    };

    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    // Directory order from the OS is unspecified
    dirs.sort();

    for path in dirs {
        match load_skill(&path, source) {
            Ok(skill) => {
                debug!("Loaded skill: {} from {:?}", skill.id, path);
                discovery.skills.push(skill);
            }
            Err(e) => {
                warn!("Skipping skill bundle {:?}: {}", path, e);
                discovery.warnings.push(SkillWarning {
                    path,
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(discovery)
}

/// Load a single skill from its directory
pub fn load_skill(path: &Path, source: SkillSource) -> Result<SkillDescriptor, SkillParseError> {
    let skill_file = path.join(SKILL_FILE);
    let content = fs::read_to_string(&skill_file).map_err(|source| SkillParseError::Io {
        path: skill_file.clone(),
        source,
    })?;

    let skill_file = skill_file.canonicalize().unwrap_or(skill_file);
    SkillDescriptor::parse(&content, skill_file, source)
}

/// Load a specific file from within a skill directory
pub fn load_skill_file(skill_path: &Path, file_name: &str) -> AgentResult<String> {
    let file_path = skill_path.join(file_name);

    // Prevent path traversal
    if file_name.contains("..") || Path::new(file_name).is_absolute() {
        return Err(AgentError::io(
            &file_path,
            std::io::Error::new(ErrorKind::PermissionDenied, "path traversal not allowed"),
        ));
    }

    // Ensure file is within skill directory
    let canonical_skill = skill_path
        .canonicalize()
        .map_err(|e| AgentError::io(skill_path, e))?;
    let canonical_file = file_path
        .canonicalize()
        .map_err(|e| AgentError::io(&file_path, e))?;

    if !canonical_file.starts_with(&canonical_skill) {
        return Err(AgentError::io(
            &file_path,
            std::io::Error::new(ErrorKind::PermissionDenied, "file escapes skill directory"),
        ));
    }

    fs::read_to_string(&canonical_file).map_err(|e| AgentError::io(&canonical_file, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write_skill;
    use tempfile::tempdir;

    #[test]
    fn test_missing_root_is_empty() {
        let temp = tempdir().unwrap();
        let found = discover(&temp.path().join("nope"), SkillSource::User).unwrap();
        assert!(found.skills.is_empty());
        assert!(found.warnings.is_empty());
    }

    #[test]
    fn test_malformed_bundle_becomes_warning() {
        let temp = tempdir().unwrap();
        write_skill(temp.path(), "alpha", "id: alpha\nsummary: First", "alpha body");
        write_skill(temp.path(), "beta", "id: beta\nsummary: Second", "beta body");
        // No summary
        write_skill(temp.path(), "broken", "id: broken", "broken body");
        // Directory without SKILL.md
        fs::create_dir_all(temp.path().join("empty")).unwrap();
        // Stray file at the root is not a bundle
        fs::write(temp.path().join("README.md"), "ignored").unwrap();

        let found = discover(temp.path(), SkillSource::User).unwrap();
        let ids: Vec<_> = found.skills.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "beta"]);
        assert_eq!(found.warnings.len(), 2);
        assert!(found.warnings.iter().any(|w| w.path.ends_with("broken")));
        assert!(found.warnings.iter().any(|w| w.path.ends_with("empty")));
    }

    #[test]
    fn test_discovery_order_is_stable() {
        let temp = tempdir().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            write_skill(temp.path(), name, &format!("id: {name}\nsummary: s"), "b");
        }
        let found = discover(temp.path(), SkillSource::Project).unwrap();
        let ids: Vec<_> = found.skills.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
        assert!(found.skills.iter().all(|s| s.source == SkillSource::Project));
    }

    #[test]
    fn test_load_skill_file_inside_bundle() {
        let temp = tempdir().unwrap();
        let dir = write_skill(temp.path(), "skill", "id: skill\nsummary: x", "body");
        fs::write(dir.join("reference.md"), "extra").unwrap();
        assert_eq!(load_skill_file(&dir, "reference.md").unwrap(), "extra");
    }

    #[test]
    fn test_path_traversal_blocked() {
        let temp = tempdir().unwrap();
        let dir = write_skill(temp.path(), "skill", "id: skill\nsummary: x", "body");
        fs::write(temp.path().join("secret.txt"), "nope").unwrap();

        assert!(load_skill_file(&dir, "../secret.txt").is_err());
        assert!(load_skill_file(&dir, "../../../etc/passwd").is_err());
    }
}
