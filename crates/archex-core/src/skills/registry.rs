//! Skill registry with layered user and project sources

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::loader::{discover, load_skill_file, SkillWarning};
use super::prompt::{render_skill_summary, render_skills_section};
use super::skill::{SkillDescriptor, SkillSource};
use crate::error::{AgentError, AgentResult};

/// Discovered skill bundles, metadata only.
///
/// Full documents are read on demand through [`SkillRegistry::load_full`].
#[derive(Debug, Clone)]
pub struct SkillRegistry {
    user_dir: PathBuf,
    project_dir: Option<PathBuf>,
    skills: Vec<SkillDescriptor>,
    warnings: Vec<SkillWarning>,
}

impl SkillRegistry {
    /// An empty registry over the given roots. Call [`reload`](Self::reload)
    /// or use [`discover`](Self::discover) to scan them.
    pub fn new(user_dir: impl Into<PathBuf>, project_dir: Option<PathBuf>) -> Self {
        Self {
            user_dir: user_dir.into(),
            project_dir,
            skills: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Build a registry and scan its roots once
    pub fn discover(user_dir: impl Into<PathBuf>, project_dir: Option<PathBuf>) -> AgentResult<Self> {
        let mut registry = Self::new(user_dir, project_dir);
        registry.reload()?;
        Ok(registry)
    }

    /// Rescan both roots. Project bundles replace user bundles with the same
    /// id in place, so discovery order follows the user root first.
    pub fn reload(&mut self) -> AgentResult<&[SkillDescriptor]> {
        let user = discover(&self.user_dir, SkillSource::User)?;
        let mut skills = user.skills;
        let mut warnings = user.warnings;

        if let Some(project_dir) = &self.project_dir {
            let project = discover(project_dir, SkillSource::Project)?;
            warnings.extend(project.warnings);
            for skill in project.skills {
                match skills.iter_mut().find(|s| s.id == skill.id) {
                    Some(existing) => *existing = skill,
                    None => skills.push(skill),
                }
            }
        }

        info!(
            count = skills.len(),
            skipped = warnings.len(),
            names = ?skills.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            "Discovered skills"
        );

        self.skills = skills;
        self.warnings = warnings;
        Ok(&self.skills)
    }

    pub fn descriptors(&self) -> &[SkillDescriptor] {
        &self.skills
    }

    /// Bundles skipped during the last scan
    pub fn warnings(&self) -> &[SkillWarning] {
        &self.warnings
    }

    pub fn get(&self, id: &str) -> Option<&SkillDescriptor> {
        self.skills.iter().find(|s| s.id == id)
    }

    pub fn user_dir(&self) -> &Path {
        &self.user_dir
    }

    pub fn project_dir(&self) -> Option<&Path> {
        self.project_dir.as_deref()
    }

    /// Compact listing of every skill: title and summary only. Never
    /// includes bundle bodies or paths.
    pub fn metadata_summary(&self) -> String {
        render_skill_summary(&self.skills)
    }

    /// The `## Skills System` section appended to system prompts
    pub fn prompt_section(&self) -> String {
        render_skills_section(&self.skills, &self.user_dir, self.project_dir.as_deref())
    }

    /// Complete `SKILL.md` text of one bundle
    pub fn load_full(&self, id: &str) -> AgentResult<String> {
        let skill = self
            .get(id)
            .ok_or_else(|| AgentError::NotFound(id.to_string()))?;
        fs::read_to_string(skill.path()).map_err(|e| AgentError::io(skill.path(), e))
    }

    /// An auxiliary document inside a bundle's directory
    pub fn load_file(&self, id: &str, relative: &str) -> AgentResult<String> {
        let skill = self
            .get(id)
            .ok_or_else(|| AgentError::NotFound(id.to_string()))?;
        load_skill_file(skill.content_ref.bundle_dir(), relative)
    }
}
