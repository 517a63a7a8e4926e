//! Skill descriptor and front-matter parsing

use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SkillParseError;

/// Metadata document every bundle must contain
pub const SKILL_FILE: &str = "SKILL.md";

static SKILL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9._-]{0,63}$").expect("valid skill id pattern"));

/// Where a skill bundle was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillSource {
    /// Shared across every project (`~/.archex/agent/skills`)
    User,
    /// Scoped to the working directory; overrides user skills with the same id
    Project,
}

impl fmt::Display for SkillSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillSource::User => write!(f, "user"),
            SkillSource::Project => write!(f, "project"),
        }
    }
}

/// Opaque handle to a bundle's full document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContentRef(PathBuf);

impl ContentRef {
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Directory holding the bundle's auxiliary documents
    pub fn bundle_dir(&self) -> &Path {
        self.0.parent().unwrap_or(&self.0)
    }
}

/// Lightweight metadata for one skill bundle. Never carries the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillDescriptor {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub source: SkillSource,
    pub content_ref: ContentRef,
}

#[derive(Debug, Default, Deserialize)]
struct Frontmatter {
    id: Option<String>,
    name: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    description: Option<String>,
}

impl SkillDescriptor {
    /// Parse the front matter of a `SKILL.md` document.
    ///
    /// `id` (or `name`) and `summary` (or `description`) are required; a
    /// missing `title` is derived from the id.
    pub fn parse(
        content: &str,
        skill_file: PathBuf,
        source: SkillSource,
    ) -> Result<Self, SkillParseError> {
        let yaml = split_frontmatter(content).ok_or(SkillParseError::MissingFrontmatter)?;
        let fm: Frontmatter = if yaml.trim().is_empty() {
            Frontmatter::default()
        } else {
            serde_yaml::from_str(yaml)?
        };

        let id = non_empty(fm.id.or(fm.name)).ok_or(SkillParseError::MissingField("id"))?;
        if !SKILL_ID.is_match(&id) {
            return Err(SkillParseError::InvalidId {
                id,
                reason: "use lowercase letters, digits, '.', '_' or '-'".to_string(),
            });
        }
        let summary = non_empty(fm.summary.or(fm.description))
            .ok_or(SkillParseError::MissingField("summary"))?;
        let title = non_empty(fm.title).unwrap_or_else(|| humanize_skill_name(&id));

        Ok(Self {
            id,
            title,
            summary: summary.split_whitespace().collect::<Vec<_>>().join(" "),
            source,
            content_ref: ContentRef(skill_file),
        })
    }

    pub fn path(&self) -> &Path {
        self.content_ref.path()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Return the YAML between the leading `---` fence and the closing one
fn split_frontmatter(content: &str) -> Option<&str> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;
    if let Some(after) = rest.strip_prefix("---") {
        // Empty front matter block
        return after
            .chars()
            .next()
            .map_or(true, |c| c == '\n' || c == '\r')
            .then_some("");
    }
    let end = rest.find("\n---")?;
    Some(&rest[..end])
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn humanize_skill_name(name: &str) -> String {
    let mut humanized = String::with_capacity(name.len());
    for part in name.split(['-', '_']).filter(|part| !part.is_empty()) {
        if !humanized.is_empty() {
            humanized.push(' ');
        }
        humanized.push_str(&capitalize_first(part));
    }
    humanized
}
