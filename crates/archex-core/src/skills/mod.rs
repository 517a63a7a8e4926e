//! Skill bundles with progressive disclosure
//!
//! A skill is a directory containing a `SKILL.md` file with YAML front matter.
//! Only the front matter (id, title, summary) is read at discovery; agents
//! read the full document on demand.
//!
//! # Directory Structure
//!
//! - User: `~/.archex/agent/skills/` - available to every project
//! - Project: `.archex/skills/` - overrides user skills with the same id
//!
//! ```yaml
//! ---
//! id: state-machine
//! title: State Machine Extraction
//! summary: Pull states and transitions out of a design document
//! ---
//!
//! # State Machine Extraction
//!
//! [Instructions...]
//! ```
//!
//! `name` and `description` are accepted as aliases for `id` and `summary`.

mod loader;
mod prompt;
mod registry;
mod skill;

pub use loader::{discover, load_skill, load_skill_file, Discovery, SkillWarning};
pub use prompt::{render_skill_list, render_skill_summary, render_skills_section};
pub use registry::SkillRegistry;
pub use skill::{ContentRef, SkillDescriptor, SkillSource, SKILL_FILE};
