//! Rendering of the skills section injected into the system prompt

use std::path::Path;

use super::skill::{SkillDescriptor, SkillSource};

const SKILLS_GUIDANCE: &str = "\
**Using skills (progressive disclosure):**

You only see each skill's title and summary above. Read the full instructions only when a skill applies:

1. Check whether the task matches a skill's summary
2. Read that skill's `SKILL.md` with `read_file`, using the exact path listed above
3. Follow the workflow the skill describes
4. Reference supporting files inside the skill directory by absolute path

Skills are self-documenting: the `SKILL.md` explains what the skill does and how to use it. When in doubt, check whether a skill exists for the task.";

/// One `title: summary` line per skill, grouped by source, in discovery order
pub fn render_skill_summary(skills: &[SkillDescriptor]) -> String {
    render_groups(skills, false)
}

/// Like [`render_skill_summary`], with a pointer to each `SKILL.md` under
/// its line
pub fn render_skill_list(skills: &[SkillDescriptor]) -> String {
    render_groups(skills, true)
}

fn render_groups(skills: &[SkillDescriptor], with_paths: bool) -> String {
    let mut lines = Vec::new();
    for (source, heading) in [
        (SkillSource::User, "**User Skills:**"),
        (SkillSource::Project, "**Project Skills:**"),
    ] {
        let group: Vec<_> = skills.iter().filter(|s| s.source == source).collect();
        if group.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(heading.to_string());
        for skill in group {
            lines.push(format!("- **{}**: {}", skill.title, skill.summary));
            if with_paths {
                lines.push(format!(
                    "  → Read `{}` for full instructions",
                    skill.path().display()
                ));
            }
        }
    }
    lines.join("\n")
}

/// The full `## Skills System` section
pub fn render_skills_section(
    skills: &[SkillDescriptor],
    user_dir: &Path,
    project_dir: Option<&Path>,
) -> String {
    let mut locations = vec![format!("**User Skills**: `{}`", user_dir.display())];
    if let Some(project) = project_dir {
        locations.push(format!(
            "**Project Skills**: `{}` (overrides user skills)",
            project.display()
        ));
    }

    let list = if skills.is_empty() {
        let mut dirs = vec![format!("{}/", user_dir.display())];
        if let Some(project) = project_dir {
            dirs.push(format!("{}/", project.display()));
        }
        format!(
            "(No skills available yet. You can create skills in {})",
            dirs.join(" or ")
        )
    } else {
        render_skill_list(skills)
    };

    format!(
        "## Skills System\n\nYou have access to a skills library that provides specialized capabilities and domain knowledge.\n\n{}\n\n**Available Skills:**\n\n{}\n\n{}",
        locations.join("\n"),
        list,
        SKILLS_GUIDANCE
    )
}
