//! Built-in middleware
//!
//! - `LoggingMiddleware` - traces every hook point, counts model calls
//! - `SkillsMiddleware` - skill metadata in state and system prompt (coordinator)
//! - `EarlyExitPolicy` - ends a run after its terminal tool succeeds
//! - `ArtifactGuard` - confines `write_file` to one artifact path

mod artifact_guard;
mod early_exit;
mod logging;
mod skills;

pub use artifact_guard::{ArtifactGuard, ARTIFACT_GUARD_MIDDLEWARE};
pub use early_exit::{EarlyExitPolicy, EARLY_EXIT_MIDDLEWARE};
pub use logging::LoggingMiddleware;
pub use skills::{SkillsMiddleware, SKILLS_MIDDLEWARE};
