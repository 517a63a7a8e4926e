//! Sub-agent delegation
//!
//! - `DelegationRouter` - builds and runs isolated sub-agents
//! - `DelegationRecord` - what a delegation leaves behind
//! - `SubAgentDefinition` - a named kind of sub-agent

mod router;
mod types;

pub use router::{subagent_pipeline, DelegationRouter, DelegationTask};
pub use types::{DelegationRecord, DelegationStatus, SubAgentDefinition};
