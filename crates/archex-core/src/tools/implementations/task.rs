//! task / task_batch - Delegate sub-tasks to isolated sub-agents
//!
//! Only the coordinator gets these tools. The result is the delegation record
//! serialized as JSON; a failed delegation is an error result carrying the
//! record, never an error of the coordinator's loop.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::agent::subagent::{DelegationRecord, DelegationRouter, DelegationTask};
use crate::tools::registry::Tool;
use crate::tools::{parse_params, ToolContext, ToolResult};

pub const TASK_TOOL: &str = "task";
pub const TASK_BATCH_TOOL: &str = "task_batch";

fn describe_kinds(router: &DelegationRouter) -> String {
    router
        .definitions()
        .map(|d| format!("- {}: {}", d.kind, d.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn record_value(record: &DelegationRecord) -> Value {
    serde_json::to_value(record).unwrap_or_else(|_| json!({"task_id": record.task_id}))
}

pub struct TaskTool {
    router: Arc<DelegationRouter>,
    description: String,
}

impl TaskTool {
    pub fn new(router: Arc<DelegationRouter>) -> Self {
        let description = format!(
            "Delegate one self-contained sub-task to an isolated sub-agent. \
             The sub-agent sees only the description you give it and returns its result.\n\n\
             Available sub-agent types:\n{}",
            describe_kinds(&router)
        );
        Self {
            router,
            description,
        }
    }
}

#[derive(Deserialize)]
struct TaskParams {
    subagent_type: String,
    description: String,
}

#[async_trait]
impl Tool for TaskTool {
    fn name(&self) -> &str {
        TASK_TOOL
    }

    fn description(&self) -> &str {
        &self.description
    }

    /// The router bounds each delegation and awaits the cancelled child
    fn manages_timeout(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "subagent_type": {
                    "type": "string",
                    "enum": self.router.kinds(),
                    "description": "Which sub-agent to run"
                },
                "description": {
                    "type": "string",
                    "description": "Everything the sub-agent needs to know; it sees nothing else"
                }
            },
            "required": ["subagent_type", "description"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> ToolResult {
        let params = match parse_params::<TaskParams>(params) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let record = self
            .router
            .delegate(
                &params.subagent_type,
                &params.description,
                &ctx.agent_name,
                &ctx.cancel,
            )
            .await;

        if record.is_completed() {
            ToolResult::success_data(record_value(&record))
        } else {
            let message = record
                .error
                .clone()
                .unwrap_or_else(|| "delegation failed".to_string());
            ToolResult::error_with_details("delegation_failed", message, Some(record_value(&record)))
        }
    }
}

pub struct TaskBatchTool {
    router: Arc<DelegationRouter>,
}

impl TaskBatchTool {
    pub fn new(router: Arc<DelegationRouter>) -> Self {
        Self { router }
    }
}

#[derive(Deserialize)]
struct BatchParams {
    tasks: Vec<DelegationTask>,
}

#[async_trait]
impl Tool for TaskBatchTool {
    fn name(&self) -> &str {
        TASK_BATCH_TOOL
    }

    fn description(&self) -> &str {
        "Delegate several independent sub-tasks at once. They run concurrently, \
         each in its own isolated sub-agent. Records come back in the order given."
    }

    fn manages_timeout(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tasks": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "properties": {
                            "subagent_type": {
                                "type": "string",
                                "enum": self.router.kinds()
                            },
                            "description": {"type": "string"}
                        },
                        "required": ["subagent_type", "description"]
                    }
                }
            },
            "required": ["tasks"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> ToolResult {
        let params = match parse_params::<BatchParams>(params) {
            Ok(p) => p,
            Err(e) => return e,
        };
        if params.tasks.is_empty() {
            return ToolResult::invalid_parameters("tasks must not be empty");
        }

        let records = self
            .router
            .delegate_all(&params.tasks, &ctx.agent_name, &ctx.cancel)
            .await;

        let failed = records.iter().filter(|r| !r.is_completed()).count();
        info!(
            agent = %ctx.agent_name,
            total = records.len(),
            failed,
            "task_batch finished"
        );

        let data = Value::Array(records.iter().map(record_value).collect());
        if failed == 0 {
            ToolResult::success_data(data)
        } else {
            ToolResult::success_data_with(
                data,
                vec![format!("{} of {} delegations failed", failed, records.len())],
                None,
            )
        }
    }
}
