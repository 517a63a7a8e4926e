//! Per-agent todo list and the `write_todos` tool.
//!
//! `write_todos` is a "virtual" tool: it never reaches the tool registry.
//! The agent's own dispatch intercepts it because it mutates that agent's
//! state. Statuses only move forward one step at a time:
//! `pending -> in_progress -> completed`. A dropped item keeps its furthest
//! status, so re-adding it later cannot move it backward.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::ai::types::{AiTool, AiToolCall};
use crate::tools::registry::{parse_params, ToolResult};

use super::state::AgentState;

pub const WRITE_TODOS_TOOL: &str = "write_todos";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    pub fn next(self) -> Option<Self> {
        match self {
            TodoStatus::Pending => Some(TodoStatus::InProgress),
            TodoStatus::InProgress => Some(TodoStatus::Completed),
            TodoStatus::Completed => None,
        }
    }

    /// Staying put or advancing exactly one step
    pub fn can_become(self, target: Self) -> bool {
        self == target || self.next() == Some(target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    #[serde(alias = "content")]
    pub description: String,
    pub status: TodoStatus,
}

impl TodoItem {
    pub fn pending(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            status: TodoStatus::Pending,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TodoError {
    #[error("todo `{description}` cannot move from {from:?} to {to:?}; statuses advance one step at a time")]
    InvalidTransition {
        description: String,
        from: TodoStatus,
        to: TodoStatus,
    },

    #[error("new todo `{description}` must start as pending, got {status:?}")]
    InvalidInitial {
        description: String,
        status: TodoStatus,
    },

    #[error("todo `{0}` appears more than once")]
    Duplicate(String),

    #[error("todo description must not be empty")]
    EmptyDescription,
}

/// Ordered todo snapshot with monotonic status transitions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TodoList {
    items: Vec<TodoItem>,
    revision: u32,
    /// Furthest status every description has reached, dropped items included
    #[serde(skip)]
    reached: HashMap<String, TodoStatus>,
}

impl TodoList {
    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    /// Number of accepted snapshots
    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replace the whole list. Items are matched by description against every
    /// earlier snapshot; dropping items is allowed, regressing or skipping is
    /// not. On error the list is left untouched.
    pub fn replace(&mut self, snapshot: Vec<TodoItem>) -> Result<(), TodoError> {
        for (i, item) in snapshot.iter().enumerate() {
            if item.description.trim().is_empty() {
                return Err(TodoError::EmptyDescription);
            }
            if snapshot[..i]
                .iter()
                .any(|other| other.description == item.description)
            {
                return Err(TodoError::Duplicate(item.description.clone()));
            }

            match self.reached.get(&item.description) {
                Some(&reached) if !reached.can_become(item.status) => {
                    return Err(TodoError::InvalidTransition {
                        description: item.description.clone(),
                        from: reached,
                        to: item.status,
                    });
                }
                None if item.status != TodoStatus::Pending => {
                    return Err(TodoError::InvalidInitial {
                        description: item.description.clone(),
                        status: item.status,
                    });
                }
                _ => {}
            }
        }

        for item in &snapshot {
            self.reached.insert(item.description.clone(), item.status);
        }
        self.items = snapshot;
        self.revision += 1;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct WriteTodosParams {
    todos: Vec<TodoItem>,
}

/// Tool definition advertised to every agent
pub fn write_todos_tool() -> AiTool {
    AiTool {
        name: WRITE_TODOS_TOOL.to_string(),
        description: "Record your plan as a todo list. Send the complete list every time. \
            New items start as pending; an item may then move to in_progress and \
            finally completed, one step per call."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "todos": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "content": { "type": "string", "description": "What needs doing" },
                            "status": {
                                "type": "string",
                                "enum": ["pending", "in_progress", "completed"]
                            }
                        },
                        "required": ["content", "status"]
                    }
                }
            },
            "required": ["todos"]
        }),
    }
}

/// Apply a `write_todos` call to the calling agent's own state
pub(crate) fn handle_write_todos(call: &AiToolCall, state: &mut AgentState) -> ToolResult {
    let params = match parse_params::<WriteTodosParams>(call.arguments.clone()) {
        Ok(p) => p,
        Err(e) => return e,
    };

    match state.todos.replace(params.todos) {
        Ok(()) => {
            let todos: Vec<Value> = state
                .todos
                .items()
                .iter()
                .map(|t| json!({ "content": t.description, "status": t.status }))
                .collect();
            tracing::debug!(
                agent = %state.agent,
                revision = state.todos.revision(),
                count = todos.len(),
                "Todo list updated"
            );
            ToolResult::success_data(json!({
                "revision": state.todos.revision(),
                "todos": todos,
            }))
        }
        Err(e) => ToolResult::error_with_code("invalid_todo_transition", e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::Rng;

    const ALL: [TodoStatus; 3] = [
        TodoStatus::Pending,
        TodoStatus::InProgress,
        TodoStatus::Completed,
    ];

    fn item(description: &str, status: TodoStatus) -> TodoItem {
        TodoItem {
            description: description.to_string(),
            status,
        }
    }

    #[test]
    fn test_forward_steps_accepted() {
        let mut list = TodoList::default();
        list.replace(vec![TodoItem::pending("a"), TodoItem::pending("b")])
            .unwrap();
        list.replace(vec![
            item("a", TodoStatus::InProgress),
            TodoItem::pending("b"),
        ])
        .unwrap();
        list.replace(vec![
            item("a", TodoStatus::Completed),
            item("b", TodoStatus::InProgress),
        ])
        .unwrap();
        assert_eq!(list.revision(), 3);
        assert_eq!(list.items()[0].status, TodoStatus::Completed);
    }

    #[test]
    fn test_regression_rejected_and_list_unchanged() {
        let mut list = TodoList::default();
        list.replace(vec![TodoItem::pending("a")]).unwrap();
        list.replace(vec![item("a", TodoStatus::InProgress)]).unwrap();
        let before = list.clone();

        let err = list.replace(vec![TodoItem::pending("a")]).unwrap_err();
        assert!(matches!(err, TodoError::InvalidTransition { .. }));
        assert_eq!(list, before);
    }

    #[test]
    fn test_skip_rejected() {
        let mut list = TodoList::default();
        list.replace(vec![TodoItem::pending("a")]).unwrap();
        let err = list
            .replace(vec![item("a", TodoStatus::Completed)])
            .unwrap_err();
        assert_eq!(
            err,
            TodoError::InvalidTransition {
                description: "a".to_string(),
                from: TodoStatus::Pending,
                to: TodoStatus::Completed,
            }
        );
    }

    #[test]
    fn test_new_items_must_start_pending() {
        let mut list = TodoList::default();
        let err = list
            .replace(vec![item("fresh", TodoStatus::InProgress)])
            .unwrap_err();
        assert!(matches!(err, TodoError::InvalidInitial { .. }));
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut list = TodoList::default();
        let err = list
            .replace(vec![TodoItem::pending("x"), TodoItem::pending("x")])
            .unwrap_err();
        assert_eq!(err, TodoError::Duplicate("x".to_string()));
    }

    #[test]
    fn test_completed_is_final() {
        let mut list = TodoList::default();
        list.replace(vec![TodoItem::pending("a")]).unwrap();
        list.replace(vec![item("a", TodoStatus::InProgress)]).unwrap();
        list.replace(vec![item("a", TodoStatus::Completed)]).unwrap();
        list.replace(vec![item("a", TodoStatus::Completed)]).unwrap();
        assert!(list.replace(vec![item("a", TodoStatus::InProgress)]).is_err());
        assert_eq!(list.revision(), 4);
    }

    #[test]
    fn test_dropped_item_cannot_return_regressed() {
        let mut list = TodoList::default();
        list.replace(vec![TodoItem::pending("a")]).unwrap();
        list.replace(vec![item("a", TodoStatus::InProgress)]).unwrap();
        list.replace(vec![item("a", TodoStatus::Completed)]).unwrap();
        list.replace(Vec::new()).unwrap();
        let before = list.clone();

        let err = list.replace(vec![TodoItem::pending("a")]).unwrap_err();
        assert_eq!(
            err,
            TodoError::InvalidTransition {
                description: "a".to_string(),
                from: TodoStatus::Completed,
                to: TodoStatus::Pending,
            }
        );
        assert_eq!(list, before);

        list.replace(vec![item("a", TodoStatus::Completed)]).unwrap();
        assert_eq!(list.items()[0].status, TodoStatus::Completed);
    }

    #[test]
    fn test_dropped_pending_item_may_return() {
        let mut list = TodoList::default();
        list.replace(vec![TodoItem::pending("a"), TodoItem::pending("b")])
            .unwrap();
        list.replace(vec![TodoItem::pending("b")]).unwrap();
        list.replace(vec![TodoItem::pending("a"), TodoItem::pending("b")])
            .unwrap();
        assert_eq!(list.items().len(), 2);
    }

    /// Random snapshot proposals that drop and re-add items: whatever gets
    /// accepted, no item's status ever moves below the furthest status it
    /// has reached, or jumps a step.
    #[test]
    fn test_random_snapshots_stay_monotonic() {
        let mut rng = rand::thread_rng();
        let names = ["parse", "extract", "validate", "write", "review"];
        let mut readded = 0;

        for _ in 0..200 {
            let mut list = TodoList::default();
            let mut reached: std::collections::HashMap<String, TodoStatus> =
                std::collections::HashMap::new();

            for _ in 0..30 {
                let count = rng.gen_range(0..=names.len());
                let mut picked: Vec<&str> = names
                    .choose_multiple(&mut rng, count)
                    .copied()
                    .collect();
                picked.shuffle(&mut rng);
                let proposal: Vec<TodoItem> = picked
                    .iter()
                    .map(|n| item(n, *ALL.choose(&mut rng).unwrap()))
                    .collect();

                let before = list.clone();
                match list.replace(proposal) {
                    Ok(()) => {
                        for t in list.items() {
                            let was_listed =
                                before.items().iter().any(|o| o.description == t.description);
                            match reached.get(&t.description) {
                                Some(old) => {
                                    assert!(old.can_become(t.status), "{old:?} -> {:?}", t.status);
                                    if !was_listed {
                                        readded += 1;
                                    }
                                }
                                None => assert_eq!(t.status, TodoStatus::Pending),
                            }
                            reached.insert(t.description.clone(), t.status);
                        }
                    }
                    Err(_) => assert_eq!(list, before),
                }
            }
            assert!(reached.len() <= names.len());
        }
        assert!(readded > 0, "no snapshot re-added a dropped item");
    }

    #[test]
    fn test_handle_write_todos_updates_state() {
        let mut state = AgentState::new("coordinator", "go");
        let call = AiToolCall::new(
            "t1",
            WRITE_TODOS_TOOL,
            json!({"todos": [{"content": "extract views", "status": "pending"}]}),
        );
        let result = handle_write_todos(&call, &mut state);
        assert!(!result.is_error, "{}", result.output);
        assert_eq!(state.todos.items().len(), 1);

        let bad = AiToolCall::new(
            "t2",
            WRITE_TODOS_TOOL,
            json!({"todos": [{"content": "extract views", "status": "completed"}]}),
        );
        let result = handle_write_todos(&bad, &mut state);
        assert!(result.is_error);
        assert!(result.output.contains("invalid_todo_transition"));
        assert_eq!(state.todos.items()[0].status, TodoStatus::Pending);
    }

    #[test]
    fn test_handle_write_todos_bad_params() {
        let mut state = AgentState::new("coordinator", "go");
        let call = AiToolCall::new("t1", WRITE_TODOS_TOOL, json!({"items": []}));
        let result = handle_write_todos(&call, &mut state);
        assert!(result.is_error);
        assert!(state.todos.is_empty());
    }
}
