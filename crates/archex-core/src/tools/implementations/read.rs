//! read_file - Read file contents, including skill documents on demand

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::fs;

use crate::tools::registry::Tool;
use crate::tools::{parse_params, ToolContext, ToolResult};

pub const READ_FILE_TOOL: &str = "read_file";

const DEFAULT_LINE_LIMIT: usize = 2000;

pub struct ReadFileTool;

#[derive(Deserialize)]
struct Params {
    file_path: String,
    #[serde(default)]
    offset: Option<usize>,
    #[serde(default)]
    limit: Option<usize>,
}

fn human_size(size: usize) -> String {
    match size {
        0..1024 => format!("{} bytes", size),
        1024..1_048_576 => format!("{:.1} KB", size as f64 / 1024.0),
        _ => format!("{:.1} MB", size as f64 / 1_048_576.0),
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        READ_FILE_TOOL
    }

    fn description(&self) -> &str {
        "Read file contents. Use it to open a skill's SKILL.md when the skill applies. \
         Supports line offset/limit for large files. Detects binary files."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the file to read, absolute or relative to the working directory"
                },
                "offset": {
                    "type": "number",
                    "description": "The line number to start reading from (1-indexed)"
                },
                "limit": {
                    "type": "number",
                    "description": "The number of lines to read"
                }
            },
            "required": ["file_path"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> ToolResult {
        let params = match parse_params::<Params>(params) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let path = match ctx.sandboxed_resolve(&params.file_path) {
            Ok(p) => p,
            Err(e) => {
                if !ctx.resolve_path(&params.file_path).exists() {
                    return ToolResult::error(format!("File not found: {}", params.file_path));
                }
                return ToolResult::error(e);
            }
        };

        if !path.is_file() {
            if !path.exists() {
                return ToolResult::error(format!("File not found: {}", params.file_path));
            }
            return ToolResult::error(format!("Path is not a file: {}", path.display()));
        }

        let content = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => return ToolResult::error(format!("Failed to read file: {}", e)),
        };

        let check_len = content.len().min(8192);
        if content[..check_len].contains(&0) {
            return ToolResult::success_data(json!({
                "content": format!("Binary file: {} ({})", path.display(), human_size(content.len())),
                "total_lines": 0,
                "lines_returned": 0
            }));
        }

        let content = match String::from_utf8(content) {
            Ok(s) => s,
            Err(e) => return ToolResult::error(format!("File is not valid UTF-8: {}", e)),
        };

        let lines: Vec<&str> = content.lines().collect();
        let total_lines = lines.len();

        if total_lines == 0 {
            return ToolResult::success_data(json!({
                "content": "",
                "total_lines": 0,
                "lines_returned": 0
            }));
        }

        let start = params.offset.unwrap_or(1).saturating_sub(1);
        let limit = params.limit.unwrap_or(DEFAULT_LINE_LIMIT);
        if start >= total_lines {
            return ToolResult::error(format!(
                "Start line {} is beyond file length ({})",
                start + 1,
                total_lines
            ));
        }
        let end = start.saturating_add(limit).min(total_lines);

        ToolResult::success_data(json!({
            "content": lines[start..end].join("\n"),
            "total_lines": total_lines,
            "lines_returned": end - start,
            "start_line": start + 1
        }))
    }
}
