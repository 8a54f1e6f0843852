//! Editor tool — the agent-facing wrapper around [`crate::file_ops`].
//!
//! A single tool with an `action` discriminator over read/write/append/
//! move/delete/list, each constrained to a fixed workspace root.

use std::path::PathBuf;

use ah_domain::error::{Error, Result};
use ah_domain::tool::{Tool, ToolDefinition};
use async_trait::async_trait;
use serde::Deserialize;

use crate::file_ops::{
    file_append, file_delete, file_list, file_move, file_read, file_write, FileAppendRequest,
    FileDeleteRequest, FileListRequest, FileMoveRequest, FileReadRequest, FileWriteRequest,
};

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum EditorRequest {
    Read {
        path: String,
        #[serde(default)]
        offset: Option<usize>,
        #[serde(default)]
        limit: Option<usize>,
    },
    Write {
        path: String,
        content: String,
    },
    Append {
        path: String,
        content: String,
    },
    Move {
        source: String,
        destination: String,
    },
    Delete {
        path: String,
    },
    List {
        #[serde(default = "default_dot")]
        path: String,
    },
}

fn default_dot() -> String {
    ".".into()
}

pub struct EditorTool {
    workspace_root: PathBuf,
}

impl EditorTool {
    pub fn new(workspace_root: PathBuf) -> Self {
        Self { workspace_root }
    }
}

#[async_trait]
impl Tool for EditorTool {
    fn name(&self) -> &str {
        "editor"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().into(),
            description: "Read, write, append, move, delete, and list files within the \
                workspace. Every path is relative to the workspace root; `..` and absolute \
                paths are rejected."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "action": {"type": "string", "enum": ["read", "write", "append", "move", "delete", "list"]},
                    "path": {"type": "string"},
                    "content": {"type": "string"},
                    "source": {"type": "string"},
                    "destination": {"type": "string"},
                    "offset": {"type": "integer"},
                    "limit": {"type": "integer"},
                },
                "required": ["action"],
            }),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String> {
        let req: EditorRequest = serde_json::from_value(arguments)
            .map_err(|e| Error::ToolArgumentInvalid { tool: self.name().into(), message: e.to_string() })?;

        let result = match req {
            EditorRequest::Read { path, offset, limit } => {
                file_read(&self.workspace_root, FileReadRequest { path, offset, limit }).await
            }
            EditorRequest::Write { path, content } => {
                file_write(&self.workspace_root, FileWriteRequest { path, content }).await
            }
            EditorRequest::Append { path, content } => {
                file_append(&self.workspace_root, FileAppendRequest { path, content }).await
            }
            EditorRequest::Move { source, destination } => {
                file_move(&self.workspace_root, FileMoveRequest { source, destination }).await
            }
            EditorRequest::Delete { path } => file_delete(&self.workspace_root, FileDeleteRequest { path }).await,
            EditorRequest::List { path } => file_list(&self.workspace_root, FileListRequest { path }).await,
        };

        result
            .map(|v| v.to_string())
            .map_err(|message| Error::ToolExecutionError { tool: self.name().into(), message })
    }
}
