//! Terminate tool — the agent's signal that a run is complete.
//!
//! Invoking it is what a tool-calling agent recognizes via its special-tool
//! list to transition to FINISHED after the current step's act() completes.

use ah_domain::error::{Error, Result};
use ah_domain::tool::{Tool, ToolDefinition};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TerminateRequest {
    status: TerminateStatus,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TerminateStatus {
    Success,
    Failure,
}

pub struct TerminateTool;

#[async_trait]
impl Tool for TerminateTool {
    fn name(&self) -> &str {
        "terminate"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().into(),
            description: "End the current run. Call this once the task is complete or \
                cannot be completed, stating whether it succeeded."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "status": {"type": "string", "enum": ["success", "failure"]},
                    "reason": {"type": "string", "description": "Why the run is ending."},
                },
                "required": ["status"],
            }),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String> {
        let req: TerminateRequest = serde_json::from_value(arguments)
            .map_err(|e| Error::ToolArgumentInvalid { tool: self.name().into(), message: e.to_string() })?;

        let status = match req.status {
            TerminateStatus::Success => "success",
            TerminateStatus::Failure => "failure",
        };
        Ok(match req.reason {
            Some(reason) => format!("run ended: {status} ({reason})"),
            None => format!("run ended: {status}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_without_reason() {
        let out = TerminateTool.execute(serde_json::json!({"status": "success"})).await.unwrap();
        assert_eq!(out, "run ended: success");
    }

    #[tokio::test]
    async fn failure_with_reason() {
        let out = TerminateTool
            .execute(serde_json::json!({"status": "failure", "reason": "missing dependency"}))
            .await
            .unwrap();
        assert_eq!(out, "run ended: failure (missing dependency)");
    }

    #[tokio::test]
    async fn invalid_status_errors() {
        let err = TerminateTool.execute(serde_json::json!({"status": "maybe"})).await;
        assert!(err.is_err());
    }
}
