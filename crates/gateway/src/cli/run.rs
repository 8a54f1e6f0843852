//! `agentharness run` — one-shot execution command.
//!
//! Sends a single message to the agent, prints the response, and exits.
//! Useful for scripting and quick CLI interactions without standing up the
//! HTTP server.

use std::path::PathBuf;

use ah_domain::config::Config;

use crate::bootstrap;
use crate::session_agent::build_session_agent;
use crate::turn::{run_turn, TurnEvent};

/// Execute a single agent turn and print the response.
///
/// This is the entry point for `agentharness run "message"`.
pub async fn run(config: Config, message: String, session_id: String, model: Option<String>, json_output: bool) -> anyhow::Result<()> {
    if model.is_some() {
        tracing::warn!("--model override is not supported by the single-provider LLM config; ignoring");
    }

    let run_log_dir = PathBuf::from("./runs");
    let state = bootstrap::build_app_state(config, run_log_dir).await?;

    state.sessions.resolve_or_create(&session_id);
    state.sessions.begin_turn(&session_id);
    let _permit = state.session_locks.acquire(&session_id).await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let mut agent = build_session_agent(&state, &session_id)?;
    let output = run_turn(&session_id, &mut agent.base, message).await;

    state.sessions.append_turn(&session_id, output.new_messages.clone(), agent.base.llm.total_input_tokens(), agent.base.llm.total_completion_tokens());

    let mut exit_code = 0;
    if json_output {
        let json = serde_json::to_string_pretty(&output.events).map_err(|e| anyhow::anyhow!("serializing events: {e}"))?;
        println!("{json}");
    } else {
        for event in &output.events {
            match event {
                TurnEvent::Message { content, .. } => println!("{content}"),
                TurnEvent::ToolCall { name, .. } => eprintln!("\x1b[2m[tool: {name}]\x1b[0m"),
                TurnEvent::Error { message } => {
                    eprintln!("error: {message}");
                    exit_code = 1;
                }
                _ => {}
            }
        }
    }

    if exit_code != 0 {
        std::process::exit(exit_code);
    }

    Ok(())
}
