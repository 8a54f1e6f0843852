//! Builds the `BaseAgent` behind a session, wiring in the configured
//! compaction strategy (§4.3) and a fresh tool registry (§4.7).

use std::sync::Arc;

use ah_agent::{BaseAgent, RunRecorder, WorkingMemory};
use ah_context::strategy::{Composite, DropOldToolResults, SelectiveRetention, StripReasoning};
use ah_context::ContextManager;
use ah_domain::config::CompactionStrategy as CompactionStrategyKind;
use ah_domain::error::Result;

use crate::bootstrap::build_tool_registry;
use crate::state::{AppState, SessionAgent};
use crate::summarizer::LlmSummarizer;

/// Resolve `config.memory.strategy` to a concrete [`ah_context::strategy::CompactionStrategy`].
fn build_strategy(state: &AppState) -> Box<dyn ah_context::strategy::CompactionStrategy> {
    let threshold = state.config.memory.compaction_threshold_tokens;
    match state.config.memory.strategy {
        CompactionStrategyKind::DropOldToolResults => Box::new(DropOldToolResults::default()),
        CompactionStrategyKind::StripReasoning => Box::new(StripReasoning::default()),
        CompactionStrategyKind::SelectiveRetention => Box::new(SelectiveRetention::default()),
        CompactionStrategyKind::LlmSummarize => {
            let summarizer = Arc::new(LlmSummarizer::new(state.llm.clone()));
            Box::new(Composite::default_pipeline(threshold, Some(summarizer)))
        }
        CompactionStrategyKind::Composite => Box::new(Composite::default_pipeline(threshold, None)),
    }
}

/// Build a brand-new agent for a session: fresh tool registry, managed
/// working memory under the configured compaction strategy, and a recorder
/// writing `{run_log_dir}/{session_id}.jsonl`.
pub fn build_session_agent(state: &AppState, session_id: &str) -> Result<SessionAgent> {
    let tools = build_tool_registry(&state.tool_env)?;

    let memory = if state.config.memory.enabled {
        let manager = ContextManager::new(
            state.config.memory.compaction_threshold_tokens,
            state.config.memory.warning_threshold_percent,
            build_strategy(state),
        );
        WorkingMemory::managed(manager)
    } else {
        WorkingMemory::plain()
    };

    let recorder = RunRecorder::open(session_id, &state.run_log_dir)?;

    let max_steps = state.config.agent.effort_level.max_steps();
    let mut base = BaseAgent::new(format!("session:{session_id}"), state.llm.clone(), tools, memory, &state.config.agent, max_steps);
    base.recorder = Some(Arc::new(recorder));

    Ok(SessionAgent { base })
}
