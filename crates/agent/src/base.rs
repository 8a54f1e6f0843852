//! Base agent: the step-based execution loop and state machine shared by
//! every concrete agent kind. Concrete behavior (what a "step" does) lives
//! in a separate [`StepExecutor`] passed into [`BaseAgent::run`] — composition
//! over inheritance, since Rust has no subclassing to hang `step()` off of.

use std::sync::Arc;

use ah_domain::config::AgentConfig;
use ah_domain::error::{Error, Result};
use ah_domain::tool::{Message, Role};
use ah_providers::Llm;
use ah_tools::ToolRegistry;
use async_trait::async_trait;
use serde::Serialize;

use crate::recorder::RunRecorder;
use crate::state::{State, StateCell};
use crate::working_memory::WorkingMemory;

const REFLECTION_TAG: &str = "[[reflection-checkpoint]]";
const STUCK_PREFIX: &str = "Observed duplicate responses. Consider new strategies and avoid \
    repeating ineffective paths already attempted.";

/// One step of agent-specific behavior. Implementors read/write `base`'s
/// memory and tools, and return observational text describing what happened.
#[async_trait]
pub trait StepExecutor: Send {
    async fn step(&mut self, base: &mut BaseAgent) -> Result<String>;
}

#[derive(Debug, Clone, Serialize)]
pub struct LlmUsage {
    pub input_tokens: u64,
    pub completion_tokens: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub steps: u32,
    pub messages: usize,
    pub tool_calls: usize,
    pub state: State,
    pub final_preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmUsage>,
}

pub struct BaseAgent {
    pub name: String,
    pub description: Option<String>,
    pub system_prompt: Option<String>,
    /// Base `next_step_prompt`, before any stuck-detection prefix is applied.
    base_next_step_prompt: Option<String>,
    stuck_prefix_active: bool,

    pub llm: Arc<dyn Llm>,
    pub tools: Arc<ToolRegistry>,
    pub memory: WorkingMemory,
    pub recorder: Option<Arc<RunRecorder>>,

    state: StateCell,
    current_step: u32,
    effective_max_steps: u32,
    duplicate_threshold: usize,
    pub max_observe_chars: Option<usize>,
    high_effort_mode: bool,
    enable_reflection: bool,

    /// Tool names that transition the agent to FINISHED once invoked.
    pub special_tools: Vec<String>,
}

impl BaseAgent {
    pub fn new(
        name: impl Into<String>,
        llm: Arc<dyn Llm>,
        tools: Arc<ToolRegistry>,
        memory: WorkingMemory,
        config: &AgentConfig,
        max_steps: u32,
    ) -> Self {
        let effective_max_steps = max_steps.max(config.effort_level.max_steps());
        Self::with_effective_max_steps(name, llm, tools, memory, config, effective_max_steps)
    }

    /// Like [`BaseAgent::new`], but takes the step ceiling as-is rather than
    /// raising it to the configured effort level's floor. Sub-agents (§4.7)
    /// have their own fixed per-type ceilings that must not be inflated by
    /// the parent's effort level.
    pub fn with_effective_max_steps(
        name: impl Into<String>,
        llm: Arc<dyn Llm>,
        tools: Arc<ToolRegistry>,
        memory: WorkingMemory,
        config: &AgentConfig,
        effective_max_steps: u32,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            system_prompt: None,
            base_next_step_prompt: None,
            stuck_prefix_active: false,
            llm,
            tools,
            memory,
            recorder: None,
            state: StateCell::new(),
            current_step: 0,
            effective_max_steps,
            duplicate_threshold: config.duplicate_threshold,
            max_observe_chars: config.max_observe_chars,
            high_effort_mode: config.high_effort_mode,
            enable_reflection: config.enable_reflection,
            special_tools: vec!["terminate".to_string()],
        }
    }

    pub fn with_recorder(mut self, recorder: Arc<RunRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_next_step_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.base_next_step_prompt = Some(prompt.into());
        self
    }

    pub fn state(&self) -> State {
        self.state.get()
    }

    /// Force the agent back to `Idle` with `current_step` zeroed, for
    /// reuse across iterations (e.g. the reviewer in a doer-critic loop,
    /// §4.9). Bypasses the normal FINISHED/ERROR terminal states.
    pub fn reset_for_rerun(&mut self) {
        self.current_step = 0;
        self.state.set(State::Idle);
        self.stuck_prefix_active = false;
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    pub fn effective_max_steps(&self) -> u32 {
        self.effective_max_steps
    }

    /// The next-step prompt as it should be sent to the model this turn:
    /// the stuck-detection prefix (if active) followed by the base prompt.
    pub fn next_step_prompt(&self) -> Option<String> {
        match (self.stuck_prefix_active, &self.base_next_step_prompt) {
            (true, Some(base)) => Some(format!("{STUCK_PREFIX}\n{base}")),
            (true, None) => Some(STUCK_PREFIX.to_string()),
            (false, prompt) => prompt.clone(),
        }
    }

    fn record(&self, event: &str, data: Option<serde_json::Value>) {
        if let Some(recorder) = &self.recorder {
            recorder.event(event, data);
        }
    }

    /// Transition the agent to FINISHED. Called by a `StepExecutor` once it
    /// observes a special-tool invocation.
    pub fn finish(&self) {
        self.state.set(State::Finished);
    }

    pub fn get_run_summary(&self) -> RunSummary {
        let tool_calls = self.memory.messages().iter().filter(|m| m.role == Role::Tool).count();
        let final_output = self
            .memory
            .messages()
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .and_then(|m| m.content.as_deref())
            .unwrap_or("");
        let final_preview: String = final_output.chars().take(500).collect();

        RunSummary {
            steps: self.current_step,
            messages: self.memory.messages().len(),
            tool_calls,
            state: self.state(),
            final_preview,
            llm: Some(LlmUsage {
                input_tokens: self.llm.total_input_tokens(),
                completion_tokens: self.llm.total_completion_tokens(),
            }),
        }
    }

    /// Given the most recent assistant message with non-empty content,
    /// count earlier assistant messages with identical content. Stuck once
    /// that count reaches `duplicate_threshold`.
    fn is_stuck(&self) -> bool {
        let messages = self.memory.messages();
        let Some(last) = messages.last() else { return false };
        let Some(last_content) = last.content.as_deref() else { return false };
        if last_content.is_empty() {
            return false;
        }

        let duplicate_count = messages[..messages.len() - 1]
            .iter()
            .rev()
            .filter(|m| m.role == Role::Assistant && m.content.as_deref() == Some(last_content))
            .count();

        duplicate_count >= self.duplicate_threshold
    }

    fn maybe_inject_reflection_checkpoint(&mut self) {
        if !(self.high_effort_mode && self.enable_reflection) {
            return;
        }
        if self.current_step == 0 || self.current_step % 5 != 0 {
            return;
        }
        let content = format!(
            "{REFLECTION_TAG} Reflection checkpoint (step {}/{}): review progress against the \
            original goal — what's been accomplished, is the current approach working, and what \
            remains — before continuing.",
            self.current_step, self.effective_max_steps
        );
        self.memory.replace_tagged_system(REFLECTION_TAG, content);
    }

    /// Run the agent's main loop. Requires `Idle` state; returns an
    /// `IllegalState` error otherwise.
    pub async fn run(
        &mut self,
        executor: &mut dyn StepExecutor,
        initial_request: Option<String>,
    ) -> Result<String> {
        let guard = self.state.enter(State::Idle, State::Running)?;

        self.record("run_start", Some(serde_json::json!({ "request": initial_request })));
        if let Some(request) = initial_request {
            self.memory.push(Message::user(request));
        }

        let mut results: Vec<String> = Vec::new();
        let run_result = self.run_loop(executor, &mut results).await;

        match run_result {
            Ok(()) => {
                if self.current_step >= self.effective_max_steps {
                    self.current_step = 0;
                    results.push(format!("Terminated: reached max steps ({})", self.effective_max_steps));
                    guard.commit(State::Idle);
                } else {
                    // Executor drove the agent to FINISHED already.
                    guard.commit(State::Finished);
                }
                let summary = self.get_run_summary();
                self.record("run_end", Some(serde_json::to_value(&summary).unwrap_or_default()));
                Ok(if results.is_empty() { "No steps executed".to_string() } else { results.join("\n") })
            }
            Err(e) => {
                guard.commit(State::Error);
                let summary = self.get_run_summary();
                self.record("run_end", Some(serde_json::to_value(&summary).unwrap_or_default()));
                Err(e)
            }
        }
    }

    async fn run_loop(&mut self, executor: &mut dyn StepExecutor, results: &mut Vec<String>) -> Result<()> {
        while self.current_step < self.effective_max_steps && self.state() != State::Finished {
            self.current_step += 1;

            if let Err(e) = self.memory.maybe_compact().await {
                tracing::warn!(agent = %self.name, error = %e, "context compaction failed, continuing uncompacted");
            }

            self.maybe_inject_reflection_checkpoint();

            self.record("step_start", Some(serde_json::json!({ "step": self.current_step })));
            let step_result = executor.step(self).await?;
            let preview: String = step_result.chars().take(500).collect();
            self.record(
                "step_end",
                Some(serde_json::json!({ "step": self.current_step, "result_preview": preview })),
            );

            if self.is_stuck() {
                self.stuck_prefix_active = true;
                tracing::warn!(agent = %self.name, step = self.current_step, "agent stuck, prompting for a new strategy");
            }

            results.push(format!("Step {}: {step_result}", self.current_step));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ah_domain::config::{AgentConfig, EffortLevel};
    use ah_domain::error::Result as DomainResult;
    use ah_domain::tool::{Message, ToolDefinition};
    use ah_providers::{ToolAskResponse, ToolChoice};

    struct StubLlm;

    #[async_trait]
    impl Llm for StubLlm {
        async fn ask(&self, _: &[Message], _: Option<&[String]>, _: bool, _: Option<&str>) -> DomainResult<String> {
            Ok("stub".into())
        }
        async fn ask_with_tools(
            &self,
            _: &[Message],
            _: &[ToolDefinition],
            _: Option<&[String]>,
            _: ToolChoice,
        ) -> DomainResult<ToolAskResponse> {
            Ok(ToolAskResponse { assistant_message: Message::assistant("stub"), tool_calls: None })
        }
        fn count_message_tokens(&self, _: &[Message]) -> usize {
            0
        }
        fn total_input_tokens(&self) -> u64 {
            0
        }
        fn total_completion_tokens(&self) -> u64 {
            0
        }
    }

    struct FixedSteps {
        replies: Vec<&'static str>,
        idx: usize,
    }

    #[async_trait]
    impl StepExecutor for FixedSteps {
        async fn step(&mut self, base: &mut BaseAgent) -> Result<String> {
            let reply = self.replies.get(self.idx).copied().unwrap_or("done");
            self.idx += 1;
            base.memory.push(Message::assistant(reply));
            Ok(reply.to_string())
        }
    }

    struct FinishOnSecondStep;

    #[async_trait]
    impl StepExecutor for FinishOnSecondStep {
        async fn step(&mut self, base: &mut BaseAgent) -> Result<String> {
            base.memory.push(Message::assistant("working"));
            if base.current_step() >= 2 {
                base.finish();
            }
            Ok("working".into())
        }
    }

    fn new_base(max_steps: u32) -> BaseAgent {
        let config = AgentConfig { effort_level: EffortLevel::Low, ..Default::default() };
        BaseAgent::new(
            "test-agent",
            Arc::new(StubLlm),
            Arc::new(ToolRegistry::new()),
            WorkingMemory::plain(),
            &config,
            max_steps,
        )
    }

    #[tokio::test]
    async fn run_requires_idle_state() {
        let mut base = new_base(3);
        base.state.set(State::Running);
        let mut exec = FinishOnSecondStep;
        let err = base.run(&mut exec, None).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn run_terminates_on_finish_and_returns_to_idle_state_machine() {
        let mut base = new_base(10);
        let mut exec = FinishOnSecondStep;
        base.run(&mut exec, Some("go".into())).await.unwrap();
        assert_eq!(base.state(), State::Finished);
        assert_eq!(base.current_step(), 2);
    }

    #[tokio::test]
    async fn run_hits_max_steps_and_resets_to_idle() {
        let config = AgentConfig { effort_level: EffortLevel::Low, ..Default::default() };
        let mut base = BaseAgent::new(
            "test-agent",
            Arc::new(StubLlm),
            Arc::new(ToolRegistry::new()),
            WorkingMemory::plain(),
            &config,
            2,
        );
        let mut exec = FixedSteps { replies: vec!["a", "b", "c"], idx: 0 };
        let summary = base.run(&mut exec, None).await.unwrap();
        assert!(summary.contains("Terminated: reached max steps"));
        assert_eq!(base.state(), State::Idle);
        assert_eq!(base.current_step(), 0);
    }

    #[tokio::test]
    async fn stuck_detection_sets_prefix_once_threshold_hit() {
        let mut base = new_base(10);
        let mut exec = FixedSteps { replies: vec!["same", "same"], idx: 0 };
        base.run(&mut exec, None).await.unwrap();
        assert!(base.next_step_prompt().unwrap().starts_with("Observed duplicate responses"));
    }

    #[tokio::test]
    async fn reflection_checkpoint_inserted_every_five_steps_without_accumulating() {
        let mut config = AgentConfig { effort_level: EffortLevel::Low, ..Default::default() };
        config.high_effort_mode = true;
        config.enable_reflection = true;
        let mut base = BaseAgent::new(
            "test-agent",
            Arc::new(StubLlm),
            Arc::new(ToolRegistry::new()),
            WorkingMemory::plain(),
            &config,
            12,
        );
        let mut exec = FixedSteps { replies: (0..12).map(|_| "ok").collect(), idx: 0 };
        base.run(&mut exec, None).await.unwrap();

        let reflection_count = base
            .memory
            .messages()
            .iter()
            .filter(|m| m.content.as_deref().is_some_and(|c| c.starts_with(REFLECTION_TAG)))
            .count();
        assert_eq!(reflection_count, 1);
    }
}
