//! Trial execution (§4.10): run a configured agent against one task, under
//! a wall-clock timeout, and grade the result.

use std::time::{Duration, Instant};

use ah_agent::{BaseAgent, StepExecutor};
use ah_domain::tool::Role;
use chrono::Utc;
use uuid::Uuid;

use crate::grader::Grader;
use crate::outcome::TrialOutcome;
use crate::task::EvalTask;

pub struct TrialRunner {
    graders: Vec<Box<dyn Grader>>,
}

impl TrialRunner {
    pub fn new(graders: Vec<Box<dyn Grader>>) -> Self {
        Self { graders }
    }

    /// Run `task.prompt` through `agent` (already configured for the task's
    /// `max_steps`/`effort_level` by the caller — §5's per-trial timeout is
    /// a wall-clock leash around the whole run, not a per-step budget), then
    /// apply every grader. A timeout or run error yields a failed outcome
    /// rather than propagating, mirroring the per-trial isolation the
    /// harness needs when running many tasks unattended.
    pub async fn run_trial(&self, task: &EvalTask, agent: &mut BaseAgent, executor: &mut dyn StepExecutor) -> TrialOutcome {
        let trial_id: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
        let start = Instant::now();

        let run_fut = agent.run(executor, Some(task.prompt.clone()));
        let run_result = tokio::time::timeout(Duration::from_secs(task.timeout_seconds), run_fut).await;

        let elapsed = start.elapsed().as_secs_f64();

        let run_result = match run_result {
            Ok(inner) => inner,
            Err(_) => {
                return TrialOutcome {
                    task_id: task.task_id.clone(),
                    trial_id,
                    run_timestamp: Utc::now(),
                    success: false,
                    final_output: None,
                    error: Some(format!("timeout after {}s", task.timeout_seconds)),
                    grades: vec![],
                    final_score: 0.0,
                    passed: false,
                    steps_taken: agent.current_step(),
                    input_tokens: 0,
                    output_tokens: 0,
                    time_elapsed_seconds: elapsed,
                    tool_calls_count: 0,
                };
            }
        };

        if let Err(e) = run_result {
            return TrialOutcome {
                task_id: task.task_id.clone(),
                trial_id,
                run_timestamp: Utc::now(),
                success: false,
                final_output: None,
                error: Some(e.to_string()),
                grades: vec![],
                final_score: 0.0,
                passed: false,
                steps_taken: agent.current_step(),
                input_tokens: 0,
                output_tokens: 0,
                time_elapsed_seconds: elapsed,
                tool_calls_count: 0,
            };
        }

        let final_output = agent
            .memory
            .messages()
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .and_then(|m| m.content.clone());
        let tool_calls_count = agent.memory.messages().iter().filter(|m| m.tool_calls.is_some()).count();

        let mut outcome = TrialOutcome {
            task_id: task.task_id.clone(),
            trial_id,
            run_timestamp: Utc::now(),
            success: true,
            final_output,
            error: None,
            grades: vec![],
            final_score: 0.0,
            passed: false,
            steps_taken: agent.current_step(),
            input_tokens: agent.llm.total_input_tokens(),
            output_tokens: agent.llm.total_completion_tokens(),
            time_elapsed_seconds: elapsed,
            tool_calls_count,
        };

        let mut grades = Vec::with_capacity(self.graders.len());
        for grader in &self.graders {
            grades.push(grader.grade(task, &outcome).await);
        }
        outcome.apply_grades(grades);
        outcome
    }

    /// Run `n` independent trials of the same task, building a fresh agent
    /// each time via `agent_factory` (the caller owns agent construction —
    /// it knows how to wire in the task's `max_steps`/`effort_level`).
    pub async fn run_multiple_trials<F, Fut>(&self, task: &EvalTask, mut agent_factory: F, n: usize) -> Vec<TrialOutcome>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = (BaseAgent, Box<dyn StepExecutor>)>,
    {
        let mut outcomes = Vec::with_capacity(n);
        for _ in 0..n {
            let (mut agent, mut executor) = agent_factory().await;
            outcomes.push(self.run_trial(task, &mut agent, executor.as_mut()).await);
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ah_agent::WorkingMemory;
    use ah_domain::config::{AgentConfig, EffortLevel};
    use ah_domain::error::Result as DomainResult;
    use ah_domain::tool::{Message, ToolDefinition};
    use ah_providers::{Llm, ToolAskResponse, ToolChoice};
    use ah_tools::ToolRegistry;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StubLlm;

    #[async_trait]
    impl Llm for StubLlm {
        async fn ask(&self, _: &[Message], _: Option<&[String]>, _: bool, _: Option<&str>) -> DomainResult<String> {
            Ok("stub".into())
        }
        async fn ask_with_tools(&self, _: &[Message], _: &[ToolDefinition], _: Option<&[String]>, _: ToolChoice) -> DomainResult<ToolAskResponse> {
            Ok(ToolAskResponse { assistant_message: Message::assistant("done"), tool_calls: None })
        }
        fn count_message_tokens(&self, _: &[Message]) -> usize {
            0
        }
        fn total_input_tokens(&self) -> u64 {
            7
        }
        fn total_completion_tokens(&self) -> u64 {
            3
        }
    }

    struct OneShot;

    #[async_trait]
    impl StepExecutor for OneShot {
        async fn step(&mut self, base: &mut BaseAgent) -> ah_domain::error::Result<String> {
            base.memory.push(Message::assistant("42"));
            base.finish();
            Ok("42".into())
        }
    }

    fn task() -> EvalTask {
        EvalTask {
            task_id: "t1".into(),
            prompt: "what is the answer".into(),
            category: "general".into(),
            expected_output: Some("42".into()),
            expected_patterns: vec![],
            grading_criteria: vec![],
            test_file: None,
            timeout_seconds: 5,
            max_steps: 3,
            effort_level: EffortLevel::Low,
            difficulty: "easy".into(),
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn run_trial_collects_metrics_and_grades() {
        let config = AgentConfig { effort_level: EffortLevel::Low, ..Default::default() };
        let mut agent = BaseAgent::new(
            "eval-agent",
            Arc::new(StubLlm),
            Arc::new(ToolRegistry::new()),
            WorkingMemory::plain(),
            &config,
            3,
        );
        let runner = TrialRunner::new(vec![]);
        let t = task();
        let mut exec = OneShot;
        let outcome = runner.run_trial(&t, &mut agent, &mut exec).await;
        assert!(outcome.success);
        assert_eq!(outcome.final_output.as_deref(), Some("42"));
        assert_eq!(outcome.input_tokens, 7);
        assert_eq!(outcome.output_tokens, 3);
    }
}
