//! Graders (§4.10): exact match, pattern match, test-runner execution, and
//! LLM-rubric grading, in that priority order for [`CodeGrader`].

use std::sync::Arc;

use ah_domain::config::TestRunnerConfig;
use ah_domain::error::Result;
use ah_providers::Llm;
use ah_tools::{ProcessManager, TestRunnerTool};
use async_trait::async_trait;
use regex::Regex;

use crate::outcome::{GradeResult, TrialOutcome};
use crate::task::EvalTask;

#[async_trait]
pub trait Grader: Send + Sync {
    fn name(&self) -> &str;
    async fn grade(&self, task: &EvalTask, outcome: &TrialOutcome) -> GradeResult;
}

/// Grading priority: exact match, then regex patterns (80% threshold), then
/// a configured test-runner command against `test_file`.
///
/// The original implementation's third tier — executing a `test_code`
/// string against the agent's output via `exec()` — has no safe Rust
/// analogue and is not reintroduced here; see DESIGN.md.
pub struct CodeGrader {
    pub pattern_match_threshold: f64,
    test_runner: TestRunnerTool,
}

impl CodeGrader {
    pub fn new(process_manager: Arc<ProcessManager>, test_runner_config: TestRunnerConfig, pattern_match_threshold: f64) -> Self {
        Self { pattern_match_threshold, test_runner: TestRunnerTool::new(process_manager, test_runner_config) }
    }
}

#[async_trait]
impl Grader for CodeGrader {
    fn name(&self) -> &str {
        "code"
    }

    async fn grade(&self, task: &EvalTask, outcome: &TrialOutcome) -> GradeResult {
        if outcome.final_output.is_none() && task.test_file.is_none() {
            return GradeResult::new(false, 0.0, self.name(), "no output to grade and no test specified");
        }

        if let (Some(expected), Some(actual)) = (&task.expected_output, &outcome.final_output) {
            if expected.trim() == actual.trim() {
                return GradeResult::new(true, 1.0, self.name(), "exact match");
            }
        }

        if !task.expected_patterns.is_empty() {
            if let Some(actual) = &outcome.final_output {
                let total = task.expected_patterns.len();
                let matches = task
                    .expected_patterns
                    .iter()
                    .filter(|p| Regex::new(p).is_ok_and(|re| re.is_match(actual)))
                    .count();
                let score = matches as f64 / total as f64;
                let passed = score >= self.pattern_match_threshold;
                return GradeResult::new(passed, score, self.name(), format!("pattern match: {matches}/{total} patterns"))
                    .with_details(serde_json::json!({"matches": matches, "total": total}));
            }
        }

        if let Some(test_file) = &task.test_file {
            return match self.test_runner.execute(serde_json::json!({"test_path": test_file})).await {
                Ok(output) => {
                    let passed = output.starts_with("all tests passed");
                    GradeResult::new(passed, if passed { 1.0 } else { 0.0 }, self.name(), truncate(&output, 500))
                }
                Err(e) => GradeResult::new(false, 0.0, self.name(), format!("test run error: {e}")),
            };
        }

        GradeResult::new(false, 0.0, self.name(), "no grading criteria matched")
    }
}

const GRADING_PROMPT: &str = "You are evaluating an AI agent's response to a task.\n\n\
Task: {prompt}\n\n\
Grading Criteria:\n{criteria}\n\n\
Agent's Output:\n{output}\n\n\
Grade this response on a scale of 0.0 to 1.0 based on the criteria above. Consider whether the \
agent completed the task correctly, followed every criterion, and produced a well-formed, \
complete output.\n\n\
Respond in this exact format, one item per line:\n\
SCORE: <number between 0.0 and 1.0>\n\
PASSED: <true or false>\n\
REASON: <brief 1-2 sentence explanation>";

pub struct ModelGrader {
    llm: Arc<dyn Llm>,
}

impl ModelGrader {
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Grader for ModelGrader {
    fn name(&self) -> &str {
        "model"
    }

    async fn grade(&self, task: &EvalTask, outcome: &TrialOutcome) -> GradeResult {
        if task.grading_criteria.is_empty() {
            return GradeResult::new(false, 0.0, self.name(), "no grading criteria specified");
        }

        let criteria: String = task.grading_criteria.iter().map(|c| format!("- {c}\n")).collect();
        let prompt = GRADING_PROMPT
            .replace("{prompt}", &task.prompt)
            .replace("{criteria}", criteria.trim_end())
            .replace("{output}", outcome.final_output.as_deref().unwrap_or("(no output)"));

        let response = match self.llm.ask(&[ah_domain::tool::Message::user(prompt)], None, false, None).await {
            Ok(r) => r,
            Err(e) => return GradeResult::new(false, 0.0, self.name(), format!("grading error: {e}")),
        };

        parse_model_grade(&response)
    }
}

fn parse_model_grade(response: &str) -> GradeResult {
    let mut score = 0.0_f64;
    let mut passed = false;
    let mut reason = "could not parse grading response".to_string();

    for line in response.lines() {
        let line = line.trim();
        let upper = line.to_ascii_uppercase();
        if let Some(rest) = upper.strip_prefix("SCORE:") {
            if let Ok(v) = rest.trim().parse::<f64>() {
                score = v.clamp(0.0, 1.0);
            }
        } else if let Some(rest) = upper.strip_prefix("PASSED:") {
            passed = rest.trim().eq_ignore_ascii_case("true");
        } else if let Some(idx) = line.to_ascii_uppercase().find("REASON:") {
            reason = line[idx + "REASON:".len()..].trim().to_string();
        }
    }

    GradeResult { passed, score, grader_type: "model".to_string(), reason: Some(reason), details: serde_json::Value::Null }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_with_expected(expected: &str) -> EvalTask {
        EvalTask {
            task_id: "t1".into(),
            prompt: "say hi".into(),
            category: "general".into(),
            expected_output: Some(expected.into()),
            expected_patterns: vec![],
            grading_criteria: vec![],
            test_file: None,
            timeout_seconds: 10,
            max_steps: 5,
            effort_level: ah_domain::config::EffortLevel::Low,
            difficulty: "easy".into(),
            tags: vec![],
        }
    }

    fn outcome_with_output(output: &str) -> TrialOutcome {
        TrialOutcome {
            task_id: "t1".into(),
            trial_id: "tr1".into(),
            run_timestamp: chrono::Utc::now(),
            success: true,
            final_output: Some(output.into()),
            error: None,
            grades: vec![],
            final_score: 0.0,
            passed: false,
            steps_taken: 1,
            input_tokens: 0,
            output_tokens: 0,
            time_elapsed_seconds: 0.1,
            tool_calls_count: 0,
        }
    }

    #[tokio::test]
    async fn exact_match_passes() {
        let grader = CodeGrader::new(
            Arc::new(ProcessManager::new(ah_domain::config::ExecConfig::default())),
            TestRunnerConfig::default(),
            0.8,
        );
        let task = task_with_expected("hello");
        let outcome = outcome_with_output("hello");
        let result = grader.grade(&task, &outcome).await;
        assert!(result.passed);
        assert_eq!(result.score, 1.0);
    }

    #[tokio::test]
    async fn pattern_match_uses_threshold() {
        let grader = CodeGrader::new(
            Arc::new(ProcessManager::new(ah_domain::config::ExecConfig::default())),
            TestRunnerConfig::default(),
            0.8,
        );
        let mut task = task_with_expected("irrelevant");
        task.expected_output = None;
        task.expected_patterns = vec!["hel+o".into(), "not-present".into()];
        let outcome = outcome_with_output("hello world");
        let result = grader.grade(&task, &outcome).await;
        assert!(!result.passed); // 1/2 = 0.5 < 0.8
        assert!((result.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn parse_model_grade_reads_all_three_lines() {
        let result = parse_model_grade("SCORE: 0.9\nPASSED: true\nREASON: did great\n");
        assert!(result.passed);
        assert!((result.score - 0.9).abs() < 1e-9);
        assert_eq!(result.reason.as_deref(), Some("did great"));
    }
}
