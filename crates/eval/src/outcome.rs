//! Trial outcomes and per-grader results (§4.10).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeResult {
    pub passed: bool,
    /// Normalized to `[0.0, 1.0]`.
    pub score: f64,
    pub grader_type: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl GradeResult {
    pub fn new(passed: bool, score: f64, grader_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { passed, score: score.clamp(0.0, 1.0), grader_type: grader_type.into(), reason: Some(reason.into()), details: serde_json::Value::Null }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub task_id: String,
    pub trial_id: String,
    pub run_timestamp: DateTime<Utc>,

    pub success: bool,
    #[serde(default)]
    pub final_output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub grades: Vec<GradeResult>,
    #[serde(default)]
    pub final_score: f64,
    #[serde(default)]
    pub passed: bool,

    #[serde(default)]
    pub steps_taken: u32,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub time_elapsed_seconds: f64,
    #[serde(default)]
    pub tool_calls_count: usize,
}

impl TrialOutcome {
    pub fn tokens_used(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Fold per-grader results into `final_score`/`passed` — average score,
    /// pass requires every grader to pass.
    pub fn apply_grades(&mut self, grades: Vec<GradeResult>) {
        if !grades.is_empty() {
            self.final_score = grades.iter().map(|g| g.score).sum::<f64>() / grades.len() as f64;
            self.passed = grades.iter().all(|g| g.passed);
        }
        self.grades = grades;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_grades_averages_score_and_requires_all_pass() {
        let mut outcome = TrialOutcome {
            task_id: "t1".into(),
            trial_id: "tr1".into(),
            run_timestamp: Utc::now(),
            success: true,
            final_output: Some("42".into()),
            error: None,
            grades: vec![],
            final_score: 0.0,
            passed: false,
            steps_taken: 3,
            input_tokens: 100,
            output_tokens: 50,
            time_elapsed_seconds: 1.0,
            tool_calls_count: 2,
        };
        outcome.apply_grades(vec![
            GradeResult::new(true, 1.0, "code", "exact match"),
            GradeResult::new(false, 0.5, "model", "partial"),
        ]);
        assert!((outcome.final_score - 0.75).abs() < 1e-9);
        assert!(!outcome.passed);
        assert_eq!(outcome.tokens_used(), 150);
    }
}
