//! Aggregate metrics over a batch of trial outcomes (§4.10): pass@k, token
//! efficiency, and category/difficulty breakdowns.

use std::collections::HashMap;

use serde::Serialize;

use crate::outcome::TrialOutcome;
use crate::task::EvalTask;

/// `pass@k`: probability that at least one of `k` random samples passes,
/// given `n` total trials with `c` passes. `1 - C(n-c, k) / C(n, k)`, with
/// degenerate cases for `n < k` (just whether anything passed) and
/// `n - c < k` (failures alone couldn't fill `k` samples, so pass@k = 1).
pub fn calculate_pass_at_k(outcomes: &[TrialOutcome], k: u64) -> f64 {
    if outcomes.is_empty() || k == 0 {
        return 0.0;
    }

    let n = outcomes.len() as u64;
    let c = outcomes.iter().filter(|o| o.passed).count() as u64;

    if n < k {
        return if c > 0 { 1.0 } else { 0.0 };
    }
    if n - c < k {
        return 1.0;
    }

    1.0 - binom(n - c, k) / binom(n, k)
}

fn binom(n: u64, k: u64) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut result = 1.0_f64;
    for i in 0..k {
        result = result * (n - i) as f64 / (i + 1) as f64;
    }
    result
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenEfficiency {
    pub avg_tokens_per_success: f64,
    pub total_tokens: u64,
    pub success_count: usize,
}

pub fn token_efficiency(outcomes: &[TrialOutcome]) -> TokenEfficiency {
    let total_tokens: u64 = outcomes.iter().map(|o| o.tokens_used()).sum();
    let successful: Vec<&TrialOutcome> = outcomes.iter().filter(|o| o.passed).collect();

    if successful.is_empty() {
        return TokenEfficiency { avg_tokens_per_success: f64::INFINITY, total_tokens, success_count: 0 };
    }

    let success_tokens: u64 = successful.iter().map(|o| o.tokens_used()).sum();
    TokenEfficiency {
        avg_tokens_per_success: success_tokens as f64 / successful.len() as f64,
        total_tokens,
        success_count: successful.len(),
    }
}

pub fn success_rate_by_category(outcomes: &[TrialOutcome], tasks: &HashMap<String, EvalTask>) -> HashMap<String, f64> {
    group_success_rate(outcomes, tasks, |t| t.category.clone())
}

pub fn success_rate_by_difficulty(outcomes: &[TrialOutcome], tasks: &HashMap<String, EvalTask>) -> HashMap<String, f64> {
    group_success_rate(outcomes, tasks, |t| t.difficulty.clone())
}

fn group_success_rate(
    outcomes: &[TrialOutcome],
    tasks: &HashMap<String, EvalTask>,
    key_fn: impl Fn(&EvalTask) -> String,
) -> HashMap<String, f64> {
    let mut by_key: HashMap<String, Vec<bool>> = HashMap::new();
    for outcome in outcomes {
        let key = tasks.get(&outcome.task_id).map(&key_fn).unwrap_or_else(|| "unknown".to_string());
        by_key.entry(key).or_default().push(outcome.passed);
    }
    by_key
        .into_iter()
        .map(|(key, passes)| {
            let rate = if passes.is_empty() { 0.0 } else { passes.iter().filter(|p| **p).count() as f64 / passes.len() as f64 };
            (key, rate)
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateMetrics {
    pub total_trials: usize,
    pub passed: usize,
    pub failed: usize,

    pub pass_rate: f64,
    pub pass_at_1: f64,
    pub pass_at_3: f64,
    pub pass_at_5: f64,

    pub avg_score: f64,
    pub min_score: f64,
    pub max_score: f64,

    pub avg_steps: f64,
    pub avg_tokens: f64,
    pub avg_time_seconds: f64,
    pub avg_tool_calls: f64,

    pub token_efficiency: TokenEfficiency,

    pub by_category: HashMap<String, f64>,
    pub by_difficulty: HashMap<String, f64>,

    pub error_count: usize,
    pub timeout_count: usize,
}

pub fn aggregate_metrics(outcomes: &[TrialOutcome], tasks: &HashMap<String, EvalTask>) -> Option<AggregateMetrics> {
    if outcomes.is_empty() {
        return None;
    }

    let n = outcomes.len();
    let passed = outcomes.iter().filter(|o| o.passed).count();

    Some(AggregateMetrics {
        total_trials: n,
        passed,
        failed: n - passed,

        pass_rate: passed as f64 / n as f64,
        pass_at_1: calculate_pass_at_k(outcomes, 1),
        pass_at_3: calculate_pass_at_k(outcomes, 3),
        pass_at_5: calculate_pass_at_k(outcomes, 5),

        avg_score: outcomes.iter().map(|o| o.final_score).sum::<f64>() / n as f64,
        min_score: outcomes.iter().map(|o| o.final_score).fold(f64::INFINITY, f64::min),
        max_score: outcomes.iter().map(|o| o.final_score).fold(f64::NEG_INFINITY, f64::max),

        avg_steps: outcomes.iter().map(|o| o.steps_taken as f64).sum::<f64>() / n as f64,
        avg_tokens: outcomes.iter().map(|o| o.tokens_used() as f64).sum::<f64>() / n as f64,
        avg_time_seconds: outcomes.iter().map(|o| o.time_elapsed_seconds).sum::<f64>() / n as f64,
        avg_tool_calls: outcomes.iter().map(|o| o.tool_calls_count as f64).sum::<f64>() / n as f64,

        token_efficiency: token_efficiency(outcomes),

        by_category: success_rate_by_category(outcomes, tasks),
        by_difficulty: success_rate_by_difficulty(outcomes, tasks),

        error_count: outcomes.iter().filter(|o| o.error.is_some()).count(),
        timeout_count: outcomes.iter().filter(|o| o.error.as_deref().is_some_and(|e| e.contains("timeout"))).count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn outcome(passed: bool) -> TrialOutcome {
        TrialOutcome {
            task_id: "t1".into(),
            trial_id: "tr".into(),
            run_timestamp: Utc::now(),
            success: true,
            final_output: None,
            error: None,
            grades: vec![],
            final_score: if passed { 1.0 } else { 0.0 },
            passed,
            steps_taken: 2,
            input_tokens: 10,
            output_tokens: 5,
            time_elapsed_seconds: 0.5,
            tool_calls_count: 1,
        }
    }

    #[test]
    fn pass_at_k_matches_reference_formula() {
        // 5 trials, 2 passes.
        let outcomes: Vec<TrialOutcome> = vec![outcome(true), outcome(true), outcome(false), outcome(false), outcome(false)];
        let p1 = calculate_pass_at_k(&outcomes, 1);
        assert!((p1 - 0.4).abs() < 1e-9); // 1 - C(3,1)/C(5,1) = 1 - 3/5
    }

    #[test]
    fn pass_at_k_degenerate_when_fewer_trials_than_k() {
        let outcomes = vec![outcome(true)];
        assert_eq!(calculate_pass_at_k(&outcomes, 5), 1.0);
        let outcomes = vec![outcome(false)];
        assert_eq!(calculate_pass_at_k(&outcomes, 5), 0.0);
    }

    #[test]
    fn pass_at_k_is_one_when_failures_cannot_fill_k() {
        // 5 trials, 4 passes: n - c = 1 < k = 3.
        let outcomes = vec![outcome(true), outcome(true), outcome(true), outcome(true), outcome(false)];
        assert_eq!(calculate_pass_at_k(&outcomes, 3), 1.0);
    }

    #[test]
    fn token_efficiency_is_infinite_with_no_successes() {
        let outcomes = vec![outcome(false), outcome(false)];
        let eff = token_efficiency(&outcomes);
        assert!(eff.avg_tokens_per_success.is_infinite());
        assert_eq!(eff.total_tokens, 30);
    }

    #[test]
    fn aggregate_metrics_none_on_empty() {
        assert!(aggregate_metrics(&[], &HashMap::new()).is_none());
    }
}
