//! Evaluation harness: benchmark tasks, graders, trial execution, and
//! pass@k-style aggregate metrics (§4.10).

pub mod grader;
pub mod metrics;
pub mod outcome;
pub mod task;
pub mod trial;

pub use grader::{CodeGrader, Grader, ModelGrader};
pub use metrics::{aggregate_metrics, calculate_pass_at_k, success_rate_by_category, success_rate_by_difficulty, token_efficiency, AggregateMetrics, TokenEfficiency};
pub use outcome::{GradeResult, TrialOutcome};
pub use task::EvalTask;
pub use trial::TrialRunner;
