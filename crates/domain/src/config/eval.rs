use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Evaluation harness
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    #[serde(default = "d_timeout")]
    pub default_timeout_seconds: u64,
    /// Minimum normalized similarity for a regex/pattern grader to count
    /// a trial as passed.
    #[serde(default = "d_threshold")]
    pub pattern_match_threshold: f64,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            default_timeout_seconds: d_timeout(),
            pattern_match_threshold: d_threshold(),
        }
    }
}

fn d_timeout() -> u64 {
    300
}
fn d_threshold() -> f64 {
    0.8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = EvalConfig::default();
        assert_eq!(cfg.default_timeout_seconds, 300);
        assert!((cfg.pattern_match_threshold - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: EvalConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.default_timeout_seconds, 300);
    }
}
