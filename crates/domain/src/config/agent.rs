use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Agent loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Coarse knob raising the per-run step ceiling; see `EffortLevel::max_steps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EffortLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl EffortLevel {
    /// Per-level step ceiling. Unknown values fall back to `Medium` at the
    /// deserialization layer (serde rejects unknown variants by refusing to
    /// parse, so this table only needs the three known levels).
    pub fn max_steps(self) -> u32 {
        match self {
            EffortLevel::Low => 10,
            EffortLevel::Medium => 20,
            EffortLevel::High => 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub effort_level: EffortLevel,
    /// When combined with `enable_reflection`, inserts a reflection
    /// checkpoint message every 5 steps.
    #[serde(default)]
    pub high_effort_mode: bool,
    #[serde(default)]
    pub enable_reflection: bool,
    /// Number of identical consecutive assistant replies before the agent
    /// is considered stuck.
    #[serde(default = "d_duplicate_threshold")]
    pub duplicate_threshold: usize,
    /// Character cap applied to each tool observation before it's appended
    /// to memory. `None` = unbounded.
    #[serde(default)]
    pub max_observe_chars: Option<usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            effort_level: EffortLevel::default(),
            high_effort_mode: false,
            enable_reflection: false,
            duplicate_threshold: d_duplicate_threshold(),
            max_observe_chars: None,
        }
    }
}

fn d_duplicate_threshold() -> usize {
    2
}
