use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Context window management / persistent memory
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CompactionStrategy {
    DropOldToolResults,
    StripReasoning,
    SelectiveRetention,
    LlmSummarize,
    #[default]
    Composite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Enables the persistent memory tool (SQLite-backed store/retrieve/search).
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// Token count at which the context manager triggers compaction.
    #[serde(default = "d_compaction_threshold")]
    pub compaction_threshold_tokens: usize,
    #[serde(default)]
    pub strategy: CompactionStrategy,
    /// Percentage of the threshold at which a warning is surfaced to callers
    /// before compaction actually runs.
    #[serde(default = "d_warning_threshold_percent")]
    pub warning_threshold_percent: u8,
    #[serde(default = "d_db_path")]
    pub db_path: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: d_true(),
            compaction_threshold_tokens: d_compaction_threshold(),
            strategy: CompactionStrategy::default(),
            warning_threshold_percent: d_warning_threshold_percent(),
            db_path: d_db_path(),
        }
    }
}

fn d_true() -> bool {
    true
}
fn d_compaction_threshold() -> usize {
    100_000
}
fn d_warning_threshold_percent() -> u8 {
    80
}
fn d_db_path() -> String {
    "./agent-memory.db".into()
}
