use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sub-agent overrides
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-type overrides layered on top of the parent agent's defaults when a
/// sub-agent of that type is spawned. Keyed by `SubAgentType` name
/// (`"explore"`, `"code"`, `"review"`, ...) so new types don't require a
/// config schema change.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SubAgentConfig {
    #[serde(flatten, default)]
    pub overrides: HashMap<String, SubAgentOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SubAgentOverride {
    pub max_steps: Option<u32>,
    pub max_depth: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_has_no_overrides() {
        let cfg = SubAgentConfig::default();
        assert!(cfg.overrides.is_empty());
    }

    #[test]
    fn deserialize_per_type_override() {
        let raw = r#"
            [explore]
            max_steps = 15

            [review]
            max_steps = 5
            max_depth = 1
        "#;
        let cfg: SubAgentConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.overrides["explore"].max_steps, Some(15));
        assert_eq!(cfg.overrides["review"].max_depth, Some(1));
    }
}
