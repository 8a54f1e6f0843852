use crate::strategy::CompactionStrategy;
use crate::tokens::estimate_total_tokens;
use ah_domain::error::Result;
use ah_domain::tool::Message;

/// Outcome of a single compaction pass.
#[derive(Debug, Clone)]
pub struct CompactionOutcome {
    pub strategy: &'static str,
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub tokens_freed: usize,
}

/// Tracks a running message history against a token budget and triggers
/// compaction once the budget is exceeded.
pub struct ContextManager {
    messages: Vec<Message>,
    threshold_tokens: usize,
    warning_threshold_percent: u8,
    strategy: Box<dyn CompactionStrategy>,
}

impl ContextManager {
    pub fn new(threshold_tokens: usize, warning_threshold_percent: u8, strategy: Box<dyn CompactionStrategy>) -> Self {
        Self { messages: Vec::new(), threshold_tokens, warning_threshold_percent, strategy }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace a previously-tagged system message in place, or push a new
    /// one if none exists yet. A message is "tagged" when its content
    /// starts with `tag` — used for things like reflection checkpoints that
    /// must not accumulate across steps.
    pub fn replace_tagged_system(&mut self, tag: &str, content: String) {
        use ah_domain::tool::{Message as Msg, Role};
        let existing = self.messages.iter().position(|m| {
            m.role == Role::System && m.content.as_deref().is_some_and(|c| c.starts_with(tag))
        });
        match existing {
            Some(pos) => self.messages[pos] = Msg::system(content),
            None => self.messages.push(Msg::system(content)),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn total_tokens(&self) -> usize {
        estimate_total_tokens(&self.messages)
    }

    pub fn needs_compaction(&self) -> bool {
        self.total_tokens() > self.threshold_tokens
    }

    /// True once usage crosses `warning_threshold_percent` of the budget,
    /// even if compaction hasn't triggered yet — callers can use this to
    /// surface a heads-up before the history is actually rewritten.
    pub fn is_near_threshold(&self) -> bool {
        let warn_at = self.threshold_tokens * self.warning_threshold_percent as usize / 100;
        self.total_tokens() > warn_at
    }

    /// Run the configured strategy if the budget is exceeded. No-op
    /// (returns `None`) otherwise.
    pub async fn maybe_compact(&mut self) -> Result<Option<CompactionOutcome>> {
        if !self.needs_compaction() {
            return Ok(None);
        }

        let tokens_before = self.total_tokens();
        self.strategy.compact(&mut self.messages).await?;
        let tokens_after = self.total_tokens();

        Ok(Some(CompactionOutcome {
            strategy: self.strategy.name(),
            tokens_before,
            tokens_after,
            tokens_freed: tokens_before.saturating_sub(tokens_after),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::DropOldToolResults;
    use ah_domain::tool::ToolResult;

    #[test]
    fn tracks_token_budget() {
        let mut mgr = ContextManager::new(1000, 80, Box::new(DropOldToolResults::default()));
        assert!(!mgr.needs_compaction());
        mgr.push(Message::user(&"x".repeat(5000)));
        assert!(mgr.needs_compaction());
    }

    #[test]
    fn warning_threshold_fires_before_hard_limit() {
        let mut mgr = ContextManager::new(1000, 50, Box::new(DropOldToolResults::default()));
        mgr.push(Message::user(&"x".repeat(2100))); // ~525 tokens, over 50% of 1000
        assert!(mgr.is_near_threshold());
        assert!(!mgr.needs_compaction());
    }

    #[tokio::test]
    async fn maybe_compact_runs_only_when_over_budget() {
        let mut mgr = ContextManager::new(100, 80, Box::new(DropOldToolResults { keep_last: 0, exclude_tools: Vec::new() }));
        mgr.push(Message::tool_result(&ToolResult::ok("c1", &"x".repeat(1000)), "exec"));
        let outcome = mgr.maybe_compact().await.unwrap();
        assert!(outcome.is_some());
        assert!(outcome.unwrap().tokens_freed > 0);
    }

    #[test]
    fn replace_tagged_system_does_not_accumulate() {
        let mut mgr = ContextManager::new(10_000, 80, Box::new(DropOldToolResults::default()));
        mgr.replace_tagged_system("[[reflection]]", "[[reflection]] step 5".into());
        mgr.push(Message::user("continuing"));
        mgr.replace_tagged_system("[[reflection]]", "[[reflection]] step 10".into());

        let system_count = mgr.messages().iter().filter(|m| m.role == ah_domain::tool::Role::System).count();
        assert_eq!(system_count, 1);
        assert_eq!(mgr.messages()[0].content.as_deref(), Some("[[reflection]] step 10"));
    }

    #[tokio::test]
    async fn maybe_compact_is_noop_under_budget() {
        let mut mgr = ContextManager::new(10_000, 80, Box::new(DropOldToolResults::default()));
        mgr.push(Message::user("hi"));
        let outcome = mgr.maybe_compact().await.unwrap();
        assert!(outcome.is_none());
    }
}
