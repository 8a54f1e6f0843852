use crate::tokens::{estimate_message_tokens, is_tool_result};
use crate::truncation::redact_with_placeholder;
use ah_domain::error::Result;
use ah_domain::tool::{Message, Role};
use async_trait::async_trait;
use std::sync::Arc;

/// Minimal summarization capability required by `LlmSummarize`. Kept
/// independent of `ah-providers` so this crate doesn't need to depend on
/// the full provider stack — the gateway wires a concrete `Llm` adapter
/// into this trait at startup.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String>;
}

/// A strategy for reducing the token footprint of a message history.
/// Returns the number of (estimated) tokens freed.
#[async_trait]
pub trait CompactionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn compact(&self, messages: &mut Vec<Message>) -> Result<usize>;
}

fn tokens_before(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

/// Replaces the content of all but the most recent `keep_last` tool-result
/// messages with a short placeholder, unless the tool that produced them is
/// in `exclude_tools`. Tool output is usually the cheapest thing to
/// discard — the model rarely needs to re-read stdout from five steps ago.
pub struct DropOldToolResults {
    pub keep_last: usize,
    pub exclude_tools: Vec<String>,
}

impl Default for DropOldToolResults {
    fn default() -> Self {
        Self { keep_last: 3, exclude_tools: Vec::new() }
    }
}

#[async_trait]
impl CompactionStrategy for DropOldToolResults {
    fn name(&self) -> &'static str {
        "drop-old-tool-results"
    }

    async fn compact(&self, messages: &mut Vec<Message>) -> Result<usize> {
        let before = tokens_before(messages);

        let tool_result_indices: Vec<usize> = messages
            .iter()
            .enumerate()
            .filter(|(_, m)| is_tool_result(m))
            .map(|(i, _)| i)
            .collect();

        let cutoff = tool_result_indices.len().saturating_sub(self.keep_last);
        for &idx in &tool_result_indices[..cutoff] {
            let excluded = messages[idx].name.as_deref().is_some_and(|name| self.exclude_tools.iter().any(|t| t == name));
            if excluded {
                continue;
            }
            if let Some(content) = &messages[idx].content {
                if content.len() > 200 {
                    messages[idx].content = Some(redact_with_placeholder(content));
                }
            }
        }

        let after = tokens_before(messages);
        Ok(before.saturating_sub(after))
    }
}

/// Strips marker-delimited reasoning blocks (e.g. `<thinking>…</thinking>`)
/// from assistant messages older than the most recent `keep_recent`,
/// preserving the surrounding content. No-op on messages within the recent
/// window, so a model that leans on its own just-emitted reasoning still
/// sees it.
pub struct StripReasoning {
    pub markers: Vec<(String, String)>,
    pub keep_recent: usize,
}

impl Default for StripReasoning {
    fn default() -> Self {
        Self {
            markers: vec![("<thinking>".into(), "</thinking>".into()), ("<reasoning>".into(), "</reasoning>".into())],
            keep_recent: 2,
        }
    }
}

/// Remove every non-overlapping `start…end` span from `content`, for each
/// marker pair in turn. Non-greedy: each `start` is paired with the nearest
/// following `end`.
fn strip_marked_regions(content: &str, markers: &[(String, String)]) -> String {
    let mut result = content.to_string();
    for (start, end) in markers {
        loop {
            let Some(start_idx) = result.find(start.as_str()) else { break };
            let after_start = start_idx + start.len();
            let Some(end_rel) = result[after_start..].find(end.as_str()) else { break };
            let end_idx = after_start + end_rel + end.len();
            result.replace_range(start_idx..end_idx, "");
        }
    }
    result.trim().to_string()
}

#[async_trait]
impl CompactionStrategy for StripReasoning {
    fn name(&self) -> &'static str {
        "strip-reasoning"
    }

    async fn compact(&self, messages: &mut Vec<Message>) -> Result<usize> {
        let before = tokens_before(messages);

        let assistant_indices: Vec<usize> =
            messages.iter().enumerate().filter(|(_, m)| m.role == Role::Assistant).map(|(i, _)| i).collect();

        let cutoff = assistant_indices.len().saturating_sub(self.keep_recent);
        for &idx in &assistant_indices[..cutoff] {
            if let Some(content) = &messages[idx].content {
                let stripped = strip_marked_regions(content, &self.markers);
                if stripped != *content {
                    messages[idx].content = Some(stripped);
                }
            }
        }

        let after = tokens_before(messages);
        Ok(before.saturating_sub(after))
    }
}

/// Always keeps system messages and all user messages; additionally keeps
/// the last `2 * keep_recent_turns` messages (whatever role they carry),
/// merged with the first set and order-preserved. Deterministic — no model
/// call involved.
pub struct SelectiveRetention {
    pub keep_recent_turns: usize,
}

impl Default for SelectiveRetention {
    fn default() -> Self {
        Self { keep_recent_turns: 5 }
    }
}

#[async_trait]
impl CompactionStrategy for SelectiveRetention {
    fn name(&self) -> &'static str {
        "selective-retention"
    }

    async fn compact(&self, messages: &mut Vec<Message>) -> Result<usize> {
        let before = tokens_before(messages);

        if messages.is_empty() {
            return Ok(0);
        }

        let mut seen = vec![false; messages.len()];
        let mut retained: Vec<(usize, Message)> = Vec::new();

        for (i, m) in messages.iter().enumerate() {
            if m.role == Role::System || m.role == Role::User {
                retained.push((i, m.clone()));
                seen[i] = true;
            }
        }

        let recent_count = self.keep_recent_turns * 2;
        let recent_start = messages.len().saturating_sub(recent_count);
        for (i, m) in messages.iter().enumerate().skip(recent_start) {
            if !seen[i] {
                retained.push((i, m.clone()));
                seen[i] = true;
            }
        }

        retained.sort_by_key(|(i, _)| *i);
        *messages = retained.into_iter().map(|(_, m)| m).collect();

        let after = tokens_before(messages);
        Ok(before.saturating_sub(after))
    }
}

/// Summarizes the entire history via a model call and replaces it wholesale
/// with `[system (if any), user(<summary>…</summary> + continuation note)]`.
/// Falls back to [`SelectiveRetention`] if the summarizer call fails, rather
/// than surfacing the error and leaving the history uncompacted.
pub struct LlmSummarize {
    pub summarizer: Arc<dyn Summarizer>,
}

#[async_trait]
impl CompactionStrategy for LlmSummarize {
    fn name(&self) -> &'static str {
        "llm-summarize"
    }

    async fn compact(&self, messages: &mut Vec<Message>) -> Result<usize> {
        let before = tokens_before(messages);

        let transcript: String = messages.iter().filter_map(|m| m.content.as_deref()).collect::<Vec<_>>().join("\n");

        match self.summarizer.summarize(&transcript).await {
            Ok(summary) => {
                let system_message = messages.iter().find(|m| m.role == Role::System).cloned();
                let mut new_messages = Vec::new();
                if let Some(system_message) = system_message {
                    new_messages.push(system_message);
                }
                new_messages.push(Message::user(format!(
                    "<summary>\n{summary}\n</summary>\n\nContinue from this context."
                )));
                *messages = new_messages;
            }
            Err(e) => {
                tracing::error!(error = %e, "summarizer failed, falling back to selective retention");
                SelectiveRetention::default().compact(messages).await?;
            }
        }

        let after = tokens_before(messages);
        Ok(before.saturating_sub(after))
    }
}

/// Runs a fixed pipeline of strategies in increasing order of aggressiveness,
/// stopping as soon as `target_tokens` is reached. This is the default
/// strategy: cheap, reversible reductions are tried before anything that
/// discards information outright.
pub struct Composite {
    pub strategies: Vec<Box<dyn CompactionStrategy>>,
    pub target_tokens: usize,
}

impl Composite {
    /// Build the default pipeline: drop old tool results, then strip
    /// reasoning, then fall back to selective retention. `LlmSummarize` is
    /// only included when a summarizer is supplied, since it costs a model
    /// call.
    pub fn default_pipeline(target_tokens: usize, summarizer: Option<Arc<dyn Summarizer>>) -> Self {
        let mut strategies: Vec<Box<dyn CompactionStrategy>> = vec![
            Box::new(DropOldToolResults::default()),
            Box::new(StripReasoning::default()),
        ];
        if let Some(summarizer) = summarizer {
            strategies.push(Box::new(LlmSummarize { summarizer }));
        }
        strategies.push(Box::new(SelectiveRetention::default()));
        Self { strategies, target_tokens }
    }
}

#[async_trait]
impl CompactionStrategy for Composite {
    fn name(&self) -> &'static str {
        "composite"
    }

    async fn compact(&self, messages: &mut Vec<Message>) -> Result<usize> {
        let before = tokens_before(messages);

        for strategy in &self.strategies {
            if tokens_before(messages) <= self.target_tokens {
                break;
            }
            strategy.compact(messages).await?;
        }

        let after = tokens_before(messages);
        Ok(before.saturating_sub(after))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ah_domain::tool::ToolResult;

    fn long_tool_message(content: &str) -> Message {
        Message::tool_result(&ToolResult::ok("c1", content), "exec")
    }

    #[tokio::test]
    async fn drop_old_tool_results_keeps_recent() {
        let mut messages = vec![
            long_tool_message(&"x".repeat(500)),
            long_tool_message(&"y".repeat(500)),
            long_tool_message(&"z".repeat(500)),
        ];
        let strategy = DropOldToolResults { keep_last: 1, exclude_tools: Vec::new() };
        let freed = strategy.compact(&mut messages).await.unwrap();
        assert!(freed > 0);
        assert!(messages[0].content.as_ref().unwrap().contains("cleared"));
        assert!(messages[2].content.as_ref().unwrap().contains('z'));
    }

    #[tokio::test]
    async fn drop_old_tool_results_skips_excluded_tool_names() {
        let mut messages = vec![
            Message::tool_result(&ToolResult::ok("c1", &"x".repeat(500)), "memory"),
            Message::tool_result(&ToolResult::ok("c2", &"y".repeat(500)), "exec"),
            long_tool_message(&"z".repeat(500)),
        ];
        let strategy = DropOldToolResults { keep_last: 1, exclude_tools: vec!["memory".into()] };
        strategy.compact(&mut messages).await.unwrap();
        assert!(messages[0].content.as_ref().unwrap().contains('x'), "excluded tool's result must survive");
        assert!(messages[1].content.as_ref().unwrap().contains("cleared"));
    }

    #[tokio::test]
    async fn strip_reasoning_removes_marked_region_from_older_messages() {
        let mut messages = vec![
            Message::assistant("<thinking>scratch work</thinking>first answer"),
            Message::assistant("<thinking>more scratch</thinking>second answer"),
        ];
        let strategy = StripReasoning { keep_recent: 1, ..StripReasoning::default() };
        let freed = strategy.compact(&mut messages).await.unwrap();
        assert!(freed > 0);
        assert_eq!(messages[0].content.as_deref(), Some("first answer"));
        assert_eq!(messages[1].content.as_deref(), Some("<thinking>more scratch</thinking>second answer"));
    }

    #[tokio::test]
    async fn strip_reasoning_leaves_messages_without_markers_alone() {
        let mut messages = vec![Message::assistant("short reply"), Message::assistant("another reply")];
        let strategy = StripReasoning { keep_recent: 0, ..StripReasoning::default() };
        let freed = strategy.compact(&mut messages).await.unwrap();
        assert_eq!(freed, 0);
        assert_eq!(messages[0].content.as_deref(), Some("short reply"));
    }

    #[tokio::test]
    async fn selective_retention_keeps_all_system_and_user_messages() {
        let mut messages = vec![Message::system("sys")];
        for i in 0..20 {
            messages.push(Message::user(format!("turn {i}")));
            messages.push(Message::assistant(format!("reply {i}")));
        }
        let strategy = SelectiveRetention { keep_recent_turns: 1 };
        strategy.compact(&mut messages).await.unwrap();

        let user_count = messages.iter().filter(|m| m.role == Role::User).count();
        assert_eq!(user_count, 20, "all user messages must survive");
        assert_eq!(messages[0].role, Role::System);

        // Only the most recent 2 messages should have pulled in an assistant
        // reply beyond the ones implied by kept user messages.
        let assistant_count = messages.iter().filter(|m| m.role == Role::Assistant).count();
        assert!(assistant_count < 20, "older assistant replies outside the recent window must be dropped");
    }

    #[tokio::test]
    async fn selective_retention_preserves_original_order() {
        let mut messages = vec![Message::system("sys"), Message::user("u1"), Message::assistant("a1"), Message::user("u2")];
        let strategy = SelectiveRetention { keep_recent_turns: 10 };
        strategy.compact(&mut messages).await.unwrap();
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
    }

    struct FixedSummarizer;

    #[async_trait]
    impl Summarizer for FixedSummarizer {
        async fn summarize(&self, _text: &str) -> Result<String> {
            Ok("summary text".into())
        }
    }

    struct FailingSummarizer;

    #[async_trait]
    impl Summarizer for FailingSummarizer {
        async fn summarize(&self, _text: &str) -> Result<String> {
            Err(ah_domain::error::Error::Other("model unavailable".into()))
        }
    }

    #[tokio::test]
    async fn llm_summarize_replaces_entire_history() {
        let mut messages = vec![Message::system("sys")];
        for i in 0..20 {
            messages.push(Message::user(format!("turn {i}")));
        }
        let strategy = LlmSummarize { summarizer: Arc::new(FixedSummarizer) };
        strategy.compact(&mut messages).await.unwrap();

        assert!(messages.len() <= 2);
        let last = messages.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert!(last.content.as_deref().unwrap().contains("<summary>"));
        assert!(last.content.as_deref().unwrap().contains("summary text"));
    }

    #[tokio::test]
    async fn llm_summarize_falls_back_to_selective_retention_on_failure() {
        let mut messages = vec![Message::system("sys")];
        for i in 0..20 {
            messages.push(Message::user(format!("turn {i}")));
        }
        let strategy = LlmSummarize { summarizer: Arc::new(FailingSummarizer) };
        strategy.compact(&mut messages).await.unwrap();

        // Falls back to selective retention, which always keeps every user
        // message rather than collapsing to a two-message summary.
        let user_count = messages.iter().filter(|m| m.role == Role::User).count();
        assert_eq!(user_count, 20);
    }

    #[tokio::test]
    async fn composite_stops_once_target_reached() {
        let mut messages = vec![long_tool_message(&"x".repeat(2000))];
        let composite = Composite::default_pipeline(0, None);
        let freed = composite.compact(&mut messages).await.unwrap();
        assert!(freed > 0);
    }
}
