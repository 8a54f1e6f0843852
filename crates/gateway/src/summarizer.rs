//! Wires the configured LLM into `ah_context`'s [`Summarizer`] trait, so the
//! `llm-summarize` compaction strategy (§4.3) has a model to call without
//! `ah-context` itself depending on `ah-providers`.

use std::sync::Arc;

use ah_context::strategy::Summarizer;
use ah_domain::error::Result;
use ah_domain::tool::Message;
use ah_providers::Llm;
use async_trait::async_trait;

pub struct LlmSummarizer {
    llm: Arc<dyn Llm>,
}

impl LlmSummarizer {
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        let prompt = format!("Summarize the following conversation concisely, preserving decisions, facts, and open threads:\n\n{text}");
        self.llm.ask(&[Message::user(prompt)], None, false, None).await
    }
}
