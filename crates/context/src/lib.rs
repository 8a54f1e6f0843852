pub mod manager;
pub mod strategy;
pub mod tokens;
pub mod truncation;

pub use manager::{CompactionOutcome, ContextManager};
pub use strategy::{Composite, CompactionStrategy, DropOldToolResults, LlmSummarize, SelectiveRetention, StripReasoning, Summarizer};
