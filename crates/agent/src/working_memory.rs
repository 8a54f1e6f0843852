//! The agent's own message history (distinct from `ah-memory`'s persistent
//! keyed store). Insertion-ordered, append-only for the lifetime of the
//! agent instance. Optionally backed by an [`ContextManager`] so compaction
//! runs transparently against the same sequence `think` reads.

use ah_context::ContextManager;
use ah_domain::error::Result;
use ah_domain::tool::{Message, Role};

pub enum WorkingMemory {
    Plain(Vec<Message>),
    Managed(ContextManager),
}

impl WorkingMemory {
    pub fn plain() -> Self {
        WorkingMemory::Plain(Vec::new())
    }

    pub fn managed(manager: ContextManager) -> Self {
        WorkingMemory::Managed(manager)
    }

    pub fn push(&mut self, message: Message) {
        match self {
            WorkingMemory::Plain(messages) => messages.push(message),
            WorkingMemory::Managed(manager) => manager.push(message),
        }
    }

    pub fn messages(&self) -> &[Message] {
        match self {
            WorkingMemory::Plain(messages) => messages,
            WorkingMemory::Managed(manager) => manager.messages(),
        }
    }

    /// Run the attached compaction strategy if over budget. No-op for
    /// unmanaged memory. Failures are the caller's concern to log and
    /// swallow — per the base-agent run loop, compaction never aborts a run.
    pub async fn maybe_compact(&mut self) -> Result<Option<ah_context::CompactionOutcome>> {
        match self {
            WorkingMemory::Plain(_) => Ok(None),
            WorkingMemory::Managed(manager) => manager.maybe_compact().await,
        }
    }

    /// Replace a previously-tagged system message (content starting with
    /// `tag`) in place, or push a new one. Used for reflection checkpoints,
    /// which must not accumulate across steps.
    pub fn replace_tagged_system(&mut self, tag: &str, content: String) {
        match self {
            WorkingMemory::Plain(messages) => {
                let existing = messages.iter().position(|m| {
                    m.role == Role::System && m.content.as_deref().is_some_and(|c| c.starts_with(tag))
                });
                match existing {
                    Some(pos) => messages[pos] = Message::system(content),
                    None => messages.push(Message::system(content)),
                }
            }
            WorkingMemory::Managed(manager) => manager.replace_tagged_system(tag, content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_memory_just_accumulates() {
        let mut mem = WorkingMemory::plain();
        mem.push(Message::user("hi"));
        mem.push(Message::assistant("hello"));
        assert_eq!(mem.messages().len(), 2);
    }
}
