//! In-memory session registry.
//!
//! Each session id maps to a [`SessionRecord`]: its message transcript,
//! `current_step` counter (reset at the start of every turn), and cumulative
//! token usage. The agent instance and run recorder that actually drive a
//! session's turns live in the gateway's `AppState`, keyed by the same id —
//! see `DESIGN.md` for why that split avoids a dependency cycle.

use std::collections::HashMap;

use ah_domain::tool::Message;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// A single session tracked by the gateway.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Append-only message transcript for this session.
    pub messages: Vec<Message>,
    /// Steps taken in the turn currently in flight; reset to 0 at the start
    /// of each new chat request per §4.12.
    pub current_step: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl SessionRecord {
    fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
            current_step: 0,
            input_tokens: 0,
            output_tokens: 0,
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Registry of live sessions, keyed by session id.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self { sessions: RwLock::new(HashMap::new()) }
    }

    /// Look up a session by id.
    pub fn get(&self, id: &str) -> Option<SessionRecord> {
        self.sessions.read().get(id).cloned()
    }

    /// Resolve a session, creating it if absent. Returns `(record, is_new)`.
    pub fn resolve_or_create(&self, id: &str) -> (SessionRecord, bool) {
        {
            let sessions = self.sessions.read();
            if let Some(record) = sessions.get(id) {
                return (record.clone(), false);
            }
        }
        let mut sessions = self.sessions.write();
        let record = sessions.entry(id.to_owned()).or_insert_with(|| SessionRecord::new(id.to_owned()));
        (record.clone(), true)
    }

    /// Snapshot the message count and reset `current_step` to zero — the
    /// first two steps of §4.12's chat-request handling.
    pub fn begin_turn(&self, id: &str) -> usize {
        let mut sessions = self.sessions.write();
        let record = sessions.entry(id.to_owned()).or_insert_with(|| SessionRecord::new(id.to_owned()));
        record.current_step = 0;
        record.messages.len()
    }

    /// Append messages produced during a turn and record token usage.
    pub fn append_turn(&self, id: &str, new_messages: Vec<Message>, input_tokens: u64, output_tokens: u64) {
        let mut sessions = self.sessions.write();
        if let Some(record) = sessions.get_mut(id) {
            record.messages.extend(new_messages);
            record.input_tokens += input_tokens;
            record.output_tokens += output_tokens;
            record.updated_at = Utc::now();
        }
    }

    /// Advance the in-flight step counter for a session.
    pub fn advance_step(&self, id: &str) -> usize {
        let mut sessions = self.sessions.write();
        if let Some(record) = sessions.get_mut(id) {
            record.current_step += 1;
            record.current_step
        } else {
            0
        }
    }

    /// Reset a session: clear its transcript and counters, keeping the id.
    pub fn reset(&self, id: &str) -> Option<SessionRecord> {
        let mut sessions = self.sessions.write();
        let record = sessions.get_mut(id)?;
        *record = SessionRecord::new(id.to_owned());
        Some(record.clone())
    }

    /// List every tracked session (for status/introspection endpoints).
    pub fn list(&self) -> Vec<SessionRecord> {
        self.sessions.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_or_create_reports_new_then_existing() {
        let store = SessionStore::new();
        let (_, is_new) = store.resolve_or_create("s1");
        assert!(is_new);
        let (_, is_new) = store.resolve_or_create("s1");
        assert!(!is_new);
    }

    #[test]
    fn begin_turn_resets_step_and_returns_message_count() {
        let store = SessionStore::new();
        store.resolve_or_create("s1");
        store.append_turn("s1", vec![Message::user("hi")], 5, 2);
        store.advance_step("s1");
        let count = store.begin_turn("s1");
        assert_eq!(count, 1);
        assert_eq!(store.get("s1").unwrap().current_step, 0);
    }

    #[test]
    fn append_turn_accumulates_tokens_and_messages() {
        let store = SessionStore::new();
        store.resolve_or_create("s1");
        store.append_turn("s1", vec![Message::user("hi"), Message::assistant("hello")], 10, 4);
        let record = store.get("s1").unwrap();
        assert_eq!(record.messages.len(), 2);
        assert_eq!(record.total_tokens(), 14);
    }

    #[test]
    fn reset_clears_transcript_but_keeps_id() {
        let store = SessionStore::new();
        store.resolve_or_create("s1");
        store.append_turn("s1", vec![Message::user("hi")], 3, 1);
        let reset = store.reset("s1").unwrap();
        assert_eq!(reset.id, "s1");
        assert!(reset.messages.is_empty());
        assert_eq!(reset.total_tokens(), 0);
    }

    #[test]
    fn reset_missing_session_is_none() {
        let store = SessionStore::new();
        assert!(store.reset("missing").is_none());
    }

    #[test]
    fn list_reports_all_sessions() {
        let store = SessionStore::new();
        store.resolve_or_create("a");
        store.resolve_or_create("b");
        assert_eq!(store.list().len(), 2);
        assert_eq!(store.len(), 2);
    }
}
