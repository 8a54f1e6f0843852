//! `ah-sessions` — the session gateway's id/transcript/lock primitives.
//!
//! A session maps a stable id to its running message transcript, cumulative
//! token usage, and a per-session run lock so a second message arriving
//! mid-turn queues rather than racing the first. The agent instance that
//! actually drives a session's turns is owned by the gateway, not here —
//! see `DESIGN.md`.

pub mod session_lock;
pub mod store;

pub use session_lock::{SessionBusy, SessionLockMap};
pub use store::{SessionRecord, SessionStore};
