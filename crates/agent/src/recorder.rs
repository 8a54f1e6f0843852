//! Run recorder — one JSON line per event at `<log_dir>/<run_id>.jsonl`.
//!
//! Append-only, flushed per line, ASCII-safe (matches the wire format other
//! agent-harness components read back). Closed explicitly on session end;
//! `Drop` also flushes/closes so a forgotten `close()` doesn't lose the
//! trailing writes.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use ah_domain::error::{Error, Result};
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct Record<'a> {
    ts: String,
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

pub struct RunRecorder {
    run_id: String,
    path: PathBuf,
    handle: Mutex<Option<File>>,
}

impl RunRecorder {
    pub fn open(run_id: impl Into<String>, log_dir: impl AsRef<Path>) -> Result<Self> {
        let run_id = run_id.into();
        fs::create_dir_all(&log_dir)?;
        let path = log_dir.as_ref().join(format!("{run_id}.jsonl"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { run_id, path, handle: Mutex::new(Some(file)) })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event. Swallows and logs write errors rather than
    /// propagating — a failing recorder must never abort an agent run.
    pub fn event(&self, event: &str, data: Option<Value>) {
        if let Err(e) = self.try_event(event, data) {
            tracing::warn!(run_id = %self.run_id, error = %e, "run recorder write failed");
        }
    }

    fn try_event(&self, event: &str, data: Option<Value>) -> Result<()> {
        let record = Record { ts: Utc::now().to_rfc3339(), event, data };
        let line = serde_json::to_string(&record)?;
        let mut guard = self.handle.lock();
        let file = guard.as_mut().ok_or_else(|| Error::Other("recorder already closed".into()))?;
        writeln!(file, "{line}")?;
        file.flush()?;
        Ok(())
    }

    pub fn close(&self) {
        self.handle.lock().take();
    }
}

impl Drop for RunRecorder {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_appended_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = RunRecorder::open("run-1", dir.path()).unwrap();
        recorder.event("run_start", None);
        recorder.event("step_start", Some(serde_json::json!({"step": 1})));
        recorder.close();

        let contents = fs::read_to_string(dir.path().join("run-1.jsonl")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "run_start");
        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["data"]["step"], 1);
    }

    #[test]
    fn event_after_close_is_swallowed_not_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = RunRecorder::open("run-2", dir.path()).unwrap();
        recorder.close();
        recorder.event("run_end", None);
    }
}
