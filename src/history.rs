//! History Writer (C10) — appends finished sessions to a per-agent, append-only JSON-per-line log.
//!
//! A line-oriented log file opened for append, one JSON record per line — the same durable-log
//! shape used elsewhere for append-only persistence, applied here to a much smaller per-run
//! summary record rather than a full conversational transcript.

use crate::session::Session;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// One entry of `HistoryRecord.tool_calls`: `{name, status, duration_ms}`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallSummary {
    pub name: String,
    pub status: crate::session::TraceStatus,
    pub duration_ms: u64,
}

/// One line of the durable history log.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub agent_name: String,
    pub user_prompt: String,
    pub final_content: Option<String>,
    pub iterations_used: u32,
    pub duration_ms: u64,
    pub tool_calls: Vec<ToolCallSummary>,
}

impl HistoryRecord {
    /// Build a record from a finished [`Session`]. `end_time` defaults to `start_time` (zero
    /// duration) if the session was never explicitly finished, which should not happen in
    /// practice but keeps this infallible.
    pub fn from_session(session: &Session) -> Self {
        let end_time = session.end_time.unwrap_or(session.start_time);
        let duration_ms = (end_time - session.start_time).num_milliseconds().max(0) as u64;
        let tool_calls = session
            .trace
            .iter()
            .filter_map(|entry| match entry {
                crate::session::TraceEntry::ToolExecution { tool_name, status, duration_ms, .. } => {
                    Some(ToolCallSummary { name: tool_name.clone(), status: *status, duration_ms: *duration_ms })
                }
                _ => None,
            })
            .collect();
        Self {
            timestamp: end_time,
            agent_name: session.agent_name.clone(),
            user_prompt: session.user_prompt.clone(),
            final_content: session.final_content.clone(),
            iterations_used: session.iterations_used,
            duration_ms,
            tool_calls,
        }
    }
}

/// Default history directory for an agent named `name`: `.co/logs/<name>.log`, relative to
/// `project_root`.
pub fn default_log_path(project_root: &Path, agent_name: &str) -> PathBuf {
    project_root.join(".co").join("logs").join(format!("{}.log", agent_name))
}

/// Append `session` as one JSON line to `path`, creating parent directories as needed.
///
/// Failures to write are logged but never raise to the caller. Every fallible step here is
/// therefore swallowed into a `log::warn!` rather than propagated.
pub fn append(path: &Path, session: &Session) {
    let record = HistoryRecord::from_session(session);
    let line = match serde_json::to_string(&record) {
        Ok(s) => s,
        Err(e) => {
            if log::log_enabled!(log::Level::Warn) {
                log::warn!("history: failed to serialize session for '{}': {}", session.agent_name, e);
            }
            return;
        }
    };

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            if log::log_enabled!(log::Level::Warn) {
                log::warn!("history: failed to create {}: {}", parent.display(), e);
            }
            return;
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(path);
    match file {
        Ok(mut f) => {
            if let Err(e) = writeln!(f, "{}", line) {
                if log::log_enabled!(log::Level::Warn) {
                    log::warn!("history: failed to append to {}: {}", path.display(), e);
                }
            }
        }
        Err(e) => {
            if log::log_enabled!(log::Level::Warn) {
                log::warn!("history: failed to open {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_session() -> Session {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut session = Session::new("agent-under-test", None, "hello", 10_000, start);
        session.push_trace(crate::session::TraceEntry::ToolExecution {
            iteration: 1,
            tool_name: "echo".to_string(),
            arguments: serde_json::json!({}),
            result: Some("hi".to_string()),
            duration_ms: 5,
            status: crate::session::TraceStatus::Success,
            error: None,
        });
        session.finish("hi", start + chrono::Duration::milliseconds(42));
        session
    }

    #[test]
    fn record_counts_tool_executions_and_duration() {
        let record = HistoryRecord::from_session(&sample_session());
        assert_eq!(record.tool_calls.len(), 1);
        assert_eq!(record.tool_calls[0].name, "echo");
        assert_eq!(record.duration_ms, 42);
        assert_eq!(record.final_content.as_deref(), Some("hi"));
    }

    #[test]
    fn append_creates_parent_directories_and_writes_one_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("agent.log");
        append(&path, &sample_session());
        append(&path, &sample_session());
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn default_log_path_matches_co_logs_convention() {
        let path = default_log_path(Path::new("/proj"), "my-agent");
        assert_eq!(path, PathBuf::from("/proj/.co/logs/my-agent.log"));
    }
}
