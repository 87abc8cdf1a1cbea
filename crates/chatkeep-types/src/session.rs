//! User and chat session records.
//!
//! A session is the persisted conversational context of one user: serialized
//! history, last activity, accumulated token usage, and a version counter
//! used for optimistic concurrency.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::Turn;

/// A chat user, identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
}

/// A persisted chat session.
///
/// `version` starts at 1 and is advanced by the store on every committed
/// update. An in-memory copy whose version no longer matches the stored row
/// cannot be written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub session_id: String,
    pub user_name: String,
    /// Serialized `Vec<Turn>` (JSON).
    pub history_json: String,
    pub last_active: DateTime<Utc>,
    pub token_count: u64,
    pub version: i64,
}

impl ChatSession {
    /// Seconds elapsed since the session was last active (never negative).
    pub fn idle_secs(&self, now: DateTime<Utc>) -> f64 {
        let micros = (now - self.last_active).num_microseconds().unwrap_or(i64::MAX);
        (micros as f64 / 1_000_000.0).max(0.0)
    }

    /// Whether the session has been idle for longer than `timeout_secs`.
    pub fn is_expired(&self, now: DateTime<Utc>, timeout_secs: u64) -> bool {
        self.idle_secs(now) > timeout_secs as f64
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            user_name: self.user_name.clone(),
            last_active: self.last_active,
            token_count: self.token_count,
            version: self.version,
            history_bytes: self.history_json.len(),
        }
    }
}

/// Listing view of a session (history omitted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub user_name: String,
    pub last_active: DateTime<Utc>,
    pub token_count: u64,
    pub version: i64,
    pub history_bytes: usize,
}

/// Mint a fresh, globally unique session identifier.
pub fn new_session_id() -> String {
    Uuid::now_v7().to_string()
}

/// Serialize history for storage.
pub fn encode_history(history: &[Turn]) -> Result<String, serde_json::Error> {
    serde_json::to_string(history)
}

/// Parse stored history.
pub fn decode_history(json: &str) -> Result<Vec<Turn>, serde_json::Error> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_session(last_active: DateTime<Utc>) -> ChatSession {
        ChatSession {
            session_id: "s-1".to_string(),
            user_name: "steve".to_string(),
            history_json: "[]".to_string(),
            last_active,
            token_count: 0,
            version: 1,
        }
    }

    #[test]
    fn test_is_expired_boundary() {
        let now = Utc::now();
        let exactly = make_session(now - Duration::seconds(300));
        assert!(!exactly.is_expired(now, 300));

        let stale = make_session(now - Duration::seconds(301));
        assert!(stale.is_expired(now, 300));
    }

    #[test]
    fn test_idle_secs_clamps_future_timestamps() {
        let now = Utc::now();
        let session = make_session(now + Duration::seconds(10));
        assert_eq!(session.idle_secs(now), 0.0);
        assert!(!session.is_expired(now, 0));
    }

    #[test]
    fn test_history_encode_decode() {
        let history = vec![Turn::user("hi"), Turn::model("hello")];
        let json = encode_history(&history).unwrap();
        assert_eq!(decode_history(&json).unwrap(), history);
        assert!(decode_history("not json").is_err());
    }

    #[test]
    fn test_new_session_ids_are_unique() {
        let a = new_session_id();
        let b = new_session_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_summary_reports_history_size() {
        let mut session = make_session(Utc::now());
        session.history_json = r#"[{"role":"user","parts":[]}]"#.to_string();
        let summary = session.summary();
        assert_eq!(summary.history_bytes, session.history_json.len());
        assert_eq!(summary.session_id, "s-1");
    }
}
