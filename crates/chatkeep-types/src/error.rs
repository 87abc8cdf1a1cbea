use thiserror::Error;

/// Errors from repository operations (used by trait definitions in chatkeep-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query error: {0}")]
    Query(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The session exists but belongs to another user.
    #[error("session '{session_id}' does not belong to user '{user_name}'")]
    Forbidden {
        session_id: String,
        user_name: String,
    },

    /// Optimistic-lock failure or duplicate insert.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors surfaced by the chat service to its callers.
///
/// Only `Conflict` is retried internally; everything else is terminal.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("token quota exceeded: {used} of {limit} tokens used")]
    QuotaExceeded { used: u64, limit: u64 },

    #[error("conflict: {0}")]
    Conflict(String),

    /// The LLM backend failed or timed out. Detail is logged, never surfaced.
    #[error("service unavailable")]
    ServiceUnavailable,

    #[error("storage error: {0}")]
    Storage(RepositoryError),
}

impl From<RepositoryError> for ChatError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(what) => ChatError::NotFound(what),
            RepositoryError::Forbidden { session_id, .. } => {
                ChatError::Forbidden(format!("session '{session_id}' belongs to another user"))
            }
            RepositoryError::Conflict(msg) => ChatError::Conflict(msg),
            other => ChatError::Storage(other),
        }
    }
}

impl ChatError {
    /// Whether the whole chat turn may be retried from a fresh read.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChatError::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_forbidden_maps_without_leaking_owner() {
        let err: ChatError = RepositoryError::Forbidden {
            session_id: "abc".to_string(),
            user_name: "mallory".to_string(),
        }
        .into();
        assert!(matches!(err, ChatError::Forbidden(_)));
        assert!(!err.to_string().contains("mallory"));
    }

    #[test]
    fn test_conflict_is_retryable() {
        let err: ChatError = RepositoryError::Conflict("stale version".to_string()).into();
        assert!(err.is_retryable());
        assert!(!ChatError::ServiceUnavailable.is_retryable());
    }

    #[test]
    fn test_query_error_maps_to_storage() {
        let err: ChatError = RepositoryError::Query("disk I/O error".to_string()).into();
        assert!(matches!(err, ChatError::Storage(RepositoryError::Query(_))));
    }

    #[test]
    fn test_quota_display() {
        let err = ChatError::QuotaExceeded { used: 120, limit: 100 };
        assert_eq!(err.to_string(), "token quota exceeded: 120 of 100 tokens used");
    }
}
