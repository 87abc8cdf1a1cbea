//! SessionRepository and SessionTransaction trait definitions.
//!
//! Writes go through an explicit transaction so callers control where the
//! transactional boundary sits (the lifecycle manager opens one for the read
//! phase and a separate one for the write phase, never across a backend call).
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).

use chatkeep_types::error::RepositoryError;
use chatkeep_types::llm::Turn;
use chatkeep_types::session::{ChatSession, User};

/// Repository for users and chat sessions.
///
/// Implementations live in chatkeep-infra (e.g., `SqliteSessionRepository`).
pub trait SessionRepository: Send + Sync {
    /// Transaction handle returned by [`SessionRepository::begin`].
    type Tx: SessionTransaction;

    /// Open a new transaction.
    fn begin(
        &self,
    ) -> impl std::future::Future<Output = Result<Self::Tx, RepositoryError>> + Send;

    /// List all users, ordered by name.
    fn list_users(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<User>, RepositoryError>> + Send;

    /// List sessions, most recently active first. `None` lists every user's sessions.
    fn list_sessions(
        &self,
        user_name: Option<&str>,
        limit: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<ChatSession>, RepositoryError>> + Send;

    /// Fetch a session by id without any ownership check.
    fn find_session(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<ChatSession>, RepositoryError>> + Send;

    /// Delete a user and, by cascade, all of their sessions.
    fn delete_user(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}

/// Unit of work over the session store.
///
/// Dropping a transaction without calling [`commit`](Self::commit) discards
/// its changes.
pub trait SessionTransaction: Send {
    /// Return the named user, inserting it first if needed. Idempotent.
    fn get_or_create_user(
        &mut self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<User, RepositoryError>> + Send;

    /// Look up a session.
    ///
    /// - With `session_id`: the session with that id. Fails with
    ///   `NotFound` if absent, or `Forbidden` if `user_name` is given and
    ///   does not own it.
    /// - With only `user_name`: that user's most recently active session,
    ///   or `None`.
    /// - With neither: `None`.
    fn get_session(
        &mut self,
        session_id: Option<&str>,
        user_name: Option<&str>,
    ) -> impl std::future::Future<Output = Result<Option<ChatSession>, RepositoryError>> + Send;

    /// Create an empty session for `user_name`, creating the user if needed.
    ///
    /// A fresh id is minted when `session_id` is `None`. An id that is
    /// already taken fails with `Conflict`.
    fn create_session(
        &mut self,
        user_name: &str,
        session_id: Option<&str>,
    ) -> impl std::future::Future<Output = Result<ChatSession, RepositoryError>> + Send;

    /// Replace the session's history and refresh `last_active`.
    ///
    /// The token count is set to exactly `token_usage` when
    /// `reset_token_count` is true, otherwise incremented by it in the
    /// store. The write only applies if the stored version still equals
    /// `session.version`; otherwise it fails with `Conflict`. On success the
    /// in-memory session reflects the stored row (new version, token count).
    fn update_session(
        &mut self,
        session: &mut ChatSession,
        history: &[Turn],
        token_usage: u64,
        reset_token_count: bool,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn commit(self) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn rollback(self) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
