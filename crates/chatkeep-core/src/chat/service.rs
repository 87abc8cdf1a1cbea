//! Chat service orchestrating the session lifecycle around a backend call.
//!
//! A chat turn runs in three strictly ordered phases:
//!
//! 1. **Read** (own transaction): resolve the session, apply expiry and quota.
//! 2. **Backend call**: no transaction or connection is held.
//! 3. **Write** (own transaction): create the session if needed, then apply a
//!    version-checked update.
//!
//! A version conflict or duplicate create in phase 3 restarts the whole turn
//! from phase 1, up to `ChatConfig::max_attempts` times.

use std::time::Duration;

use chatkeep_types::config::ChatConfig;
use chatkeep_types::error::ChatError;
use chatkeep_types::llm::{ChatReply, Turn};
use chatkeep_types::session::{ChatSession, User};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::chat::history::load_history;
use crate::chat::repository::{SessionRepository, SessionTransaction};
use crate::llm::backend::ChatBackend;

/// Result of a successful chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOutcome {
    pub response: String,
    /// Session the turn was stored in; clients pin it on later calls.
    pub session_id: String,
}

/// What the write phase should do with the resolved session.
#[derive(Debug, Clone, PartialEq)]
enum SessionPlan {
    /// No usable session: create one.
    Fresh,
    /// Active session: continue its history, add to its token count.
    Continue(ChatSession),
    /// Expired session pinned by id: keep the id, restart history and tokens.
    Reset(ChatSession),
}

/// Session lifecycle manager.
///
/// Generic over `SessionRepository` and `ChatBackend` to keep
/// chatkeep-core independent of chatkeep-infra.
pub struct ChatService<R: SessionRepository, B: ChatBackend> {
    repo: R,
    backend: B,
    config: ChatConfig,
}

impl<R: SessionRepository, B: ChatBackend> ChatService<R, B> {
    pub fn new(repo: R, backend: B, config: ChatConfig) -> Self {
        Self {
            repo,
            backend,
            config,
        }
    }

    /// Access the session repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Access the chat backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    // --- Stateless generation ---

    /// One-off generation that bypasses session state entirely.
    pub async fn generate_content(&self, prompt: &str) -> Result<String, ChatError> {
        self.validate_prompt(prompt)?;
        debug!(backend = self.backend.name(), chars = prompt.chars().count(), "Generating content");

        self.backend.generate(prompt).await.map_err(|e| {
            error!(backend = self.backend.name(), error = %e, "Backend generation failed");
            ChatError::ServiceUnavailable
        })
    }

    // --- Session chat ---

    /// Run one chat turn for `user_name`.
    ///
    /// Without `session_id` the user's most recent session is continued (or
    /// a new one started). With `session_id` that exact session is used and
    /// must belong to `user_name`.
    pub async fn chat(
        &self,
        user_name: &str,
        prompt: &str,
        session_id: Option<&str>,
    ) -> Result<ChatOutcome, ChatError> {
        validate_user_name(user_name)?;
        self.validate_prompt(prompt)?;

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.chat_turn(user_name, prompt, session_id).await {
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(
                        user = %user_name,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Chat turn hit a write conflict, retrying from a fresh read"
                    );
                    tokio::time::sleep(Duration::from_millis(self.config.retry_backoff_ms)).await;
                    attempt += 1;
                }
                Err(e) if e.is_retryable() => {
                    error!(user = %user_name, attempts = attempt, error = %e, "Chat turn retries exhausted");
                    return Err(e);
                }
                result => return result,
            }
        }
    }

    /// Load a session and its decoded history on behalf of `user_name`.
    pub async fn session_history(
        &self,
        user_name: &str,
        session_id: &str,
    ) -> Result<(ChatSession, Vec<Turn>), ChatError> {
        validate_user_name(user_name)?;

        let mut tx = self.repo.begin().await?;
        let found = match tx.get_session(Some(session_id), Some(user_name)).await {
            Ok(found) => found,
            Err(e) => {
                rollback_quietly(tx).await;
                return Err(e.into());
            }
        };
        tx.commit().await?;

        let session =
            found.ok_or_else(|| ChatError::NotFound(format!("session '{session_id}'")))?;
        // Full history, not the truncated model context.
        let history = load_history(&session.history_json, usize::MAX);
        Ok((session, history))
    }

    /// List a user's sessions, most recent first.
    pub async fn list_sessions(
        &self,
        user_name: &str,
        limit: Option<i64>,
    ) -> Result<Vec<ChatSession>, ChatError> {
        validate_user_name(user_name)?;
        Ok(self.repo.list_sessions(Some(user_name), limit).await?)
    }

    /// List all known users.
    pub async fn list_users(&self) -> Result<Vec<User>, ChatError> {
        Ok(self.repo.list_users().await?)
    }

    // --- Turn phases ---

    async fn chat_turn(
        &self,
        user_name: &str,
        prompt: &str,
        session_id: Option<&str>,
    ) -> Result<ChatOutcome, ChatError> {
        let plan = self.resolve(user_name, session_id).await?;

        let history = match &plan {
            SessionPlan::Continue(session) => {
                load_history(&session.history_json, self.config.max_history_length)
            }
            SessionPlan::Fresh | SessionPlan::Reset(_) => Vec::new(),
        };

        debug!(
            user = %user_name,
            backend = self.backend.name(),
            history_turns = history.len(),
            "Calling chat backend"
        );
        let reply = self.backend.chat(&history, prompt).await.map_err(|e| {
            error!(user = %user_name, backend = self.backend.name(), error = %e, "Chat backend failed");
            ChatError::ServiceUnavailable
        })?;

        let session_id = self.persist(user_name, session_id, plan, &reply).await?;

        Ok(ChatOutcome {
            response: reply.text,
            session_id,
        })
    }

    /// Read phase: look the session up and decide what to do with it.
    async fn resolve(
        &self,
        user_name: &str,
        session_id: Option<&str>,
    ) -> Result<SessionPlan, ChatError> {
        let mut tx = self.repo.begin().await?;
        let found = match tx.get_session(session_id, Some(user_name)).await {
            Ok(found) => found,
            Err(e) => {
                rollback_quietly(tx).await;
                return Err(e.into());
            }
        };
        tx.commit().await?;

        self.plan(found, session_id.is_some(), Utc::now())
    }

    /// Apply expiry and quota rules to a looked-up session.
    fn plan(
        &self,
        found: Option<ChatSession>,
        pinned: bool,
        now: DateTime<Utc>,
    ) -> Result<SessionPlan, ChatError> {
        let Some(session) = found else {
            return Ok(SessionPlan::Fresh);
        };

        if session.is_expired(now, self.config.session_timeout_secs) {
            if pinned {
                info!(
                    session_id = %session.session_id,
                    idle_secs = session.idle_secs(now),
                    "Pinned session expired, resetting its history and tokens"
                );
                return Ok(SessionPlan::Reset(session));
            }
            info!(
                session_id = %session.session_id,
                user = %session.user_name,
                "Session expired, starting a new one"
            );
            return Ok(SessionPlan::Fresh);
        }

        if session.token_count >= self.config.max_tokens_per_session {
            warn!(
                session_id = %session.session_id,
                used = session.token_count,
                limit = self.config.max_tokens_per_session,
                "Session token quota exhausted"
            );
            return Err(ChatError::QuotaExceeded {
                used: session.token_count,
                limit: self.config.max_tokens_per_session,
            });
        }

        Ok(SessionPlan::Continue(session))
    }

    /// Write phase: store the backend's history under a version check.
    async fn persist(
        &self,
        user_name: &str,
        session_id: Option<&str>,
        plan: SessionPlan,
        reply: &ChatReply,
    ) -> Result<String, ChatError> {
        let mut tx = self.repo.begin().await?;
        match write_turn(&mut tx, user_name, session_id, plan, reply).await {
            Ok(session) => {
                tx.commit().await?;
                debug!(
                    session_id = %session.session_id,
                    tokens = session.token_count,
                    version = session.version,
                    "Chat turn committed"
                );
                Ok(session.session_id)
            }
            Err(e) => {
                rollback_quietly(tx).await;
                Err(e.into())
            }
        }
    }

    fn validate_prompt(&self, prompt: &str) -> Result<(), ChatError> {
        if prompt.trim().is_empty() {
            return Err(ChatError::Validation("prompt must not be empty".to_string()));
        }
        let chars = prompt.chars().count();
        if chars > self.config.max_prompt_chars {
            return Err(ChatError::Validation(format!(
                "prompt is {chars} characters, the maximum is {}",
                self.config.max_prompt_chars
            )));
        }
        Ok(())
    }
}

async fn write_turn<T: SessionTransaction>(
    tx: &mut T,
    user_name: &str,
    session_id: Option<&str>,
    plan: SessionPlan,
    reply: &ChatReply,
) -> Result<ChatSession, chatkeep_types::error::RepositoryError> {
    let (mut session, reset) = match plan {
        SessionPlan::Continue(session) => (session, false),
        SessionPlan::Reset(session) => (session, true),
        SessionPlan::Fresh => (tx.create_session(user_name, session_id).await?, false),
    };

    tx.update_session(&mut session, &reply.history, reply.tokens_used(), reset)
        .await?;
    Ok(session)
}

async fn rollback_quietly<T: SessionTransaction>(tx: T) {
    if let Err(e) = tx.rollback().await {
        warn!(error = %e, "Transaction rollback failed");
    }
}

fn validate_user_name(user_name: &str) -> Result<(), ChatError> {
    if user_name.trim().is_empty() {
        return Err(ChatError::Validation("user name must not be empty".to_string()));
    }
    Ok(())
}
