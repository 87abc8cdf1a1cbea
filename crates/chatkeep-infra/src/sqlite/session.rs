//! SQLite session repository implementation.
//!
//! Implements `SessionRepository` and `SessionTransaction` from
//! `chatkeep-core`. Transactions run on the single-connection writer pool;
//! listings use the reader pool. Session writes are version-checked in a
//! single UPDATE so the store itself decides whether a copy is stale.

use chatkeep_core::chat::repository::{SessionRepository, SessionTransaction};
use chatkeep_types::error::RepositoryError;
use chatkeep_types::llm::Turn;
use chatkeep_types::session::{ChatSession, User, encode_history, new_session_id};
use chrono::{DateTime, Utc};
use sqlx::{Row, Sqlite, Transaction};

use super::pool::DatabasePool;

const SESSION_COLUMNS: &str =
    "session_id, user_name, history_json, last_active, token_count, version";

/// SQLite-backed implementation of `SessionRepository`.
#[derive(Clone)]
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// An open write transaction over the session store.
pub struct SqliteSessionTx {
    tx: Transaction<'static, Sqlite>,
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ChatSessionRow {
    session_id: String,
    user_name: String,
    history_json: String,
    last_active: f64,
    token_count: i64,
    version: i64,
}

impl ChatSessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            session_id: row.try_get("session_id")?,
            user_name: row.try_get("user_name")?,
            history_json: row.try_get("history_json")?,
            last_active: row.try_get("last_active")?,
            token_count: row.try_get("token_count")?,
            version: row.try_get("version")?,
        })
    }

    fn into_session(self) -> Result<ChatSession, RepositoryError> {
        Ok(ChatSession {
            last_active: from_epoch_secs(self.last_active)?,
            token_count: to_token_count(self.token_count)?,
            session_id: self.session_id,
            user_name: self.user_name,
            history_json: self.history_json,
            version: self.version,
        })
    }
}

fn map_session(row: &sqlx::sqlite::SqliteRow) -> Result<ChatSession, RepositoryError> {
    ChatSessionRow::from_row(row)
        .map_err(|e| RepositoryError::Query(e.to_string()))?
        .into_session()
}

fn to_epoch_secs(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_micros() as f64 / 1_000_000.0
}

fn from_epoch_secs(secs: f64) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::from_timestamp_micros((secs * 1_000_000.0).round() as i64)
        .ok_or_else(|| RepositoryError::Query(format!("invalid last_active: {secs}")))
}

fn to_token_count(raw: i64) -> Result<u64, RepositoryError> {
    u64::try_from(raw).map_err(|_| RepositoryError::Query(format!("invalid token_count: {raw}")))
}

fn to_db_tokens(tokens: u64) -> Result<i64, RepositoryError> {
    i64::try_from(tokens)
        .map_err(|_| RepositoryError::Query(format!("token count out of range: {tokens}")))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.message().contains("UNIQUE"))
}

impl SessionRepository for SqliteSessionRepository {
    type Tx = SqliteSessionTx;

    async fn begin(&self) -> Result<SqliteSessionTx, RepositoryError> {
        let tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(SqliteSessionTx { tx })
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query("SELECT name FROM users ORDER BY name")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                Ok(User {
                    name: row
                        .try_get("name")
                        .map_err(|e| RepositoryError::Query(e.to_string()))?,
                })
            })
            .collect()
    }

    async fn list_sessions(
        &self,
        user_name: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<ChatSession>, RepositoryError> {
        // A negative LIMIT means no limit in SQLite.
        let limit = limit.unwrap_or(-1);
        let rows = match user_name {
            Some(user) => {
                sqlx::query(&format!(
                    "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE user_name = ? \
                     ORDER BY last_active DESC LIMIT ?"
                ))
                .bind(user)
                .bind(limit)
                .fetch_all(&self.pool.reader)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {SESSION_COLUMNS} FROM chat_sessions \
                     ORDER BY last_active DESC LIMIT ?"
                ))
                .bind(limit)
                .fetch_all(&self.pool.reader)
                .await
            }
        }
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(map_session).collect()
    }

    async fn find_session(&self, session_id: &str) -> Result<Option<ChatSession>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE session_id = ?"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(map_session).transpose()
    }

    async fn delete_user(&self, name: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE name = ?")
            .bind(name)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("user '{name}'")));
        }
        tracing::info!(user = %name, "Deleted user and their sessions");
        Ok(())
    }
}

impl SessionTransaction for SqliteSessionTx {
    async fn get_or_create_user(&mut self, name: &str) -> Result<User, RepositoryError> {
        let inserted = sqlx::query("INSERT INTO users (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if inserted.rows_affected() > 0 {
            tracing::info!(user = %name, "Created user");
        }

        let row = sqlx::query("SELECT name FROM users WHERE name = ?")
            .bind(name)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(User {
            name: row
                .try_get("name")
                .map_err(|e| RepositoryError::Query(e.to_string()))?,
        })
    }

    async fn get_session(
        &mut self,
        session_id: Option<&str>,
        user_name: Option<&str>,
    ) -> Result<Option<ChatSession>, RepositoryError> {
        match (session_id, user_name) {
            (Some(id), _) => {
                let row = sqlx::query(&format!(
                    "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE session_id = ?"
                ))
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

                let session = row
                    .as_ref()
                    .map(map_session)
                    .transpose()?
                    .ok_or_else(|| RepositoryError::NotFound(format!("session '{id}'")))?;

                if let Some(user) = user_name {
                    if session.user_name != user {
                        tracing::warn!(
                            session_id = %id,
                            user = %user,
                            "Rejected access to another user's session"
                        );
                        return Err(RepositoryError::Forbidden {
                            session_id: id.to_string(),
                            user_name: user.to_string(),
                        });
                    }
                }
                Ok(Some(session))
            }
            (None, Some(user)) => {
                let row = sqlx::query(&format!(
                    "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE user_name = ? \
                     ORDER BY last_active DESC LIMIT 1"
                ))
                .bind(user)
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

                row.as_ref().map(map_session).transpose()
            }
            (None, None) => Ok(None),
        }
    }

    async fn create_session(
        &mut self,
        user_name: &str,
        session_id: Option<&str>,
    ) -> Result<ChatSession, RepositoryError> {
        self.get_or_create_user(user_name).await?;

        let session = ChatSession {
            session_id: session_id.map(str::to_string).unwrap_or_else(new_session_id),
            user_name: user_name.to_string(),
            history_json: "[]".to_string(),
            last_active: Utc::now(),
            token_count: 0,
            version: 1,
        };

        sqlx::query(
            "INSERT INTO chat_sessions \
             (session_id, user_name, history_json, last_active, token_count, version) \
             VALUES (?, ?, ?, ?, 0, 1)",
        )
        .bind(&session.session_id)
        .bind(&session.user_name)
        .bind(&session.history_json)
        .bind(to_epoch_secs(session.last_active))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::Conflict(format!(
                    "session '{}' already exists",
                    session.session_id
                ))
            } else {
                RepositoryError::Query(e.to_string())
            }
        })?;

        tracing::info!(session_id = %session.session_id, user = %user_name, "Created session");
        Ok(session)
    }

    async fn update_session(
        &mut self,
        session: &mut ChatSession,
        history: &[Turn],
        token_usage: u64,
        reset_token_count: bool,
    ) -> Result<(), RepositoryError> {
        let history_json =
            encode_history(history).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let last_active = Utc::now();

        let sql = if reset_token_count {
            "UPDATE chat_sessions \
             SET history_json = ?, last_active = ?, token_count = ?, version = version + 1 \
             WHERE session_id = ? AND version = ? \
             RETURNING token_count, version"
        } else {
            "UPDATE chat_sessions \
             SET history_json = ?, last_active = ?, token_count = token_count + ?, \
                 version = version + 1 \
             WHERE session_id = ? AND version = ? \
             RETURNING token_count, version"
        };

        let row = sqlx::query(sql)
            .bind(&history_json)
            .bind(to_epoch_secs(last_active))
            .bind(to_db_tokens(token_usage)?)
            .bind(&session.session_id)
            .bind(session.version)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?
            .ok_or_else(|| {
                RepositoryError::Conflict(format!(
                    "session '{}' was modified concurrently (expected version {})",
                    session.session_id, session.version
                ))
            })?;

        let token_count: i64 = row
            .try_get("token_count")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let version: i64 = row
            .try_get("version")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        session.history_json = history_json;
        session.last_active = last_active;
        session.token_count = to_token_count(token_count)?;
        session.version = version;

        tracing::debug!(
            session_id = %session.session_id,
            tokens = session.token_count,
            version,
            reset = reset_token_count,
            "Updated session"
        );
        Ok(())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx
            .commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))
    }
}
