//! Session read-side HTTP handlers.
//!
//! Endpoints:
//! - GET /api/v1/users/{name}/sessions          - List a user's sessions
//! - GET /api/v1/sessions/{id}?user_name={name} - One session with history

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chatkeep_types::llm::Turn;
use chatkeep_types::session::{ChatSession, SessionSummary, decode_history};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Query parameters for session listing.
#[derive(Debug, Deserialize)]
pub struct SessionListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// Query parameters identifying the caller.
#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_name: String,
}

/// Listing entry: summary plus decoded history length.
#[derive(Debug, Serialize)]
pub struct SessionListItem {
    #[serde(flatten)]
    pub summary: SessionSummary,
    pub history_turns: usize,
}

impl From<&ChatSession> for SessionListItem {
    fn from(session: &ChatSession) -> Self {
        Self {
            summary: session.summary(),
            history_turns: decode_history(&session.history_json)
                .map(|turns| turns.len())
                .unwrap_or(0),
        }
    }
}

/// A session with its full decoded history.
#[derive(Debug, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub summary: SessionSummary,
    pub history: Vec<Turn>,
}

/// Path of one session, scoped to its owner.
pub fn session_link(session_id: &str, user_name: &str) -> String {
    format!(
        "/api/v1/sessions/{}?user_name={}",
        urlencoding::encode(session_id),
        urlencoding::encode(user_name)
    )
}

/// Path of a user's session listing.
pub fn sessions_link(user_name: &str) -> String {
    format!("/api/v1/users/{}/sessions", urlencoding::encode(user_name))
}

/// GET /api/v1/users/{name}/sessions - List a user's sessions, newest first.
pub async fn list_user_sessions(
    State(state): State<AppState>,
    Path(user_name): Path<String>,
    Query(query): Query<SessionListQuery>,
) -> Result<Json<ApiResponse<Vec<SessionListItem>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let limit = query.limit.clamp(1, 500);
    let sessions = state
        .chat_service
        .list_sessions(&user_name, Some(limit))
        .await?;
    let items: Vec<SessionListItem> = sessions.iter().map(SessionListItem::from).collect();

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(
        ApiResponse::success(items, request_id, elapsed)
            .with_link("self", &sessions_link(&user_name)),
    ))
}

/// GET /api/v1/sessions/{id}?user_name={name} - Fetch one of the caller's sessions.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<ApiResponse<SessionDetail>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let (session, history) = state
        .chat_service
        .session_history(&owner.user_name, &session_id)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(
        ApiResponse::success(
            SessionDetail {
                summary: session.summary(),
                history,
            },
            request_id,
            elapsed,
        )
        .with_link("sessions", &sessions_link(&owner.user_name)),
    ))
}
