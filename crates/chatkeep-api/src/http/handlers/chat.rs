//! Chat and generation HTTP handlers.
//!
//! Endpoints:
//! - POST /api/v1/generate  - One-off generation, no session
//! - POST /api/v1/chat      - Session chat, JSON envelope
//! - POST /api/v1/chat/text - Session chat, plain text body

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::http::error::AppError;
use crate::http::handlers::session::session_link;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Header carrying the session id on plain-text chat responses.
pub const SESSION_ID_HEADER: HeaderName = HeaderName::from_static("x-session-id");

/// Request body for POST /api/v1/generate.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub response: String,
}

/// Request body for POST /api/v1/chat and /api/v1/chat/text.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_name: String,
    pub prompt: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub response: String,
    /// The response split into display lines.
    pub lines: Vec<String>,
    pub session_id: String,
}

impl ChatResponse {
    fn new(response: String, session_id: String) -> Self {
        let lines = response.lines().map(str::to_string).collect();
        Self {
            response,
            lines,
            session_id,
        }
    }
}

/// POST /api/v1/generate - Stateless generation.
pub async fn generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<ApiResponse<GenerateResponse>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let response = state.chat_service.generate_content(&body.prompt).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        GenerateResponse { response },
        request_id,
        elapsed,
    )))
}

/// POST /api/v1/chat - One chat turn in the caller's session.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatResponse>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    tracing::debug!(
        request_id = %request_id,
        user = %body.user_name,
        pinned = body.session_id.is_some(),
        "Chat request"
    );

    let outcome = state
        .chat_service
        .chat(&body.user_name, &body.prompt, body.session_id.as_deref())
        .await?;

    let link = session_link(&outcome.session_id, &body.user_name);
    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(
        ApiResponse::success(
            ChatResponse::new(outcome.response, outcome.session_id),
            request_id,
            elapsed,
        )
        .with_link("session", &link),
    ))
}

/// POST /api/v1/chat/text - Chat turn answered as `text/plain`.
///
/// The session id travels in the `x-session-id` response header.
pub async fn chat_text(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let outcome = state
        .chat_service
        .chat(&body.user_name, &body.prompt, body.session_id.as_deref())
        .await?;

    let session_header = HeaderValue::from_str(&outcome.session_id)
        .map_err(|e| AppError::Internal(format!("invalid session id header: {e}")))?;

    Ok((
        [
            (
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (SESSION_ID_HEADER, session_header),
        ],
        outcome.response,
    )
        .into_response())
}
