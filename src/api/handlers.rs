//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{ChatRequest, ChatResponse, ErrorResponse, SessionResponse, SuccessResponse};
use super::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session lifecycle
        .route("/api/sessions", post(start_session))
        .route(
            "/api/sessions/:id",
            get(get_session).delete(end_session),
        )
        // Inbound messages
        .route("/api/sessions/:id/messages", post(send_message))
        // Outbound messages as SSE
        .route("/api/sessions/:id/stream", get(stream_session))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn start_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let (session_id, messages) = state
        .sessions
        .start(&state.chat)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id,
            messages,
        }),
    ))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let entry = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| session_not_found(&id))?;

    Ok(Json(SessionResponse {
        session_id: id,
        messages: entry.channel.transcript(),
    }))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if state.sessions.end(&id).await {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(session_not_found(&id))
    }
}

// ============================================================
// Messages
// ============================================================

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("Message text is empty".to_string()));
    }

    let entry = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| session_not_found(&id))?;

    // One message at a time per session
    let mut session = entry.session.lock().await;
    entry.channel.record_inbound(&req.text);
    let reply = state.chat.on_message(&mut session, &req.text).await;

    Ok(Json(ChatResponse { reply }))
}

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| session_not_found(&id))?;

    let (transcript, broadcast_rx) = entry.channel.subscribe();
    Ok(sse_stream(transcript, broadcast_rx))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

fn session_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Session not found: {id}"))
}

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
