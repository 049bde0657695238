//! Admin and debug HTTP routes
//!
//! Read-only views of the tracker plus manual clears, for operators and tests.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use typing_common::{AppError, ErrorResponse};
use typing_core::{ConversationId, IdParseError, TypingIndicator};

use super::GatewayState;

/// HTTP wrapper for `AppError`
#[derive(Debug)]
pub struct AdminError(pub AppError);

impl From<AppError> for AdminError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<IdParseError> for AdminError {
    fn from(err: IdParseError) -> Self {
        Self(AppError::from(err))
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Log server errors
        if status.is_server_error() {
            tracing::error!(error = ?self.0, "Server error occurred");
        }

        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

/// Result type for admin handlers
pub type AdminResult<T> = Result<T, AdminError>;

/// Runtime counters
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub connections: usize,
    pub observers: usize,
    pub conversations: usize,
}

/// Health check endpoint
///
/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}

/// Indicators of one conversation
///
/// GET /conversations/:conversation_id/typing
pub async fn list_typing(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
) -> AdminResult<Json<Vec<TypingIndicator>>> {
    let conversation_id = ConversationId::parse(&conversation_id)?;
    Ok(Json(state.tracker().list(conversation_id)))
}

/// Clear one conversation
///
/// DELETE /conversations/:conversation_id/typing
pub async fn clear_conversation(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
) -> AdminResult<StatusCode> {
    let conversation_id = ConversationId::parse(&conversation_id)?;
    let removed = state.tracker().clear_conversation(conversation_id.clone());

    tracing::info!(
        conversation_id = %conversation_id,
        removed,
        "Conversation cleared via admin route"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Clear every conversation
///
/// DELETE /typing
pub async fn clear_all(State(state): State<GatewayState>) -> StatusCode {
    let removed = state.tracker().clear_all();
    tracing::info!(removed, "All typing indicators cleared via admin route");
    StatusCode::NO_CONTENT
}

/// Runtime counters
///
/// GET /stats
pub async fn stats(State(state): State<GatewayState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        connections: state.connection_manager().connection_count(),
        observers: state.tracker().observer_count(),
        conversations: state.tracker().snapshot().conversation_count(),
    })
}
