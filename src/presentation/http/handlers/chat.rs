//! Chat Handlers
//!
//! Conversation history for the authenticated user.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};

use crate::application::dto::{HistoryQuery, MessageDto};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::{ApiResponse, AppError};
use crate::startup::AppState;

/// GET /api/chat/history?target_id=
///
/// Up to the configured limit of the most recent messages between the caller
/// and `target_id`, newest first.
pub async fn get_history(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<MessageDto>>>, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let items = state
        .history
        .get_history(user.user_id, query.target_id)
        .await?;

    Ok(Json(ApiResponse::success("success", items)))
}
