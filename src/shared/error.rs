//! Application Error Types
//!
//! Centralized error handling with Axum integration, plus the narrower error
//! types of the storage, cache and broker seams. Only `AppError` ever reaches a
//! client; the others stay inside the pipeline and end up in logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Durable store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("User id {0} does not fit the store's id column")]
    IdOutOfRange(u64),

    #[error("Stored row is invalid: {0}")]
    InvalidRow(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Cache failures. Always non-fatal for callers.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache value is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Cache operation timed out")]
    Timeout,

    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Broker failures on publish, poll or acknowledge.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    #[error("Broker unavailable: {0}")]
    Unavailable(String),
}

/// Response envelope shared by every HTTP endpoint: `{code, msg, data}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(msg: impl Into<String>, data: T) -> Self {
        Self {
            code: 0,
            msg: msg.into(),
            data: Some(data),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Store(e) => {
                tracing::error!("Store error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
            }
        };

        let body = ApiResponse::<()> {
            code: status.as_u16() as i32,
            msg,
            data: None,
        };

        (status, Json(body)).into_response()
    }
}
