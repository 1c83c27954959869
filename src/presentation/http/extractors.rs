//! Custom Extractors
//!
//! Axum extractors for authentication.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;

/// Authenticated user placed in the request extensions by `auth_middleware`.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))
    }
}
