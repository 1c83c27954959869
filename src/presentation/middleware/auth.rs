//! Authentication Middleware
//!
//! JWT validation middleware for protected routes.
//!
//! Tokens are issued elsewhere; this service only verifies them. Browsers
//! cannot set headers on a WebSocket handshake, so a `?token=` query parameter
//! is accepted when there is no `Authorization` header.

use axum::{
    extract::{Query, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;
use crate::startup::AppState;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub user_id: u64,
    pub username: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Authenticated user extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .or_else(|| query_token(&request))
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;

    let user = verify_token(&token, &state.settings.jwt.secret)?;
    tracing::debug!(user_id = user.user_id, "Request authenticated");

    // Insert authenticated user into request extensions
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Decode and validate an HS256 token.
pub fn verify_token(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::Unauthorized("Token expired".into()),
        _ => AppError::Unauthorized("Invalid token".into()),
    })?;

    Ok(AuthUser {
        user_id: token_data.claims.user_id,
        username: token_data.claims.username,
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|Authorization(bearer)| bearer.token().to_string())
}

fn query_token(request: &Request) -> Option<String> {
    Query::<TokenQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(query)| query.token)
        .filter(|token| !token.is_empty())
}
