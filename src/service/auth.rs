//! Bearer-token check for the crawl and task routes

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};

use crate::service::{AppState, ServiceError};

/// Hex SHA-256 of a token; tokens are compared by digest
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Extracts the token from an `Authorization: Bearer <token>` value
pub fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Rejects requests without the configured bearer token
///
/// Passes everything through when the service runs without a token.
pub async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.token_digest.as_deref() else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_bearer);

    match presented {
        Some(token) if token_digest(token) == expected => next.run(request).await,
        _ => {
            tracing::warn!("Rejected unauthenticated request to {}", request.uri().path());
            ServiceError::Unauthorized.into_response()
        }
    }
}
