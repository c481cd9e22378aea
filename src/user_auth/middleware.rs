//! Bearer-token authentication for private routes

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};

use crate::gateway::{
    state::AppState,
    types::{ApiError, error_codes},
};

/// Token from `Authorization: Bearer <token>`. The scheme is case-insensitive.
fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::UNAUTHORIZED,
                error_codes::MISSING_AUTH,
                "authorization header is not provided",
            )
        })?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
            Ok(token.trim())
        }
        Some((scheme, _)) => Err(ApiError::unauthorized(format!(
            "unsupported authorization type {}",
            scheme
        ))),
        None => Err(ApiError::unauthorized("invalid authorization header format")),
    }
}

/// Reject requests without a valid access token; otherwise make the
/// token's [`Claims`](super::Claims) available as a request extension.
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = {
        let token = bearer_token(request.headers())?;
        state.users.verify_token(token).map_err(|e| {
            tracing::debug!(error = %e, path = %request.uri().path(), "Rejected access token");
            ApiError::unauthorized("invalid or expired token")
        })?
    };

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
