use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::{
    crypto::token::TokenClass,
    error::{AppError, AuthError},
    state::AppState,
};

/// The identity attached to a request that passed the auth gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: u64,
    pub session_id: Uuid,
}

/// Extracts the bearer token from the `Authorization` header.
///
/// # Arguments
///
/// * `headers` - The request headers.
///
/// # Returns
///
/// The raw token, `MissingToken` if there is no header, or
/// `InvalidTokenFormat` if it is not a `Bearer <token>` value.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = value.to_str().map_err(|_| AuthError::InvalidTokenFormat)?;
    if value.trim().is_empty() {
        return Err(AuthError::MissingToken);
    }

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthError::InvalidTokenFormat)?;
    if !scheme.eq_ignore_ascii_case("Bearer") || token.is_empty() || token.contains(' ') {
        return Err(AuthError::InvalidTokenFormat);
    }

    Ok(token)
}

/// A middleware that requires a valid access token.
///
/// On success the request continues with an [`AuthUser`] extension; on any
/// failure it is answered with 401 before a handler runs.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    tracing::debug!("🔐 Checking authentication...");

    let token = match extract_bearer_token(request.headers()) {
        Ok(token) => token.to_string(),
        Err(e) => {
            tracing::warn!("❌ Rejected request to {}: {}", request.uri().path(), e);
            return AppError::Unauthenticated(e).into_response();
        }
    };

    let validated = match state.sessions.validate(&token, TokenClass::Access).await {
        Ok(validated) => validated,
        Err(e) => return AppError::Unauthenticated(e).into_response(),
    };

    tracing::debug!("✅ User authenticated: {}", validated.user_id());

    request.extensions_mut().insert(AuthUser {
        user_id: validated.user_id(),
        session_id: validated.session_id(),
    });

    next.run(request).await
}
