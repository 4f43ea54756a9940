use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    middleware_layer::{auth::AuthUser, json::JsonBody},
    models::{
        session::{ClientInfo, SessionSummary},
        user::UserProfile,
    },
    state::AppState,
    validation::auth::*,
};

/// The request payload for user registration.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// The request payload for user login.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The request payload for session refresh.
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// The request payload for logout.
#[derive(Deserialize)]
pub struct LogoutRequest {
    pub access_token: String,
}

/// The caller's live sessions.
#[derive(Serialize)]
pub struct SessionsResponse {
    pub current_session_id: Uuid,
    pub sessions: Vec<SessionSummary>,
}

/// The result of ending every session of the caller.
#[derive(Serialize)]
pub struct RevokedResponse {
    pub revoked: usize,
}

/// Handles user registration.
///
/// Creates the account and immediately opens a session for it.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    client: ClientInfo,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<Response> {
    tracing::info!("📝 Register attempt: {}", payload.email);
    validate_name(&payload.name)?;
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;

    let user = state
        .credentials
        .register(payload.name.trim(), &payload.email, &payload.password)
        .await?;

    let session = state.sessions.create(user.id, client).await?;

    tracing::info!("✅ User registered: {}", user.id);
    Ok((StatusCode::CREATED, Json(session.tokens())).into_response())
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Response> {
    tracing::info!("🔐 Login attempt: {}", payload.email);
    validate_email(&payload.email)?;

    let user = state
        .credentials
        .authenticate(&payload.email, &payload.password)
        .await?;

    let session = state.sessions.create(user.id, client).await?;

    tracing::info!("✅ User logged in: {}", user.id);
    Ok((StatusCode::OK, Json(session.tokens())).into_response())
}

/// Exchanges a refresh token for a new token pair.
pub async fn refresh_session(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RefreshRequest>,
) -> Result<Response> {
    let session = state
        .sessions
        .rotate(&payload.refresh_token)
        .await
        .map_err(AppError::BadSessionToken)?;

    Ok((StatusCode::OK, Json(session.tokens())).into_response())
}

/// Ends the session identified by the access token in the body.
pub async fn logout(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LogoutRequest>,
) -> Result<StatusCode> {
    state
        .sessions
        .revoke(&payload.access_token)
        .await
        .map_err(AppError::BadSessionToken)?;

    Ok(StatusCode::OK)
}

/// Returns the authenticated user's profile.
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    let user = state.credentials.find_user(auth.user_id).await?;
    Ok(Json(UserProfile::from(&user)))
}

/// Lists the authenticated user's live sessions.
pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<SessionsResponse>> {
    let sessions = state.sessions.list(auth.user_id).await?;
    Ok(Json(SessionsResponse {
        current_session_id: auth.session_id,
        sessions,
    }))
}

/// Ends every session of the authenticated user, including the current one.
pub async fn logout_all(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<RevokedResponse>> {
    tracing::info!("👋 Logout from all devices for user: {}", auth.user_id);
    let revoked = state.sessions.revoke_all(auth.user_id).await?;
    Ok(Json(RevokedResponse { revoked }))
}
