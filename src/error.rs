use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failures of the session subsystem.
///
/// `ExpiredOrInvalidToken` deliberately covers bad signatures, foreign
/// algorithms, malformed tokens and elapsed expiry alike.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token format")]
    InvalidTokenFormat,

    #[error("Invalid or expired token")]
    ExpiredOrInvalidToken,

    /// Well formed and unexpired, but no longer the session's current token.
    #[error("Token has been superseded")]
    StaleToken,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// A session was about to be stored with no remaining lifetime.
    #[error("Session expiry must lie in the future")]
    InvalidExpiry,

    #[error("Session store unavailable")]
    StoreUnavailable,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl AuthError {
    /// The error code exposed to clients.
    ///
    /// `StaleToken` is reported under the same code as a forged or expired
    /// token.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "MissingToken",
            AuthError::InvalidTokenFormat => "InvalidTokenFormat",
            AuthError::ExpiredOrInvalidToken | AuthError::StaleToken => "ExpiredOrInvalidToken",
            AuthError::SessionNotFound => "SessionNotFound",
            AuthError::InvalidCredentials => "InvalidCredentials",
            AuthError::StoreUnavailable => "Unauthorized",
            AuthError::InvalidExpiry | AuthError::Signing(_) => "InternalError",
        }
    }

    /// The message exposed to clients.
    fn public_message(&self) -> String {
        match self {
            AuthError::StaleToken => AuthError::ExpiredOrInvalidToken.to_string(),
            AuthError::StoreUnavailable => "Unauthorized".to_string(),
            AuthError::InvalidExpiry | AuthError::Signing(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Errors returned by session store backends.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session not found")]
    NotFound,

    #[error("Session TTL must be positive")]
    InvalidExpiry,

    #[error("Redis error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("Corrupt session record: {0}")]
    Corrupt(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AuthError::SessionNotFound,
            StoreError::InvalidExpiry => AuthError::InvalidExpiry,
            StoreError::Backend(e) => {
                tracing::error!("❌ Session store backend error: {}", e);
                AuthError::StoreUnavailable
            }
            StoreError::Corrupt(msg) => {
                tracing::error!("❌ Corrupt session record: {}", msg);
                AuthError::StoreUnavailable
            }
        }
    }
}

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A pool construction error.
    #[error("Pool creation error: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    /// The request could not be authenticated.
    #[error("Authentication failed: {0}")]
    Unauthenticated(#[from] AuthError),

    /// A token submitted in a request body was rejected.
    #[error("Bad session token: {0}")]
    BadSessionToken(AuthError),

    /// A user with the same email already exists.
    #[error("User already exists")]
    UserExists,

    /// A resource not found error.
    #[error("Resource not found")]
    NotFound,

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A row was missing an expected column.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// The HTTP status code and client-facing error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Unauthenticated(e) => (auth_status(e, StatusCode::UNAUTHORIZED), e.code()),
            AppError::BadSessionToken(e) => (auth_status(e, StatusCode::BAD_REQUEST), e.code()),
            AppError::UserExists => (StatusCode::CONFLICT, "UserExists"),
            AppError::NotFound => (StatusCode::NOT_FOUND, "NotFound"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationFailed"),
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::CreatePool(_)
            | AppError::MissingData(_)
            | AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        }
    }
}

/// Store outages fail closed as 401; configuration faults are 500.
fn auth_status(err: &AuthError, default: StatusCode) -> StatusCode {
    match err {
        AuthError::StoreUnavailable => StatusCode::UNAUTHORIZED,
        AuthError::InvalidExpiry | AuthError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => default,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }

            AppError::Pool(ref e) => {
                tracing::error!("Pool error: {}", e);
                "Database error".to_string()
            }

            AppError::CreatePool(ref e) => {
                tracing::error!("Pool creation error: {}", e);
                "Database error".to_string()
            }

            AppError::Unauthenticated(ref e) | AppError::BadSessionToken(ref e) => {
                match e {
                    AuthError::InvalidExpiry | AuthError::Signing(_) => {
                        tracing::error!("Session subsystem fault: {}", e)
                    }
                    _ => tracing::warn!("Authentication rejected: {:?}", e),
                }
                e.public_message()
            }

            AppError::UserExists => {
                tracing::debug!("User already exists");
                "User already exists".to_string()
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                "Resource not found".to_string()
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                msg.clone()
            }

            AppError::MissingData(ref column) => {
                tracing::error!("Missing column in row: {}", column);
                "Internal server error".to_string()
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message,
            "code": code,
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (
            status,
            [(http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_token_is_reported_as_invalid() {
        assert_eq!(AuthError::StaleToken.code(), AuthError::ExpiredOrInvalidToken.code());
        assert_eq!(
            AuthError::StaleToken.public_message(),
            AuthError::ExpiredOrInvalidToken.public_message()
        );
    }

    #[test]
    fn gate_errors_are_unauthorized() {
        let (status, code) = AppError::Unauthenticated(AuthError::MissingToken).status_and_code();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(code, "MissingToken");
    }

    #[test]
    fn body_token_errors_are_bad_requests() {
        let (status, code) =
            AppError::BadSessionToken(AuthError::SessionNotFound).status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "SessionNotFound");
    }

    #[test]
    fn store_outage_fails_closed() {
        let (status, _) = AppError::BadSessionToken(AuthError::StoreUnavailable).status_and_code();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
