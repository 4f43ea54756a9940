use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a user session as persisted in the session store.
///
/// A session is keyed by `(user_id, session_id)`. Rotation replaces the
/// token pair in place; `session_id` never changes for the lifetime of the
/// record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The ID of the user this session belongs to.
    pub user_id: u64,
    /// The random session identifier shared by both tokens.
    pub session_id: Uuid,
    /// The `User-Agent` seen when the session was created.
    pub device_info: String,
    /// The client IP address seen when the session was created.
    pub ip_address: String,
    /// The currently valid access token.
    pub access_token: String,
    /// The currently valid refresh token.
    pub refresh_token: String,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the session expires (the refresh token's expiry).
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// The token pair handed back to the client.
    pub fn tokens(&self) -> TokenPair {
        TokenPair {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }

    /// Session metadata safe to show to its owner.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id,
            device_info: self.device_info.clone(),
            ip_address: self.ip_address.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

/// The access/refresh pair returned by login, registration and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// A session listing entry. Never carries token values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub device_info: String,
    pub ip_address: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Descriptive client metadata captured when a session is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub device_info: String,
    pub ip_address: String,
}
