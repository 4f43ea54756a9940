//! Session lifecycle: creation, validation, rotation and revocation.
//!
//! The manager is the only writer of session records. Tokens carry their own
//! expiry, so clearly dead tokens are rejected without touching the store; the
//! store is still consulted on every validation because only the store knows
//! about logouts and rotations.

use std::sync::Arc;

use chrono::{Duration, Utc};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::{
    crypto::token::{Claims, IssuedToken, TokenClass, TokenCodec, fingerprint},
    error::AuthError,
    models::session::{ClientInfo, Session, SessionSummary},
    repositories::session::SessionStore,
};

/// Lifetimes of the two token classes.
#[derive(Debug, Clone, Copy)]
pub struct SessionTtls {
    pub access: Duration,
    pub refresh: Duration,
}

/// The outcome of a successful validation.
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub claims: Claims,
    pub session: Session,
}

impl ValidatedSession {
    pub fn user_id(&self) -> u64 {
        self.session.user_id
    }

    pub fn session_id(&self) -> Uuid {
        self.session.session_id
    }
}

/// Orchestrates session state transitions over a [`SessionStore`].
#[derive(Clone)]
pub struct SessionManager {
    codec: TokenCodec,
    store: Arc<dyn SessionStore>,
    ttls: SessionTtls,
}

impl SessionManager {
    /// Creates a new `SessionManager`.
    pub fn new(codec: TokenCodec, store: Arc<dyn SessionStore>, ttls: SessionTtls) -> Self {
        Self { codec, store, ttls }
    }

    /// Starts a new session for an authenticated user.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The owner of the session.
    /// * `client` - Device and address metadata recorded with the session.
    ///
    /// # Returns
    ///
    /// The stored `Session`, including its token pair.
    pub async fn create(&self, user_id: u64, client: ClientInfo) -> Result<Session, AuthError> {
        let session_id = Uuid::new_v4();
        let (access, refresh) = self.issue_pair(user_id, session_id)?;
        let now = Utc::now();

        let session = Session {
            user_id,
            session_id,
            device_info: client.device_info,
            ip_address: client.ip_address,
            access_token: access.token,
            refresh_token: refresh.token,
            created_at: now,
            expires_at: refresh.expires_at,
        };

        self.persist(&session).await?;
        tracing::info!("✅ Session created: user={} session={}", user_id, session_id);
        Ok(session)
    }

    /// Checks that `token` is a live token of class `expected` and is the
    /// current token of its session.
    ///
    /// # Errors
    ///
    /// * `ExpiredOrInvalidToken` - the token fails decoding or is of the wrong class.
    /// * `SessionNotFound` - the session was revoked or expired in the store.
    /// * `StaleToken` - the session exists but holds a different token.
    pub async fn validate(
        &self,
        token: &str,
        expected: TokenClass,
    ) -> Result<ValidatedSession, AuthError> {
        let claims = self.codec.decode(token)?;
        if claims.token_type != expected {
            tracing::warn!(
                "❌ Token class mismatch: expected {} got {} ({})",
                expected.as_str(),
                claims.token_type.as_str(),
                fingerprint(token)
            );
            return Err(AuthError::ExpiredOrInvalidToken);
        }

        let session_id = claims.session_id()?;
        let session = self.store.get(claims.user_id, session_id).await?;

        // Records are keyed by both ids; a mismatch means a corrupted record.
        if session.user_id != claims.user_id || session.session_id != session_id {
            tracing::error!("❌ Session record does not match its key: session={}", session_id);
            return Err(AuthError::ExpiredOrInvalidToken);
        }

        let current = match expected {
            TokenClass::Access => &session.access_token,
            TokenClass::Refresh => &session.refresh_token,
        };
        if !bool::from(current.as_bytes().ct_eq(token.as_bytes())) {
            tracing::warn!(
                "❌ Stale {} token for session {} ({})",
                expected.as_str(),
                session_id,
                fingerprint(token)
            );
            return Err(AuthError::StaleToken);
        }

        tracing::debug!(
            "✅ Token valid: user={} session={} class={}",
            claims.user_id,
            session_id,
            expected.as_str()
        );
        Ok(ValidatedSession { claims, session })
    }

    /// Exchanges a refresh token for a new token pair on the same session.
    ///
    /// The record is overwritten in place and its TTL reset to the new
    /// refresh expiry. Two concurrent rotations of one session race; the
    /// last write wins. A session revoked after validation is never written
    /// back, and the rotation fails with `SessionNotFound`.
    pub async fn rotate(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let validated = self.validate(refresh_token, TokenClass::Refresh).await?;
        let mut session = validated.session;

        let (access, refresh) = self.issue_pair(session.user_id, session.session_id)?;
        session.access_token = access.token;
        session.refresh_token = refresh.token;
        session.expires_at = refresh.expires_at;

        let ttl = remaining_ttl(&session)?;
        self.store
            .replace(session.user_id, session.session_id, &session, ttl)
            .await?;
        tracing::info!(
            "🔄 Session rotated: user={} session={}",
            session.user_id,
            session.session_id
        );
        Ok(session)
    }

    /// Ends the session the access token belongs to.
    pub async fn revoke(&self, access_token: &str) -> Result<(), AuthError> {
        let validated = self.validate(access_token, TokenClass::Access).await?;
        self.store
            .delete(validated.user_id(), validated.session_id())
            .await?;

        tracing::info!(
            "👋 Session revoked: user={} session={}",
            validated.user_id(),
            validated.session_id()
        );
        Ok(())
    }

    /// Ends every session of a user.
    pub async fn revoke_all(&self, user_id: u64) -> Result<usize, AuthError> {
        let removed = self.store.delete_all_for_user(user_id).await?;
        tracing::info!("👋 Revoked {} session(s) for user {}", removed, user_id);
        Ok(removed)
    }

    /// Lists the live sessions of a user, newest first.
    pub async fn list(&self, user_id: u64) -> Result<Vec<SessionSummary>, AuthError> {
        let mut sessions = self.store.list_for_user(user_id).await?;
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions.iter().map(Session::summary).collect())
    }

    fn issue_pair(
        &self,
        user_id: u64,
        session_id: Uuid,
    ) -> Result<(IssuedToken, IssuedToken), AuthError> {
        let access = self
            .codec
            .issue(user_id, session_id, TokenClass::Access, self.ttls.access)?;
        let refresh = self
            .codec
            .issue(user_id, session_id, TokenClass::Refresh, self.ttls.refresh)?;
        Ok((access, refresh))
    }

    async fn persist(&self, session: &Session) -> Result<(), AuthError> {
        let ttl = remaining_ttl(session)?;
        self.store
            .put(session.user_id, session.session_id, session, ttl)
            .await?;
        Ok(())
    }
}

fn remaining_ttl(session: &Session) -> Result<Duration, AuthError> {
    let ttl = session.expires_at - Utc::now();
    if ttl <= Duration::zero() {
        return Err(AuthError::InvalidExpiry);
    }
    Ok(ttl)
}
