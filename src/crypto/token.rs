use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AuthError;

/// The only accepted signing algorithm.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Distinguishes the two token classes of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenClass {
    Access,
    Refresh,
}

impl TokenClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenClass::Access => "access",
            TokenClass::Refresh => "refresh",
        }
    }
}

/// Claims embedded in every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The owning user.
    pub user_id: u64,
    /// The session both tokens of a pair belong to.
    pub session_uuid: String,
    /// Access or refresh.
    pub token_type: TokenClass,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Unique token identifier, so re-issued tokens never repeat.
    pub jti: String,
}

impl Claims {
    /// Parses the embedded session id.
    pub fn session_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.session_uuid).map_err(|_| AuthError::ExpiredOrInvalidToken)
    }

    /// The embedded expiry as a timestamp.
    pub fn expires_at(&self) -> Result<DateTime<Utc>, AuthError> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .ok_or(AuthError::ExpiredOrInvalidToken)
    }
}

/// A freshly signed token together with its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies HS256 session tokens with a single process-wide secret.
///
/// Holds no mutable state; clones share nothing but key material.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Creates a codec for the given HMAC secret.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Signs a token for `(user_id, session_id, class)` that expires after `ttl`.
    ///
    /// Only fails when the key cannot be used for signing or `ttl` pushes the
    /// expiry past the representable range. Both are configuration faults
    /// rather than per-request conditions.
    pub fn issue(
        &self,
        user_id: u64,
        session_id: Uuid,
        class: TokenClass,
        ttl: Duration,
    ) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::Signing("token expiry out of range".to_string()))?;
        let claims = Claims {
            user_id,
            session_uuid: session_id.to_string(),
            token_type: class,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.expires_at()?,
        })
    }

    /// Verifies signature, algorithm and expiry and returns the claims.
    ///
    /// Every failure collapses into `ExpiredOrInvalidToken`.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!("Token rejected by codec: {:?}", e.kind());
            AuthError::ExpiredOrInvalidToken
        })?;

        if data.header.alg != ALGORITHM {
            return Err(AuthError::ExpiredOrInvalidToken);
        }

        // jsonwebtoken accepts exp == now; the session contract does not.
        if data.claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::ExpiredOrInvalidToken);
        }

        Ok(data.claims)
    }
}

/// A short, log-safe identifier for a token.
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-that-is-long-enough-for-hmac";

    #[test]
    fn issued_token_decodes_to_original_claims() {
        let codec = TokenCodec::new(SECRET);
        let session_id = Uuid::new_v4();

        let issued = codec
            .issue(42, session_id, TokenClass::Refresh, Duration::hours(1))
            .expect("issue should succeed");
        let claims = codec.decode(&issued.token).expect("decode should succeed");

        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.session_id().unwrap(), session_id);
        assert_eq!(claims.token_type, TokenClass::Refresh);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = TokenCodec::new(SECRET);
        let issued = codec
            .issue(1, Uuid::new_v4(), TokenClass::Access, Duration::seconds(-5))
            .unwrap();

        assert_eq!(
            codec.decode(&issued.token),
            Err(AuthError::ExpiredOrInvalidToken)
        );
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let issuer = TokenCodec::new(SECRET);
        let verifier = TokenCodec::new(b"another-secret-that-is-long-enough!!");
        let issued = issuer
            .issue(1, Uuid::new_v4(), TokenClass::Access, Duration::hours(1))
            .unwrap();

        assert_eq!(
            verifier.decode(&issued.token),
            Err(AuthError::ExpiredOrInvalidToken)
        );
    }

    #[test]
    fn other_algorithm_is_rejected() {
        let codec = TokenCodec::new(SECRET);
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: 1,
            session_uuid: Uuid::new_v4().to_string(),
            token_type: TokenClass::Access,
            iat: now,
            exp: now + 3600,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(codec.decode(&token), Err(AuthError::ExpiredOrInvalidToken));
    }

    #[test]
    fn out_of_range_expiry_is_an_error() {
        let codec = TokenCodec::new(SECRET);
        let result = codec.issue(
            1,
            Uuid::new_v4(),
            TokenClass::Refresh,
            Duration::seconds(10_000_000_000_000),
        );
        assert!(matches!(result, Err(AuthError::Signing(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        let codec = TokenCodec::new(SECRET);
        assert_eq!(codec.decode("not.a.token"), Err(AuthError::ExpiredOrInvalidToken));
        assert_eq!(codec.decode(""), Err(AuthError::ExpiredOrInvalidToken));
    }

    #[test]
    fn reissued_tokens_differ() {
        let codec = TokenCodec::new(SECRET);
        let session_id = Uuid::new_v4();
        let a = codec
            .issue(7, session_id, TokenClass::Access, Duration::hours(1))
            .unwrap();
        let b = codec
            .issue(7, session_id, TokenClass::Access, Duration::hours(1))
            .unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn fingerprint_is_short_and_stable() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_eq!(fingerprint("abc").len(), 12);
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
    }
}
