use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use zeroize::{Zeroize, Zeroizing};

/// Default access token lifetime: 72 hours.
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 72 * 3600;
/// Default refresh token lifetime: 365 days.
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 365 * 86400;
/// Minimum accepted length of the signing secret in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The URL of the Redis server.
    pub redis_url: String,
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Maximum number of pooled PostgreSQL connections.
    pub db_pool_max_size: usize,
    /// The HMAC secret used to sign session tokens.
    pub jwt_secret: Zeroizing<Vec<u8>>,
    /// Access token lifetime in seconds.
    pub access_token_ttl_secs: i64,
    /// Refresh token (and session) lifetime in seconds.
    pub refresh_token_ttl_secs: i64,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let mut secret = env::var("JWT_SECRET_KEY")
            .context("JWT_SECRET_KEY must be set (generate with: openssl rand -hex 32)")?;
        let jwt_secret = Zeroizing::new(secret.as_bytes().to_vec());
        secret.zeroize();

        let config = Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
                .parse()
                .context("Invalid BIND_ADDR")?,
            db_pool_max_size: env::var("DB_POOL_MAX_SIZE")
                .unwrap_or_else(|_| "32".to_string())
                .parse()
                .context("Invalid DB_POOL_MAX_SIZE")?,
            jwt_secret,
            access_token_ttl_secs: env::var("ACCESS_TOKEN_TTL_SECS")
                .unwrap_or_else(|_| DEFAULT_ACCESS_TOKEN_TTL_SECS.to_string())
                .parse()
                .context("Invalid ACCESS_TOKEN_TTL_SECS")?,
            refresh_token_ttl_secs: env::var("REFRESH_TOKEN_TTL_SECS")
                .unwrap_or_else(|_| DEFAULT_REFRESH_TOKEN_TTL_SECS.to_string())
                .parse()
                .context("Invalid REFRESH_TOKEN_TTL_SECS")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants between configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!("JWT_SECRET_KEY must be at least {MIN_JWT_SECRET_LEN} bytes");
        }
        if self.access_token_ttl_secs <= 0 {
            anyhow::bail!("ACCESS_TOKEN_TTL_SECS must be positive");
        }
        if self.refresh_token_ttl_secs <= self.access_token_ttl_secs {
            anyhow::bail!("REFRESH_TOKEN_TTL_SECS must be greater than ACCESS_TOKEN_TTL_SECS");
        }
        // Refresh outlives access, so checking it covers both.
        chrono::TimeDelta::try_seconds(self.refresh_token_ttl_secs)
            .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
            .context("REFRESH_TOKEN_TTL_SECS is too large to express an expiry")?;
        if self.db_pool_max_size == 0 {
            anyhow::bail!("DB_POOL_MAX_SIZE must be at least 1");
        }
        Ok(())
    }

    /// Access token lifetime.
    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.access_token_ttl_secs)
    }

    /// Refresh token lifetime.
    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_token_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            database_url: "postgres://localhost/marketplace".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            bind_addr: "127.0.0.1:3000".parse().unwrap(),
            db_pool_max_size: 4,
            jwt_secret: Zeroizing::new(vec![7u8; 32]),
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn short_secret_is_rejected() {
        let mut config = sample();
        config.jwt_secret = Zeroizing::new(b"short".to_vec());
        assert!(config.validate().is_err());
    }

    #[test]
    fn refresh_must_outlive_access() {
        let mut config = sample();
        config.refresh_token_ttl_secs = config.access_token_ttl_secs;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unrepresentable_ttl_is_rejected() {
        let mut config = sample();
        config.refresh_token_ttl_secs = 10_000_000_000_000;
        assert!(config.validate().is_err());

        config.refresh_token_ttl_secs = i64::MAX;
        assert!(config.validate().is_err());
    }
}
