use std::sync::Arc;

use crate::config::Config;
use crate::crypto::token::TokenCodec;
use crate::repositories::{
    session::{RedisSessionStore, SessionStore},
    user::{PgUserRepository, UserDirectory},
};
use crate::services::{
    auth::CredentialVerifier,
    session::{SessionManager, SessionTtls},
};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// Verifies credentials and registers users.
    pub credentials: CredentialVerifier,
    /// The only writer of session records.
    pub sessions: SessionManager,
}

impl AppState {
    /// Connects to PostgreSQL and Redis and wires the services.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`. Either backend being unreachable
    /// is fatal.
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let db = crate::db::create_pool(&config.database_url, config.db_pool_max_size)?;
        crate::db::ensure_schema(&db).await?;
        tracing::info!("✅ PostgreSQL Pool initialized with deadpool-postgres");

        let store = RedisSessionStore::connect(&config.redis_url).await?;

        let users: Arc<dyn UserDirectory> = Arc::new(PgUserRepository::new(db));
        let credentials = CredentialVerifier::new(users)?;
        tracing::info!("✅ Credential verifier initialized");

        Ok(Self::from_parts(config, credentials, Arc::new(store)))
    }

    /// Builds the state from already constructed collaborators.
    pub fn from_parts(
        config: &Config,
        credentials: CredentialVerifier,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let sessions = SessionManager::new(
            TokenCodec::new(&config.jwt_secret),
            store,
            SessionTtls {
                access: config.access_ttl(),
                refresh: config.refresh_ttl(),
            },
        );

        AppState {
            credentials,
            sessions,
        }
    }
}
