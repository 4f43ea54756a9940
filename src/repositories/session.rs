use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Duration;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::session::Session;

/// Number of keys requested per `SCAN` round trip.
const SCAN_BATCH: usize = 100;

/// Builds the store key for a session.
pub fn session_key(user_id: u64, session_id: Uuid) -> String {
    format!("user:{}:session:{}", user_id, session_id)
}

/// Builds the key pattern matching all sessions of a user.
fn user_pattern(user_id: u64) -> String {
    format!("user:{}:session:*", user_id)
}

/// TTL-bound storage for session records.
///
/// Implementations must provide atomic per-key writes and deletes; the
/// session manager relies on that instead of in-process locking.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Upserts a session that lives for `ttl`.
    ///
    /// # Errors
    ///
    /// `StoreError::InvalidExpiry` if `ttl` is not positive.
    async fn put(
        &self,
        user_id: u64,
        session_id: Uuid,
        session: &Session,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Overwrites a session only while it is still live.
    ///
    /// # Errors
    ///
    /// * `StoreError::NotFound` - the record was deleted or has expired.
    /// * `StoreError::InvalidExpiry` - `ttl` is not positive.
    async fn replace(
        &self,
        user_id: u64,
        session_id: Uuid,
        session: &Session,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Fetches a live session.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the record is absent or has expired.
    async fn get(&self, user_id: u64, session_id: Uuid) -> Result<Session, StoreError>;

    /// Deletes a session. Deleting an absent session succeeds.
    async fn delete(&self, user_id: u64, session_id: Uuid) -> Result<(), StoreError>;

    /// Best-effort snapshot of all live sessions of a user.
    async fn list_for_user(&self, user_id: u64) -> Result<Vec<Session>, StoreError>;

    /// Deletes every session of a user, returning how many were removed.
    async fn delete_all_for_user(&self, user_id: u64) -> Result<usize, StoreError>;
}

fn ttl_millis(ttl: Duration) -> Result<u64, StoreError> {
    let millis = ttl.num_milliseconds();
    if millis <= 0 {
        return Err(StoreError::InvalidExpiry);
    }
    Ok(millis as u64)
}

/// `SCAN` may return a key more than once across iterations.
fn dedup_keys(mut keys: Vec<String>) -> Vec<String> {
    keys.sort_unstable();
    keys.dedup();
    keys
}

fn encode_session(session: &Session) -> Result<String, StoreError> {
    sonic_rs::to_string(session)
        .map_err(|e| StoreError::Corrupt(format!("Session serialization failed: {}", e)))
}

/// Session store backed by Redis.
#[derive(Clone)]
pub struct RedisSessionStore {
    redis: ConnectionManager,
}

impl RedisSessionStore {
    /// Creates a new `RedisSessionStore`.
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// Connects to Redis and verifies the connection with `PING`.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - The URL of the Redis server.
    ///
    /// # Returns
    ///
    /// A `Result` containing the store.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let mut redis = ConnectionManager::new(client).await?;
        let _: String = redis::cmd("PING").query_async(&mut redis).await?;
        tracing::info!("✅ Redis Connection Manager initialized (pooled)");
        Ok(Self::new(redis))
    }

    async fn scan_user_keys(&self, user_id: u64) -> Result<Vec<String>, StoreError> {
        let mut conn = self.redis.clone();
        let pattern = user_pattern(user_id);
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(dedup_keys(keys))
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(
        &self,
        user_id: u64,
        session_id: Uuid,
        session: &Session,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let millis = ttl_millis(ttl)?;
        let session_json = encode_session(session)?;

        let mut conn = self.redis.clone();
        let _: () = conn
            .pset_ex(session_key(user_id, session_id), session_json, millis)
            .await?;

        tracing::debug!("💾 Session stored: user={} session={} ttl_ms={}", user_id, session_id, millis);
        Ok(())
    }

    async fn replace(
        &self,
        user_id: u64,
        session_id: Uuid,
        session: &Session,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let millis = ttl_millis(ttl)?;
        let session_json = encode_session(session)?;

        // XX: never recreates a deleted or expired key.
        let mut conn = self.redis.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(session_key(user_id, session_id))
            .arg(session_json)
            .arg("PX")
            .arg(millis)
            .arg("XX")
            .query_async(&mut conn)
            .await?;

        if reply.is_none() {
            return Err(StoreError::NotFound);
        }
        tracing::debug!("💾 Session replaced: user={} session={} ttl_ms={}", user_id, session_id, millis);
        Ok(())
    }

    async fn get(&self, user_id: u64, session_id: Uuid) -> Result<Session, StoreError> {
        let mut conn = self.redis.clone();
        let session_json: Option<String> = conn.get(session_key(user_id, session_id)).await?;
        let session_json = session_json.ok_or(StoreError::NotFound)?;

        sonic_rs::from_str(&session_json)
            .map_err(|e| StoreError::Corrupt(format!("Invalid session JSON: {}", e)))
    }

    async fn delete(&self, user_id: u64, session_id: Uuid) -> Result<(), StoreError> {
        let mut conn = self.redis.clone();
        let _: () = conn.del(session_key(user_id, session_id)).await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: u64) -> Result<Vec<Session>, StoreError> {
        let keys = self.scan_user_keys(user_id).await?;
        let mut conn = self.redis.clone();
        let mut sessions = Vec::with_capacity(keys.len());

        for key in keys {
            // Keys may expire between SCAN and GET.
            let session_json: Option<String> = conn.get(&key).await?;
            let Some(session_json) = session_json else {
                continue;
            };
            match sonic_rs::from_str::<Session>(&session_json) {
                Ok(session) => sessions.push(session),
                Err(e) => tracing::warn!("⚠️ Skipping unreadable session {}: {}", key, e),
            }
        }

        Ok(sessions)
    }

    async fn delete_all_for_user(&self, user_id: u64) -> Result<usize, StoreError> {
        let keys = self.scan_user_keys(user_id).await?;
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.redis.clone();
        let removed: usize = conn.del(keys).await?;
        Ok(removed)
    }
}

#[derive(Clone)]
struct StoredSession {
    session: Session,
    deadline: Instant,
}

/// In-process session store with the same TTL semantics as Redis.
///
/// Intended for tests and single-node development.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<RwLock<HashMap<String, StoredSession>>>,
}

impl MemorySessionStore {
    /// Creates a new, empty `MemorySessionStore`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held, including expired ones not yet pruned.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    fn live_for_user<'a>(
        entries: &'a HashMap<String, StoredSession>,
        user_id: u64,
        now: Instant,
    ) -> impl Iterator<Item = (&'a String, &'a StoredSession)> {
        let prefix = format!("user:{}:session:", user_id);
        entries
            .iter()
            .filter(move |(key, stored)| key.starts_with(&prefix) && stored.deadline > now)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(
        &self,
        user_id: u64,
        session_id: Uuid,
        session: &Session,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let millis = ttl_millis(ttl)?;
        let now = Instant::now();
        let deadline = now + std::time::Duration::from_millis(millis);

        let mut entries = self.entries.write().await;
        entries.retain(|_, stored| stored.deadline > now);
        entries.insert(
            session_key(user_id, session_id),
            StoredSession {
                session: session.clone(),
                deadline,
            },
        );
        Ok(())
    }

    async fn replace(
        &self,
        user_id: u64,
        session_id: Uuid,
        session: &Session,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let millis = ttl_millis(ttl)?;
        let now = Instant::now();
        let key = session_key(user_id, session_id);

        let mut entries = self.entries.write().await;
        entries.retain(|_, stored| stored.deadline > now);
        let Some(stored) = entries.get_mut(&key) else {
            return Err(StoreError::NotFound);
        };
        stored.session = session.clone();
        stored.deadline = now + std::time::Duration::from_millis(millis);
        Ok(())
    }

    async fn get(&self, user_id: u64, session_id: Uuid) -> Result<Session, StoreError> {
        let key = session_key(user_id, session_id);
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(stored) if stored.deadline > now => return Ok(stored.session.clone()),
                None => return Err(StoreError::NotFound),
                Some(_) => {}
            }
        }

        // Expired: evict lazily, unless a concurrent put already replaced it.
        let mut entries = self.entries.write().await;
        if entries.get(&key).is_some_and(|stored| stored.deadline <= now) {
            entries.remove(&key);
        }
        Err(StoreError::NotFound)
    }

    async fn delete(&self, user_id: u64, session_id: Uuid) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.remove(&session_key(user_id, session_id));
        Ok(())
    }

    async fn list_for_user(&self, user_id: u64) -> Result<Vec<Session>, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, stored| stored.deadline > now);
        Ok(Self::live_for_user(&entries, user_id, now)
            .map(|(_, stored)| stored.session.clone())
            .collect())
    }

    async fn delete_all_for_user(&self, user_id: u64) -> Result<usize, StoreError> {
        let mut entries = self.entries.write().await;
        let keys: Vec<String> = Self::live_for_user(&entries, user_id, Instant::now())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            entries.remove(key);
        }
        Ok(keys.len())
    }
}
