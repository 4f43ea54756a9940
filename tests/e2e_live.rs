//! End-to-end checks against a running server on 127.0.0.1:3000 backed by
//! real PostgreSQL and Redis. Run with `--ignored` once the stack is up.

use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use redis::aio::ConnectionManager;
use serde_json::{Value, json};

static REDIS_CLIENT: Lazy<redis::Client> = Lazy::new(|| {
    redis::Client::open(
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/".to_string()),
    )
    .unwrap()
});

struct TestContext {
    client: reqwest::Client,
    base_url: String,
}

impl TestContext {
    fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "http://127.0.0.1:3000".to_string(),
        }
    }

    fn unique_email() -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("e2e_{}@example.com", nanos)
    }
}

async fn get_redis_conn() -> ConnectionManager {
    REDIS_CLIENT.get_connection_manager().await.unwrap()
}

#[tokio::test]
#[ignore = "requires a running server, PostgreSQL and Redis"]
async fn test_session_lifecycle_against_live_stack() {
    let context = TestContext::new();
    let email = TestContext::unique_email();

    let reg_response = context
        .client
        .post(format!("{}/users/register", context.base_url))
        .json(&json!({ "name": "E2E User", "email": email, "password": "SecurePass123!@#" }))
        .send()
        .await
        .unwrap();
    assert_eq!(reg_response.status().as_u16(), 201, "Registration failed");
    let tokens: Value = reg_response.json().await.unwrap();
    let access = tokens["access_token"].as_str().unwrap().to_string();

    let me: Value = context
        .client
        .get(format!("{}/users/me", context.base_url))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let user_id = me["id"].as_u64().unwrap();

    let sessions: Value = context
        .client
        .get(format!("{}/users/sessions", context.base_url))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let session_id = sessions["current_session_id"].as_str().unwrap().to_string();

    let key = format!("user:{}:session:{}", user_id, session_id);
    let mut con = get_redis_conn().await;
    let ttl: i64 = redis::cmd("TTL").arg(&key).query_async(&mut con).await.unwrap();
    assert!(ttl > 0, "session key {key} must carry a TTL");

    let logout = context
        .client
        .post(format!("{}/users/logout", context.base_url))
        .json(&json!({ "access_token": access }))
        .send()
        .await
        .unwrap();
    assert_eq!(logout.status().as_u16(), 200);

    let exists: i64 = redis::cmd("EXISTS").arg(&key).query_async(&mut con).await.unwrap();
    assert_eq!(exists, 0, "logout must delete the session record");

    let after = context
        .client
        .get(format!("{}/users/me", context.base_url))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(after.status().as_u16(), 401);
}
