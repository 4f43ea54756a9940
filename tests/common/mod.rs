#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use chrono::Utc;
use http_body_util::BodyExt;
use tokio::sync::Mutex;
use tower::ServiceExt;
use zeroize::Zeroizing;

use marketplace::{
    config::Config,
    error::{AppError, Result},
    models::user::{NewUser, User},
    repositories::{session::MemorySessionStore, user::UserDirectory},
    router::build_router,
    services::auth::CredentialVerifier,
    state::AppState,
};

pub const PASSWORD: &str = "SecurePass123!@#";

/// User directory kept in process memory.
#[derive(Default)]
pub struct MemoryUsers {
    users: Mutex<Vec<User>>,
}

#[async_trait]
impl UserDirectory for MemoryUsers {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: u64) -> Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.lock().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(AppError::UserExists);
        }
        let now = Utc::now();
        let created = User {
            id: users.len() as u64 + 1,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            is_seller: false,
            created_at: now,
            updated_at: now,
        };
        users.push(created.clone());
        Ok(created)
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        redis_url: "redis://unused".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        db_pool_max_size: 1,
        jwt_secret: Zeroizing::new(b"integration-test-secret-0123456789abcdef".to_vec()),
        access_token_ttl_secs: 15 * 60,
        refresh_token_ttl_secs: 7 * 86400,
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: MemorySessionStore,
}

/// Builds the full router over in-memory collaborators.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let users: Arc<dyn UserDirectory> = Arc::new(MemoryUsers::default());
    let params = argon2::Params::new(256, 1, 1, None).unwrap();
    let credentials = CredentialVerifier::with_params(users, params).unwrap();
    let store = MemorySessionStore::new();

    let state = AppState::from_parts(&config, credentials, Arc::new(store.clone()));
    TestApp {
        router: build_router(state),
        store,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(json_request(uri, body, None)).await
    }

    pub async fn post_json_as(
        &self,
        uri: &str,
        body: serde_json::Value,
        user_agent: &str,
    ) -> Response<Body> {
        self.send(json_request(uri, body, Some(user_agent))).await
    }

    pub async fn get_auth(&self, uri: &str, token: &str) -> Response<Body> {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn post_auth(&self, uri: &str, token: &str) -> Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Registers `email` and returns the issued token pair.
    pub async fn register(&self, email: &str) -> Tokens {
        let response = self
            .post_json(
                "/users/register",
                serde_json::json!({ "name": "Test User", "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201, "Registration failed");
        Tokens::from_json(&body_json(response).await)
    }

    /// Logs `email` in from the given device and returns the token pair.
    pub async fn login(&self, email: &str, device: &str) -> Tokens {
        let response = self
            .post_json_as(
                "/users/login",
                serde_json::json!({ "email": email, "password": PASSWORD }),
                device,
            )
            .await;
        assert_eq!(response.status().as_u16(), 200, "Login failed");
        Tokens::from_json(&body_json(response).await)
    }
}

#[derive(Debug, Clone)]
pub struct Tokens {
    pub access: String,
    pub refresh: String,
}

impl Tokens {
    pub fn from_json(json: &serde_json::Value) -> Self {
        Self {
            access: json["access_token"].as_str().expect("access_token").to_string(),
            refresh: json["refresh_token"].as_str().expect("refresh_token").to_string(),
        }
    }
}

fn json_request(uri: &str, body: serde_json::Value, user_agent: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user_agent) = user_agent {
        builder = builder.header(header::USER_AGENT, user_agent);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
