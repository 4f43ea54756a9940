use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use tokio_postgres::error::SqlState;

use crate::{
    error::{AppError, Result},
    models::user::{NewUser, User},
};

/// Lookup and creation of user accounts.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Finds a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Finds a user by their ID.
    async fn find_by_id(&self, user_id: u64) -> Result<Option<User>>;

    /// Creates a new user.
    ///
    /// # Errors
    ///
    /// `AppError::UserExists` if the email is already registered.
    async fn create(&self, user: NewUser) -> Result<User>;
}

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    let id: i64 = row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?;
    Ok(User {
        id: u64::try_from(id).map_err(|_| AppError::MissingData("id".to_string()))?,
        name: row.try_get("name").map_err(|_| AppError::MissingData("name".to_string()))?,
        email: row.try_get("email").map_err(|_| AppError::MissingData("email".to_string()))?,
        password_hash: row.try_get("password").map_err(|_| AppError::MissingData("password".to_string()))?,
        is_seller: row.try_get("is_seller").map_err(|_| AppError::MissingData("is_seller".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|_| AppError::MissingData("updated_at".to_string()))?,
    })
}

/// User directory backed by PostgreSQL.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool,
}

impl PgUserRepository {
    /// Creates a new `PgUserRepository`.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, name, email, password, is_seller, created_at, updated_at
                FROM users
                WHERE email = $1
                "#,
                &[&email],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn find_by_id(&self, user_id: u64) -> Result<Option<User>> {
        let Ok(id) = i64::try_from(user_id) else {
            return Ok(None);
        };
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, name, email, password, is_seller, created_at, updated_at
                FROM users
                WHERE id = $1
                "#,
                &[&id],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                r#"
                INSERT INTO users (name, email, password)
                VALUES ($1, $2, $3)
                RETURNING id, name, email, password, is_seller, created_at, updated_at
                "#,
                &[&user.name, &user.email, &user.password_hash],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                    AppError::UserExists
                } else {
                    AppError::Database(e)
                }
            })?;
        row_to_user(&row)
    }
}
