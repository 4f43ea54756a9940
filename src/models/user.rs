use chrono::{DateTime, Utc};
use serde::Serialize;

/// Represents a user in the system.
#[derive(Clone, Debug)]
pub struct User {
    /// The unique identifier for the user.
    pub id: u64,
    /// The user's display name.
    pub name: String,
    /// The user's email address, used as the login name.
    pub email: String,
    /// The user's Argon2id password hash.
    pub password_hash: String,
    /// Whether the user may own stores.
    pub is_seller: bool,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// The data required to insert a new user.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// The public view of a user.
#[derive(Serialize, Debug)]
pub struct UserProfile {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub is_seller: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            is_seller: user.is_seller,
            created_at: user.created_at,
        }
    }
}
