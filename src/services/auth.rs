use std::sync::Arc;

use argon2::{
    Algorithm, Argon2, Params, ParamsBuilder, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::{RngCore, rngs::OsRng};
use zeroize::Zeroize;

use crate::error::{AppError, AuthError, Result};
use crate::models::user::{NewUser, User};
use crate::repositories::user::UserDirectory;

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 3;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 1;

/// Builds the production Argon2id parameters.
pub fn default_params() -> Result<Params> {
    ParamsBuilder::new()
        .m_cost(ARGON2_MEMORY_MB * 1024)
        .t_cost(ARGON2_ITERATIONS)
        .p_cost(ARGON2_PARALLELISM)
        .build()
        .map_err(|e| AppError::Internal(format!("Argon2 params: {}", e)))
}

/// Checks email/password pairs against the user directory and registers
/// new accounts.
#[derive(Clone)]
pub struct CredentialVerifier {
    users: Arc<dyn UserDirectory>,
    argon2: Argon2<'static>,
    /// Verified against when the email is unknown, so both failure paths
    /// cost one hash verification.
    dummy_hash: String,
}

impl CredentialVerifier {
    /// Creates a verifier with the production hashing parameters.
    pub fn new(users: Arc<dyn UserDirectory>) -> Result<Self> {
        Self::with_params(users, default_params()?)
    }

    /// Creates a verifier with explicit Argon2id parameters.
    pub fn with_params(users: Arc<dyn UserDirectory>, params: Params) -> Result<Self> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy_hash = hash_with(&argon2, "dummy-password-for-timing")?;
        Ok(Self {
            users,
            argon2,
            dummy_hash,
        })
    }

    /// Hashes a password using Argon2id.
    pub fn hash_password(&self, password: &str) -> Result<String> {
        hash_with(&self.argon2, password)
    }

    /// Authenticates a user by email and password.
    ///
    /// # Arguments
    ///
    /// * `email` - The user's email.
    /// * `password` - The user's password.
    ///
    /// # Returns
    ///
    /// The authenticated `User`, or `InvalidCredentials` for an unknown email
    /// and a wrong password alike.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        tracing::debug!("🔐 Authenticating user: {}", email);

        let Some(user) = self.users.find_by_email(email).await? else {
            let _ = verify_password(password, &self.dummy_hash);
            tracing::warn!("❌ Login failed: unknown email");
            return Err(AuthError::InvalidCredentials.into());
        };

        if !verify_password(password, &user.password_hash)? {
            tracing::warn!("❌ Login failed: wrong password for user {}", user.id);
            return Err(AuthError::InvalidCredentials.into());
        }

        tracing::info!("✅ User authenticated: {}", user.id);
        Ok(user)
    }

    /// Registers a new user.
    ///
    /// # Errors
    ///
    /// `AppError::UserExists` if the email is already taken.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        tracing::debug!("📝 Registering user: {}", email);

        if self.users.find_by_email(email).await?.is_some() {
            return Err(AppError::UserExists);
        }

        let password_hash = self.hash_password(password)?;
        let user = self
            .users
            .create(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await?;

        tracing::info!("✅ User created with ID: {}", user.id);
        Ok(user)
    }

    /// Looks up a user by ID.
    pub async fn find_user(&self, user_id: u64) -> Result<User> {
        self.users.find_by_id(user_id).await?.ok_or(AppError::NotFound)
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> Result<String> {
    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut salt_bytes);

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("Salt encoding error: {}", e)))?;

    let password_hash = argon2
        .hash_password(&password_bytes, &salt)
        .map_err(|e| AppError::Internal(format!("Argon2 hash error: {}", e)))?
        .to_string();

    password_bytes.zeroize();
    Ok(password_hash)
}

/// Verifies a password against a PHC hash string.
///
/// The hash carries its own parameters, so verification works for hashes
/// made with any parameter set.
fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let mut password_bytes = password.as_bytes().to_vec();
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Hash parse error: {}", e)))?;
    let result = Argon2::default()
        .verify_password(&password_bytes, &parsed_hash)
        .is_ok();

    password_bytes.zeroize();
    Ok(result)
}
