use crate::error::{AppError, Result};

/// Validates an email address.
///
/// # Arguments
///
/// * `email` - The email to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the email is valid.
pub fn validate_email(email: &str) -> Result<()> {
    if email.len() > 255 {
        return Err(AppError::Validation(
            "Email must be at most 255 characters".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(AppError::Validation("Email must contain '@'".to_string()));
    };

    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(AppError::Validation("Email is not valid".to_string()));
    }

    if domain.starts_with('.') || domain.ends_with('.') {
        return Err(AppError::Validation("Email is not valid".to_string()));
    }

    if email.chars().any(char::is_whitespace) {
        return Err(AppError::Validation(
            "Email cannot contain whitespace".to_string(),
        ));
    }

    Ok(())
}

/// Validates a password.
///
/// # Arguments
///
/// * `password` - The password to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the password is valid.
pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    if password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be at most 128 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validates a display name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Name cannot be empty".to_string()));
    }

    if name.chars().count() > 100 {
        return Err(AppError::Validation(
            "Name must be at most 100 characters".to_string(),
        ));
    }

    Ok(())
}
