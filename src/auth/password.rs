/// Password encoding and matching on top of bcrypt.
///
/// `matches` compares in constant time (bcrypt's own comparison);
/// `encode` applies strength validation before hashing.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Hash a raw password for storage.
///
/// # Errors
/// `Validation` if the password fails the strength rules, `Internal` if
/// bcrypt itself fails.
pub fn encode(raw: &str) -> Result<String, AppError> {
    validate_strength(raw)?;

    hash(raw, DEFAULT_COST).map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// Compare a raw password against a stored hash.
///
/// # Errors
/// `Internal` if the hash is not a valid bcrypt string. A failure here is
/// unrecoverable for the call and is never retried.
pub fn matches(raw: &str, hashed: &str) -> Result<bool, AppError> {
    verify(raw, hashed)
        .map_err(|e| AppError::Internal(format!("password verification failed: {}", e)))
}

/// Strength rules: 8-128 characters with at least one digit, one
/// lowercase and one uppercase letter. The upper bound also caps bcrypt
/// input size.
fn validate_strength(raw: &str) -> Result<(), AppError> {
    if raw.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        )));
    }

    if raw.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        )));
    }

    let has_digit = raw.chars().any(|c| c.is_numeric());
    let has_lowercase = raw.chars().any(|c| c.is_lowercase());
    let has_uppercase = raw.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "password (must contain a digit, a lowercase and an uppercase letter)".to_string(),
        )));
    }

    Ok(())
}
