//! Argon2 hashing for account passwords stored in `users.password_hash`.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("could not hash account password: {0}")]
    Hash(String),

    /// The stored value is not a PHC string Argon2 can read.
    #[error("stored password hash is unreadable: {0}")]
    CorruptHash(String),
}

/// Hashes a new account password with a fresh random salt.
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 failed to hash password");
            PasswordError::Hash(e.to_string())
        })
}

/// Checks a login attempt against a stored hash. A mismatch is `Ok(false)`;
/// only an unreadable stored hash is an error.
pub fn verify_password(attempt: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| PasswordError::CorruptHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(attempt.as_bytes(), &parsed)
        .is_ok())
}
