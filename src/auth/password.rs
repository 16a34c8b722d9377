//! Stored user passwords: bcrypt hashes in `users.password`.

use super::AuthError;

const COST: u32 = 10;

/// Hash for storing in `users.password`; also printed by `crud-api hash-password`.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, COST).map_err(|e| AuthError::Internal(format!("password hash failed: {e}")))
}

/// `Err` only when `stored` is not a readable bcrypt hash.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, stored).map_err(|e| AuthError::Internal(format!("stored hash unreadable: {e}")))
}

/// Hash on the blocking pool; bcrypt is deliberately slow.
pub async fn hash_password_blocking(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Internal(format!("hash task: {e}")))?
}

pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::Internal(format!("verify task: {e}")))?
}
