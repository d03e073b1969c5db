//! Argon2id password hashing.
//!
//! Hashing and verification run on `spawn_blocking`: Argon2 is CPU-intensive
//! and would stall the async runtime if run inline.

use crate::error::AppError;
use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use tokio::task;

pub async fn hash(password: &str) -> Result<String, AppError> {
    let password = password.to_string();
    task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
    })
    .await
    .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
}

/// Check a candidate password against a stored hash. An unparseable stored
/// hash counts as a mismatch, not an error.
pub async fn verify(password: &str, stored_hash: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();
    task::spawn_blocking(move || {
        let Ok(parsed) = PasswordHash::new(&stored_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
    .await
    .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_verifies_original_password() {
        let h = hash("hunter22").await.unwrap();
        assert!(h.starts_with("$argon2"));
        assert!(verify("hunter22", &h).await.unwrap());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let h = hash("hunter22").await.unwrap();
        assert!(!verify("hunter23", &h).await.unwrap());
    }

    #[tokio::test]
    async fn garbage_stored_hash_is_a_mismatch() {
        assert!(!verify("anything", "not-a-phc-string").await.unwrap());
    }
}
