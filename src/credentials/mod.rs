//! User credential lookup and password hashing.
//!
//! Accounts are created elsewhere; this service only reads them for login and
//! recovery and rewrites the password hash on a completed recovery.

pub mod memory;
pub mod postgres;

use argon2::{
    Argon2, PasswordHash, PasswordVerifier,
    password_hash::{PasswordHasher as _, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
    #[error("credential query failed: {0}")]
    Query(String),
    #[error("failed to hash password")]
    Hash,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub password_hash: String,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `email` must already be normalized.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, CredentialError>;

    /// Replace the stored hash. Returns `false` when no such user exists.
    async fn update_password(
        &self,
        user_id: &str,
        password_hash: &str,
    ) -> Result<bool, CredentialError>;

    async fn ping(&self) -> Result<(), CredentialError>;
}

pub trait PasswordHasher: Send + Sync {
    /// # Errors
    /// [`CredentialError::Hash`] if hashing fails.
    fn hash(&self, password: &str) -> Result<String, CredentialError>;

    /// Unparseable hashes never verify.
    fn verify(&self, password: &str, password_hash: &str) -> bool;
}

/// Argon2id with default parameters, stored as a PHC string.
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| CredentialError::Hash)
    }

    fn verify(&self, password: &str, password_hash: &str) -> bool {
        PasswordHash::new(password_hash).is_ok_and(|parsed| {
            self.argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
    }
}

/// Normalize an email for lookup.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("alice@example.com"));
        assert!(!valid_email("alice"));
        assert!(!valid_email("alice@example"));
        assert!(!valid_email("a b@example.com"));
    }

    #[test]
    fn argon2_hash_verifies_only_the_right_password() -> Result<(), CredentialError> {
        let hasher = Argon2Hasher::new();
        let hash = hasher.hash("correct horse")?;
        assert!(hash.starts_with("$argon2"));
        assert!(hasher.verify("correct horse", &hash));
        assert!(!hasher.verify("wrong horse", &hash));
        assert!(!hasher.verify("correct horse", "not-a-phc-string"));
        Ok(())
    }
}
