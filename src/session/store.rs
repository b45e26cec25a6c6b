//! Key-value session store seam.
//!
//! Refresh and recovery tokens share one key space. Keys are the token strings;
//! values are either the refresh sentinel or a user id. Expiry is enforced by
//! the store itself, so nothing in this service sweeps old entries.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
    #[error("session store command failed: {0}")]
    Command(String),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Write `value` under `key`, replacing any previous entry. The TTL is set
    /// here and never renewed by reads.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Read and delete in one step. At most one caller observes `Some`.
    async fn take(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove `key`. Returns whether an entry was removed; absent keys are not
    /// an error.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
