//! In-process session store with passive TTL expiry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::store::{SessionStore, StoreError};

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|entry| entry.is_live(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| StoreError::Command(format!("ttl out of range: {}s", ttl.as_secs())))?;
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get(key)
            && entry.is_live(now)
        {
            return Ok(Some(entry.value.clone()));
        }
        entries.remove(key);
        Ok(None)
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        Ok(entries
            .remove(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        Ok(entries.remove(key).is_some_and(|entry| entry.is_live(now)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
