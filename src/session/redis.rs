//! Redis-backed session store.
//!
//! Uses a multiplexed `ConnectionManager`, which reconnects on its own, so the
//! store can be cloned freely across request handlers.

use async_trait::async_trait;
use redis::{Client, RedisError, aio::ConnectionManager};
use std::time::Duration;
use tracing::{debug, instrument};

use super::store::{SessionStore, StoreError};

#[derive(Clone)]
pub struct RedisSessionStore {
    connection: ConnectionManager,
}

impl RedisSessionStore {
    /// Connect to the Redis instance at `redis_url`.
    ///
    /// # Errors
    /// Returns [`StoreError::Unavailable`] if the URL is invalid or the first
    /// connection cannot be established.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = Client::open(redis_url).map_err(unavailable)?;
        let connection = ConnectionManager::new(client).await.map_err(unavailable)?;

        debug!("connected to redis session store");

        Ok(Self { connection })
    }
}

fn unavailable(err: RedisError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn command(err: RedisError) -> StoreError {
    if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Command(err.to_string())
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    #[instrument(skip_all, fields(ttl_seconds = ttl.as_secs()))]
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(command)
    }

    #[instrument(skip_all)]
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await
            .map_err(command)
    }

    #[instrument(skip_all)]
    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        // GETDEL needs Redis >= 6.2
        redis::cmd("GETDEL")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await
            .map_err(command)
    }

    #[instrument(skip_all)]
    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let removed = redis::cmd("DEL")
            .arg(key)
            .query_async::<_, i64>(&mut conn)
            .await
            .map_err(command)?;
        Ok(removed > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Runs only against a live server: PASSAGE_TEST_REDIS_URL=redis://127.0.0.1:6379
    async fn live_store() -> Option<RedisSessionStore> {
        let url = std::env::var("PASSAGE_TEST_REDIS_URL").ok()?;
        match RedisSessionStore::connect(&url).await {
            Ok(store) => Some(store),
            Err(err) => {
                eprintln!("Skipping redis test: {err}");
                None
            }
        }
    }

    #[tokio::test]
    async fn redis_round_trip_take_and_delete() -> Result<(), StoreError> {
        let Some(store) = live_store().await else {
            return Ok(());
        };
        let key = format!("passage-test-{}", uuid::Uuid::new_v4());

        store.set(&key, "user-1", Duration::from_secs(60)).await?;
        assert_eq!(store.get(&key).await?, Some("user-1".to_string()));
        assert_eq!(store.take(&key).await?, Some("user-1".to_string()));
        assert_eq!(store.take(&key).await?, None);

        store.set(&key, "true", Duration::from_secs(60)).await?;
        assert!(store.delete(&key).await?);
        assert!(!store.delete(&key).await?);
        store.ping().await
    }

    #[tokio::test]
    async fn invalid_url_is_unavailable() {
        let result = RedisSessionStore::connect("not a url").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
