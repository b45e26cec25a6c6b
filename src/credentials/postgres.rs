//! Postgres-backed credential store over the `users` table (`sql/schema.sql`).

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgPoolOptions};
use std::time::Duration;
use tracing::{Instrument, error, info_span};
use uuid::Uuid;

use super::{CredentialError, CredentialStore, UserRecord};

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small pool against `dsn`.
    ///
    /// # Errors
    /// [`CredentialError::Unavailable`] if the first connection fails.
    pub async fn connect(dsn: &str) -> Result<Self, CredentialError> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .map_err(|err| CredentialError::Unavailable(err.to_string()))?;
        Ok(Self { pool })
    }
}

fn query_error(err: sqlx::Error) -> CredentialError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            CredentialError::Unavailable(err.to_string())
        }
        other => CredentialError::Query(other.to_string()),
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, CredentialError> {
        let query = "SELECT id::text AS id, email, password_hash FROM users WHERE email = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| {
                error!("Failed to look up user by email: {}", err);
                query_error(err)
            })?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(UserRecord {
            id: row.try_get("id").map_err(query_error)?,
            email: row.try_get("email").map_err(query_error)?,
            password_hash: row.try_get("password_hash").map_err(query_error)?,
        }))
    }

    async fn update_password(
        &self,
        user_id: &str,
        password_hash: &str,
    ) -> Result<bool, CredentialError> {
        // Ids that are not UUIDs cannot match the column.
        let Ok(user_id) = Uuid::parse_str(user_id) else {
            return Ok(false);
        };
        let query = "UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| {
                error!("Failed to update password: {}", err);
                query_error(err)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), CredentialError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(query_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::{PgConnectOptions, PgSslMode};

    fn unreachable_pool() -> PgPool {
        let options = PgConnectOptions::new()
            .host("127.0.0.1")
            .port(1)
            .username("invalid")
            .database("invalid")
            .ssl_mode(PgSslMode::Disable);
        PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy_with(options)
    }

    #[tokio::test]
    async fn find_by_email_fails_without_db() {
        let store = PgCredentialStore::new(unreachable_pool());
        let result = store.find_by_email("alice@example.com").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn update_password_skips_non_uuid_ids() -> Result<(), CredentialError> {
        let store = PgCredentialStore::new(unreachable_pool());
        assert!(!store.update_password("not-a-uuid", "hash").await?);
        Ok(())
    }

    #[tokio::test]
    async fn ping_fails_without_db() {
        let store = PgCredentialStore::new(unreachable_pool());
        assert!(store.ping().await.is_err());
    }
}
