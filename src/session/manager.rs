//! Token pair issuance, refresh, revocation and recovery links.
//!
//! The manager owns no mutable state of its own. Everything that can be
//! revoked lives in the [`SessionStore`]; access tokens are stateless and stay
//! valid until `exp`, so revocation works by refusing to refresh.
//!
//! Refresh tokens are reusable until their TTL or an explicit logout unless
//! [`SessionConfig::with_rotate_refresh_tokens`] is enabled, in which case each
//! refresh consumes the presented token.

use chrono::Utc;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{error::SessionError, signer::TokenSigner, store::SessionStore};

/// Stored value marking a refresh token as present.
pub const REFRESH_SENTINEL: &str = "true";

const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: u64 = 60 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;
const DEFAULT_RECOVERY_TOKEN_TTL_SECONDS: u64 = 60 * 60;

/// Upper bound for every token TTL (ten years).
pub const MAX_TOKEN_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct SessionConfig {
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
    recovery_token_ttl: Duration,
    rotate_refresh_tokens: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            access_token_ttl: Duration::from_secs(DEFAULT_ACCESS_TOKEN_TTL_SECONDS),
            refresh_token_ttl: Duration::from_secs(DEFAULT_REFRESH_TOKEN_TTL_SECONDS),
            recovery_token_ttl: Duration::from_secs(DEFAULT_RECOVERY_TOKEN_TTL_SECONDS),
            rotate_refresh_tokens: false,
        }
    }

    #[must_use]
    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_recovery_token_ttl(mut self, ttl: Duration) -> Self {
        self.recovery_token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_rotate_refresh_tokens(mut self, rotate: bool) -> Self {
        self.rotate_refresh_tokens = rotate;
        self
    }

    #[must_use]
    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    #[must_use]
    pub fn refresh_token_ttl(&self) -> Duration {
        self.refresh_token_ttl
    }

    #[must_use]
    pub fn recovery_token_ttl(&self) -> Duration {
        self.recovery_token_ttl
    }

    #[must_use]
    pub fn rotate_refresh_tokens(&self) -> bool {
        self.rotate_refresh_tokens
    }

    /// Store TTLs are whole seconds and Redis rejects `EX 0`.
    ///
    /// # Errors
    /// Returns [`SessionError::Config`] when a TTL is shorter than one second
    /// or longer than [`MAX_TOKEN_TTL_SECONDS`].
    pub fn validate(&self) -> Result<(), SessionError> {
        check_ttl(
            self.access_token_ttl,
            "access token TTL must be between 1s and 10 years",
        )?;
        check_ttl(
            self.refresh_token_ttl,
            "refresh token TTL must be between 1s and 10 years",
        )?;
        check_ttl(
            self.recovery_token_ttl,
            "recovery token TTL must be between 1s and 10 years",
        )
    }
}

fn check_ttl(ttl: Duration, message: &'static str) -> Result<(), SessionError> {
    let seconds = ttl.as_secs();
    if seconds == 0 || seconds > MAX_TOKEN_TTL_SECONDS {
        return Err(SessionError::Config(message));
    }
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .map(|_| ())
        .ok_or(SessionError::Config(message))
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub struct SessionManager {
    signer: TokenSigner,
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
}

impl SessionManager {
    /// # Errors
    /// Returns [`SessionError::Config`] if `config` does not validate.
    pub fn new(
        signer: TokenSigner,
        store: Arc<dyn SessionStore>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self {
            signer,
            store,
            config,
        })
    }

    #[must_use]
    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    #[must_use]
    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    /// Mint an access token and a persisted refresh token.
    ///
    /// Nothing is returned unless the refresh token has been written.
    ///
    /// # Errors
    /// [`SessionError::Signing`] or [`SessionError::Store`].
    #[instrument(skip(self))]
    pub async fn issue_pair(&self) -> Result<TokenPair, SessionError> {
        let access_ttl = chrono::Duration::from_std(self.config.access_token_ttl)
            .map_err(|_| SessionError::Config("access token TTL out of range"))?;
        let expires_at = Utc::now()
            .checked_add_signed(access_ttl)
            .ok_or(SessionError::Config("access token TTL out of range"))?;
        let access = self.signer.issue(expires_at)?;

        let refresh = Uuid::new_v4().to_string();
        self.store
            .set(&refresh, REFRESH_SENTINEL, self.config.refresh_token_ttl)
            .await?;

        debug!("issued token pair");

        Ok(TokenPair { access, refresh })
    }

    /// Exchange a live refresh token for a new pair.
    ///
    /// # Errors
    /// [`SessionError::InvalidRefreshToken`] if the token is unknown, expired,
    /// revoked, not a refresh token, or the lookup fails. Issuance failures
    /// surface as in [`SessionManager::issue_pair`] and leave the presented
    /// token untouched.
    #[instrument(skip_all, fields(rotate = self.config.rotate_refresh_tokens))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        let refresh_token = refresh_token.trim();
        if Uuid::parse_str(refresh_token).is_err() {
            debug!("refresh token is not a UUID");
            return Err(SessionError::InvalidRefreshToken);
        }

        match self.store.get(refresh_token).await {
            Ok(Some(value)) if value == REFRESH_SENTINEL => {}
            Ok(Some(_)) => {
                warn!("recovery token presented as refresh token");
                return Err(SessionError::InvalidRefreshToken);
            }
            Ok(None) => return Err(SessionError::InvalidRefreshToken),
            Err(err) => {
                error!("Failed to look up refresh token: {err}");
                return Err(SessionError::InvalidRefreshToken);
            }
        }

        let pair = self.issue_pair().await?;

        // The old token is consumed only once its replacement is stored, and
        // only the caller whose `take` wins keeps the new pair.
        if self.config.rotate_refresh_tokens {
            match self.store.take(refresh_token).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    self.discard(&pair.refresh).await;
                    return Err(SessionError::InvalidRefreshToken);
                }
                Err(err) => {
                    error!("Failed to consume refresh token: {err}");
                    self.discard(&pair.refresh).await;
                    return Err(SessionError::InvalidRefreshToken);
                }
            }
        }

        Ok(pair)
    }

    async fn discard(&self, refresh_token: &str) {
        if let Err(err) = self.store.delete(refresh_token).await {
            warn!("Failed to discard losing refresh token: {err}");
        }
    }

    /// Delete the store entry for `token`. Absent keys count as success.
    ///
    /// # Errors
    /// [`SessionError::Store`] if the delete command fails.
    #[instrument(skip_all)]
    pub async fn logout(&self, token: &str) -> Result<(), SessionError> {
        let removed = self.store.delete(token.trim()).await?;
        debug!(removed, "session entry deleted");
        Ok(())
    }

    /// Mint a recovery token bound to `user_id`.
    ///
    /// # Errors
    /// [`SessionError::Store`] if the token cannot be persisted.
    #[instrument(skip(self))]
    pub async fn request_recovery(&self, user_id: &str) -> Result<String, SessionError> {
        let token = Uuid::new_v4().to_string();
        self.store
            .set(&token, user_id, self.config.recovery_token_ttl)
            .await?;
        Ok(token)
    }

    /// Look up the user bound to a recovery token without consuming it.
    ///
    /// Prefer [`SessionManager::take_recovery`]; a caller using this must
    /// delete the token itself or it stays replayable until its TTL.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] for unknown or expired tokens,
    /// [`SessionError::Store`] if the lookup fails.
    #[instrument(skip_all)]
    pub async fn redeem_recovery(&self, recovery_token: &str) -> Result<String, SessionError> {
        let recovery_token = recovery_token.trim();
        if Uuid::parse_str(recovery_token).is_err() {
            return Err(SessionError::NotFound);
        }
        let value = self.store.get(recovery_token).await?;
        recovery_user(value)
    }

    /// Look up and delete a recovery token in one step.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] for unknown, expired or already used tokens,
    /// [`SessionError::Store`] if the lookup fails.
    #[instrument(skip_all)]
    pub async fn take_recovery(&self, recovery_token: &str) -> Result<String, SessionError> {
        let recovery_token = recovery_token.trim();
        if Uuid::parse_str(recovery_token).is_err() {
            return Err(SessionError::NotFound);
        }
        // A refresh token must not be consumed through this path, so peek first.
        match self.store.get(recovery_token).await? {
            Some(value) if value == REFRESH_SENTINEL => return Err(SessionError::NotFound),
            None => return Err(SessionError::NotFound),
            Some(_) => {}
        }
        let value = self.store.take(recovery_token).await?;
        recovery_user(value)
    }
}

fn recovery_user(value: Option<String>) -> Result<String, SessionError> {
    match value {
        Some(user_id) if user_id != REFRESH_SENTINEL && !user_id.is_empty() => Ok(user_id),
        _ => Err(SessionError::NotFound),
    }
}
