//! Bearer check for protected routes.
//!
//! The guard only decides authenticity and freshness of an access token. It
//! never touches the session store, so logout does not shorten the life of an
//! access token that is already out.

use axum::{
    Extension, Json,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::signer::{AccessClaims, SignerError, TokenSigner};
use crate::api::AppState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuardRejection {
    #[error("missing bearer token")]
    Missing,
    #[error("invalid access token: {0}")]
    Invalid(String),
    #[error("access token expired")]
    Expired,
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "message": self.to_string(),
            "status": StatusCode::UNAUTHORIZED.as_u16(),
        }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Read the token from `Authorization`, with or without a `Bearer ` prefix.
#[must_use]
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => value,
    };
    (!token.is_empty()).then_some(token)
}

pub struct AuthGuard;

impl AuthGuard {
    /// # Errors
    /// Returns a [`GuardRejection`] when the header is absent or the token is
    /// not an authentic, unexpired access token.
    pub fn check(
        headers: &HeaderMap,
        signer: &TokenSigner,
    ) -> Result<AccessClaims, GuardRejection> {
        let token = extract_bearer(headers).ok_or(GuardRejection::Missing)?;
        signer.verify_fresh(token, Utc::now()).map_err(|err| {
            debug!("access token rejected: {err}");
            match err {
                SignerError::Expired => GuardRejection::Expired,
                other => GuardRejection::Invalid(other.to_string()),
            }
        })
    }
}

/// Extractor that admits a request only with a fresh access token.
pub struct Authenticated(pub AccessClaims);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(app) = Extension::<Arc<AppState>>::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        AuthGuard::check(&parts.headers, app.sessions.signer())
            .map(Authenticated)
            .map_err(IntoResponse::into_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use secrecy::SecretString;

    fn signer() -> Result<TokenSigner, SignerError> {
        TokenSigner::new(&SecretString::from("guard-secret".to_string()))
    }

    fn headers(value: &str) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value)?);
        Ok(headers)
    }

    #[test]
    fn extract_bearer_accepts_raw_and_prefixed() -> anyhow::Result<()> {
        assert_eq!(extract_bearer(&headers("abc")?), Some("abc"));
        assert_eq!(extract_bearer(&headers("Bearer abc")?), Some("abc"));
        assert_eq!(extract_bearer(&headers("bearer  abc ")?), Some("abc"));
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
        Ok(())
    }

    #[test]
    fn check_admits_fresh_token() -> anyhow::Result<()> {
        let signer = signer()?;
        let token = signer.issue(Utc::now() + chrono::Duration::minutes(5))?;
        let claims = AuthGuard::check(&headers(&format!("Bearer {token}"))?, &signer)?;
        assert!(claims.exp > Utc::now().timestamp());
        Ok(())
    }

    #[test]
    fn check_rejects_missing_expired_and_forged() -> anyhow::Result<()> {
        let signer = signer()?;
        assert_eq!(
            AuthGuard::check(&HeaderMap::new(), &signer),
            Err(GuardRejection::Missing)
        );

        let expired = signer.issue(Utc::now() - chrono::Duration::seconds(1))?;
        assert_eq!(
            AuthGuard::check(&headers(&expired)?, &signer),
            Err(GuardRejection::Expired)
        );

        let other = TokenSigner::new(&SecretString::from("someone-else".to_string()))?;
        let forged = other.issue(Utc::now() + chrono::Duration::minutes(5))?;
        assert!(matches!(
            AuthGuard::check(&headers(&forged)?, &signer),
            Err(GuardRejection::Invalid(_))
        ));

        // A refresh token is not an access token.
        let refresh = uuid::Uuid::new_v4().to_string();
        assert!(matches!(
            AuthGuard::check(&headers(&refresh)?, &signer),
            Err(GuardRejection::Invalid(_))
        ));
        Ok(())
    }
}
