//! Access token signing and verification.
//!
//! Access tokens are HS256 JWTs whose claims are exactly `iat` and `exp`.
//!
//! > **Warning:** [`TokenSigner::verify`] only proves authenticity. It does not
//! > reject expired tokens. Anything that admits a request must go through
//! > [`TokenSigner::verify_fresh`], which is what the auth guard and the logout
//! > handler use.

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("signing secret must not be empty")]
    EmptySecret,
    #[error("failed to sign access token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct AccessClaims {
    pub iat: i64,
    pub exp: i64,
}

impl AccessClaims {
    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// A token is expired once `now` reaches `exp`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

/// Stateless signer holding the process-wide HMAC secret.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    /// Build a signer from the configured secret.
    ///
    /// # Errors
    /// Returns [`SignerError::EmptySecret`] if the secret is blank.
    pub fn new(secret: &SecretString) -> Result<Self, SignerError> {
        let secret = secret.expose_secret();
        if secret.trim().is_empty() {
            return Err(SignerError::EmptySecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Freshness is checked by `verify_fresh`, never by the decoder.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Sign a token issued now that expires at `expires_at`.
    ///
    /// # Errors
    /// Returns [`SignerError::Signing`] if the claims cannot be encoded.
    pub fn issue(&self, expires_at: DateTime<Utc>) -> Result<String, SignerError> {
        let claims = AccessClaims {
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(SignerError::Signing)
    }

    /// Check signature and structure. Expired tokens pass.
    ///
    /// # Errors
    /// Returns [`SignerError::InvalidSignature`] for a forged or foreign token
    /// and [`SignerError::Malformed`] for anything that is not a well-formed JWT.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, SignerError> {
        decode::<AccessClaims>(token.trim(), &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::InvalidSignature => SignerError::InvalidSignature,
                _ => SignerError::Malformed,
            })
    }

    /// Check signature, structure and expiry against `now`.
    ///
    /// # Errors
    /// Same as [`TokenSigner::verify`], plus [`SignerError::Expired`].
    pub fn verify_fresh(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessClaims, SignerError> {
        let claims = self.verify(token)?;
        if claims.is_expired_at(now) {
            return Err(SignerError::Expired);
        }
        Ok(claims)
    }
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("algorithm", &"HS256")
            .field("secret", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn signer(secret: &str) -> Result<TokenSigner, SignerError> {
        TokenSigner::new(&SecretString::from(secret.to_string()))
    }

    #[test]
    fn rejects_empty_secret() {
        assert!(matches!(signer("  "), Err(SignerError::EmptySecret)));
    }

    #[test]
    fn issued_token_verifies_with_exact_claims() -> Result<(), SignerError> {
        let signer = signer("test-secret")?;
        let expires_at = Utc::now() + Duration::hours(1);
        let token = signer.issue(expires_at)?;

        let claims = signer.verify_fresh(&token, Utc::now())?;
        assert_eq!(claims.exp, expires_at.timestamp());
        assert!(claims.iat <= claims.exp);
        Ok(())
    }

    #[test]
    fn past_expiry_is_authentic_but_not_usable() -> Result<(), SignerError> {
        let signer = signer("test-secret")?;
        let token = signer.issue(Utc::now() - Duration::minutes(5))?;

        // Signature-valid...
        let claims = signer.verify(&token)?;
        assert!(claims.is_expired_at(Utc::now()));
        // ...but rejected by the freshness check.
        assert!(matches!(
            signer.verify_fresh(&token, Utc::now()),
            Err(SignerError::Expired)
        ));
        Ok(())
    }

    #[test]
    fn expiry_boundary_is_exclusive() -> Result<(), SignerError> {
        let signer = signer("test-secret")?;
        let expires_at = Utc::now() + Duration::seconds(30);
        let token = signer.issue(expires_at)?;

        let at_exp = DateTime::from_timestamp(expires_at.timestamp(), 0).unwrap_or(expires_at);
        assert!(matches!(
            signer.verify_fresh(&token, at_exp),
            Err(SignerError::Expired)
        ));
        assert!(
            signer
                .verify_fresh(&token, at_exp - Duration::seconds(1))
                .is_ok()
        );
        Ok(())
    }

    #[test]
    fn foreign_secret_is_invalid_signature() -> Result<(), SignerError> {
        let issuer = signer("secret-a")?;
        let verifier = signer("secret-b")?;
        let token = issuer.issue(Utc::now() + Duration::hours(1))?;
        assert!(matches!(
            verifier.verify(&token),
            Err(SignerError::InvalidSignature)
        ));
        Ok(())
    }

    #[test]
    fn garbage_is_malformed() -> Result<(), SignerError> {
        let signer = signer("test-secret")?;
        assert!(matches!(signer.verify("not-a-jwt"), Err(SignerError::Malformed)));
        assert!(matches!(
            signer.verify("6f1c1f5e-8f5e-4c57-9d7b-0c2d0f3f8a11"),
            Err(SignerError::Malformed)
        ));
        Ok(())
    }

    #[test]
    fn debug_hides_secret() -> Result<(), SignerError> {
        let signer = signer("super-secret-value")?;
        let rendered = format!("{signer:?}");
        assert!(!rendered.contains("super-secret-value"));
        Ok(())
    }
}
