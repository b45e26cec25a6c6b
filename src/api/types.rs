//! Request/response types for the session endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::session::{AccessClaims, TokenPair};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    #[serde(alias = "mail")]
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RecoveryRequest {
    #[serde(alias = "mail")]
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub password: String,
    #[serde(rename = "retryPassword")]
    pub retry_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct LoginData {
    pub user: UserSummary,
    pub tokens: TokenPair,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionInfo {
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<AccessClaims> for SessionInfo {
    fn from(claims: AccessClaims) -> Self {
        Self {
            issued_at: claims.issued_at(),
            expires_at: claims.expires_at(),
        }
    }
}
