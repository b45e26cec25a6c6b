//! Response envelopes and the mapping from library errors to HTTP.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::error;
use utoipa::ToSchema;

use crate::{credentials::CredentialError, session::SessionError};

/// Success envelope: `{ "data": …, "status": <u16>, "message": "Success" }`.
#[derive(ToSchema, Serialize, Debug)]
pub struct Envelope<T> {
    pub data: T,
    pub status: u16,
    pub message: String,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        Self {
            data,
            status: status.as_u16(),
            message: "Success".to_string(),
        }
    }
}

#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    errors: Option<BTreeMap<String, String>>,
}

impl ApiError {
    fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
            errors: None,
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: &str, message: &str) -> Self {
        self.errors
            .get_or_insert_with(BTreeMap::new)
            .insert(field.to_string(), message.to_string());
        self
    }

    #[must_use]
    pub fn bad_request(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not found")
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: self.status.as_u16(),
            message: self.message,
            errors: self.errors,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidRefreshToken => Self::unauthorized("invalid refresh token"),
            SessionError::NotFound => Self::not_found(),
            other => {
                error!("Session operation failed: {other}");
                Self::internal()
            }
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        error!("Credential operation failed: {err}");
        Self::internal()
    }
}
