//! Password recovery: link issuance and redemption.

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::{
    api::{
        AppState,
        error::{ApiError, Envelope, ErrorBody},
        types::{RecoveryRequest, ResetPasswordRequest},
    },
    credentials::{CredentialError, PasswordHasher, normalize_email, valid_email},
    mail::{RecoveryMessage, build_recovery_url},
};

const PASSWORD_MISMATCH: &str = "incorrect new password";

#[utoipa::path(
    post,
    path = "/v1/session/recovery",
    request_body = RecoveryRequest,
    responses(
        (status = 204, description = "Recovery link sent"),
        (status = 400, description = "Missing or malformed email", body = ErrorBody),
        (status = 404, description = "No account for this email", body = ErrorBody),
        (status = 500, description = "Link could not be delivered", body = ErrorBody),
    ),
    tag = "recovery"
)]
#[instrument(skip_all)]
pub async fn request_recovery(
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<RecoveryRequest>>,
) -> Result<Response, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::bad_request("missing payload"));
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(ApiError::bad_request("validation failed").with_field("email", "invalid email"));
    }

    let Some(user) = state.credentials.find_by_email(&email).await? else {
        debug!("recovery requested for unknown email");
        return Err(ApiError::not_found());
    };

    let token = state.sessions.request_recovery(&user.id).await?;
    let message = RecoveryMessage {
        to_email: user.email,
        link: build_recovery_url(&state.frontend_base_url, &token),
    };

    if let Err(err) = state.mailer.send(&message).await {
        error!("Failed to deliver recovery link: {err:#}");
        // An undeliverable token is useless, drop it.
        if let Err(err) = state.sessions.logout(&token).await {
            error!("Failed to delete undelivered recovery token: {err}");
        }
        return Err(ApiError::internal());
    }

    info!(user_id = %user.id, "recovery link issued");

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[utoipa::path(
    post,
    path = "/v1/session/recovery/{token}",
    params(
        ("token" = String, Path, description = "Recovery token from the emailed link")
    ),
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = Envelope<String>),
        (status = 400, description = "Passwords empty or not matching", body = ErrorBody),
        (status = 404, description = "Unknown, expired or already used token", body = ErrorBody),
    ),
    tag = "recovery"
)]
#[instrument(skip_all)]
pub async fn reset_password(
    Extension(state): Extension<Arc<AppState>>,
    Path(token): Path<String>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<Response, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::bad_request("missing payload"));
    };

    if request.password.is_empty() || request.password != request.retry_password {
        return Err(ApiError::bad_request("validation failed")
            .with_field("retryPassword", PASSWORD_MISMATCH));
    }

    // Consumed before the write: a failed update means requesting a new link.
    let user_id = state.sessions.take_recovery(&token).await?;

    let password_hash = hash_password(state.hasher.clone(), request.password).await?;
    if !state
        .credentials
        .update_password(&user_id, &password_hash)
        .await?
    {
        debug!("recovery token pointed at a missing user");
        return Err(ApiError::not_found());
    }

    info!(user_id = %user_id, "password reset through recovery link");

    Ok((StatusCode::OK, Json(Envelope::new(StatusCode::OK, String::new()))).into_response())
}

async fn hash_password(
    hasher: Arc<dyn PasswordHasher>,
    password: String,
) -> Result<String, CredentialError> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|err| {
            error!("Password hashing task failed: {err}");
            CredentialError::Hash
        })?
}
