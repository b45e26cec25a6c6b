//! Login, refresh, logout and session introspection.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::{
    api::{
        AppState,
        error::{ApiError, Envelope, ErrorBody},
        types::{LoginData, LoginRequest, SessionInfo, UserSummary},
    },
    credentials::{PasswordHasher, normalize_email, valid_email},
    session::{Authenticated, TokenPair, extract_bearer},
};

const LOGIN_FAILED: &str = "incorrect mail or password";

#[utoipa::path(
    post,
    path = "/v1/session",
    request_body = LoginRequest,
    responses(
        (status = 201, description = "Credentials accepted, token pair issued", body = Envelope<LoginData>),
        (status = 400, description = "Missing or malformed fields", body = ErrorBody),
        (status = 401, description = "Unknown email or wrong password", body = ErrorBody),
    ),
    tag = "session"
)]
#[instrument(skip_all)]
pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::bad_request("missing payload"));
    };

    let email = normalize_email(&request.email);
    let mut invalid = None;
    if !valid_email(&email) {
        invalid = Some(
            ApiError::bad_request("validation failed").with_field("email", "invalid email"),
        );
    }
    if request.password.is_empty() {
        invalid = Some(
            invalid
                .unwrap_or_else(|| ApiError::bad_request("validation failed"))
                .with_field("password", "required"),
        );
    }
    if let Some(err) = invalid {
        return Err(err);
    }

    let Some(user) = state.credentials.find_by_email(&email).await? else {
        debug!("login for unknown email");
        return Err(login_failed());
    };

    if !verify_password(state.hasher.clone(), request.password, user.password_hash.clone()).await {
        debug!("login with wrong password");
        return Err(login_failed());
    }

    let tokens = state.sessions.issue_pair().await?;

    info!(user_id = %user.id, "login succeeded");

    let data = LoginData {
        user: UserSummary {
            id: user.id,
            email: user.email,
        },
        tokens,
    };
    let access = data.tokens.access.clone();
    created_with_access(&access, data)
}

#[utoipa::path(
    post,
    path = "/v1/session/refresh",
    responses(
        (status = 201, description = "New token pair issued", body = Envelope<TokenPair>),
        (status = 401, description = "Missing, unknown, expired or revoked refresh token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "session"
)]
#[instrument(skip_all)]
pub async fn refresh(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers).ok_or_else(|| ApiError::unauthorized("not auth"))?;
    let tokens = state.sessions.refresh(token).await?;
    let access = tokens.access.clone();
    created_with_access(&access, tokens)
}

#[utoipa::path(
    delete,
    path = "/v1/session",
    responses(
        (status = 200, description = "Session entry removed", body = Envelope<String>),
        (status = 401, description = "Missing bearer or invalid access token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "session"
)]
#[instrument(skip_all)]
pub async fn logout(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers).ok_or_else(|| ApiError::unauthorized("not auth"))?;

    // Refresh tokens are UUIDs; anything else must be a live access token.
    if Uuid::parse_str(token).is_err() {
        state
            .sessions
            .signer()
            .verify_fresh(token, Utc::now())
            .map_err(|err| {
                debug!("logout with rejected access token: {err}");
                ApiError::unauthorized("token invalid")
            })?;
    }

    state.sessions.logout(token).await?;

    Ok((StatusCode::OK, Json(Envelope::new(StatusCode::OK, String::new()))).into_response())
}

#[utoipa::path(
    get,
    path = "/v1/session",
    responses(
        (status = 200, description = "Access token is valid", body = Envelope<SessionInfo>),
        (status = 401, description = "Missing, invalid or expired access token"),
    ),
    security(("bearer" = [])),
    tag = "session"
)]
pub async fn current(Authenticated(claims): Authenticated) -> impl IntoResponse {
    Json(Envelope::new(StatusCode::OK, SessionInfo::from(claims)))
}

fn login_failed() -> ApiError {
    ApiError::unauthorized(LOGIN_FAILED).with_field("mail", LOGIN_FAILED)
}

/// `201` with the access token mirrored in the `Authorization` header.
fn created_with_access<T: serde::Serialize>(access: &str, data: T) -> Result<Response, ApiError> {
    let value = HeaderValue::from_str(access).map_err(|err| {
        error!("Failed to build Authorization header: {err}");
        ApiError::internal()
    })?;
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok((
        StatusCode::CREATED,
        headers,
        Json(Envelope::new(StatusCode::CREATED, data)),
    )
        .into_response())
}

/// Argon2 is CPU bound, keep it off the async workers.
pub(super) async fn verify_password(
    hasher: Arc<dyn PasswordHasher>,
    password: String,
    password_hash: String,
) -> bool {
    tokio::task::spawn_blocking(move || hasher.verify(&password, &password_hash))
        .await
        .unwrap_or_else(|err| {
            error!("Password verification task failed: {err}");
            false
        })
}
