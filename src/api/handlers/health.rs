//! Health probe for passage.
//!
//! `/health` pings both backing stores with a short timeout and reports each
//! one separately so operators can tell a Redis outage from a Postgres one.

use crate::{GIT_COMMIT_HASH, api::AppState};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::{future::Future, sync::Arc};
use tokio::time::{Duration, timeout};
use tracing::{Instrument, debug, error, info_span, warn};
use utoipa::ToSchema;

const HEALTH_PROBE_TIMEOUT_SECONDS: u64 = 2;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    session_store: String,
    credential_store: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Both stores are reachable", body = Health),
        (status = 503, description = "At least one store is unreachable", body = Health)
    ),
    tag = "health",
)]
/// Report the health of the session and credential stores.
pub async fn health(
    method: Method,
    Extension(state): Extension<Arc<AppState>>,
) -> impl IntoResponse {
    let session_store_healthy = probe(
        "session_store",
        async { state.sessions.store().ping().await.map_err(|err| err.to_string()) }
            .instrument(info_span!("redis.ping", db.system = "redis", db.operation = "PING")),
    )
    .await;

    let credential_store_healthy = probe(
        "credential_store",
        async { state.credentials.ping().await.map_err(|err| err.to_string()) }.instrument(
            info_span!("db.ping", db.system = "postgresql", db.operation = "PING"),
        ),
    )
    .await;

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        session_store: status_label(session_store_healthy),
        credential_store: status_label(credential_store_healthy),
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let headers = x_app_headers(&health);

    if session_store_healthy && credential_store_healthy {
        (StatusCode::OK, headers, body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}

async fn probe<F>(name: &str, check: F) -> bool
where
    F: Future<Output = Result<(), String>>,
{
    match timeout(Duration::from_secs(HEALTH_PROBE_TIMEOUT_SECONDS), check).await {
        Ok(Ok(())) => {
            debug!("{name} is healthy");
            true
        }
        Ok(Err(err)) => {
            error!("Failed to ping {name}: {err}");
            false
        }
        Err(_) => {
            warn!("{name} health check timed out");
            false
        }
    }
}

fn status_label(healthy: bool) -> String {
    let label = if healthy { "ok" } else { "error" };
    label.to_string()
}

fn x_app_headers(health: &Health) -> HeaderMap {
    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .map_err(|err| {
            debug!("Failed to parse X-App header: {}", err);
        })
        .unwrap_or_else(|()| HeaderMap::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn probe_reports_success_and_failure() {
        assert!(probe("ok", async { Ok(()) }).await);
        assert!(!probe("err", async { Err("down".to_string()) }).await);
    }

    #[test]
    fn x_app_header_uses_short_hash() {
        let health = Health {
            commit: "0123456789abcdef".to_string(),
            name: "passage".to_string(),
            version: "0.1.0".to_string(),
            session_store: "ok".to_string(),
            credential_store: "ok".to_string(),
        };
        let headers = x_app_headers(&health);
        assert_eq!(
            headers.get("X-App").and_then(|value| value.to_str().ok()),
            Some("passage:0.1.0:0123456")
        );
    }
}
