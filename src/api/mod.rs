//! HTTP surface: router wiring, shared state and the server loop.

use crate::{
    credentials::{CredentialStore, PasswordHasher},
    mail::RecoveryMailer,
    session::SessionManager,
};
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, options},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer, request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, debug_span, error, info};
use ulid::Ulid;
use url::Url;

pub mod error;
pub mod handlers;
pub mod openapi;
pub mod types;

pub use error::{ApiError, Envelope};
pub use openapi::openapi;

use handlers::{health, root};

/// Everything a handler needs, shared through an `Extension`.
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub credentials: Arc<dyn CredentialStore>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub mailer: Arc<dyn RecoveryMailer>,
    pub frontend_base_url: String,
}

/// Build the full application: documented routes, undocumented extras and
/// the middleware stack.
///
/// # Errors
/// Returns an error if `frontend_base_url` is not an absolute URL.
pub fn app(state: Arc<AppState>) -> Result<Router> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_origin(frontend_origin(&state.frontend_base_url)?)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .expose_headers([AUTHORIZATION]);

    let (router, _openapi) = openapi::api_router().split_for_parts();
    let app = router
        .route("/", get(root::root))
        .route("/health", options(health::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(state)),
        );

    Ok(app)
}

/// Serve until Ctrl-C or SIGTERM.
///
/// # Errors
/// Returns an error if the listener cannot bind or the server fails.
pub async fn new(port: u16, state: Arc<AppState>) -> Result<()> {
    let app = app(state)?;

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gracefully shutdown");

    Ok(())
}

/// CORS origin (`scheme://host[:port]`) of the frontend.
fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let url = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let origin = url.origin().ascii_serialization();
    if origin == "null" {
        anyhow::bail!("Frontend base URL has no origin: {frontend_base_url}");
    }
    HeaderValue::from_str(&origin).context("Frontend origin is not a valid header value")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let method = request.method();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    // Headers stay out of the span, they carry bearer tokens.
    debug_span!("http.request", %method, path, request_id)
}
