use axum::response::IntoResponse;

// axum handler for root
pub async fn root() -> impl IntoResponse {
    format!(
        "{} {} - credential issuing and session lifecycle",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}
