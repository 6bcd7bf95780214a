// Liveness endpoint for hosting platforms.
//
// One route, one fixed answer. It reports that the process is up, not that
// Discord or Gemini are reachable.

use axum::{http::StatusCode, routing::get, Router};
use std::net::SocketAddr;

pub const HEALTH_BODY: &str = "Bot is running";

async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, HEALTH_BODY)
}

pub fn router() -> Router {
    Router::new().route("/", get(health_check))
}

/// Serves the health route on `0.0.0.0:port` until the process exits.
pub async fn serve(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Health check listening on http://{}", addr);

    axum::serve(listener, router()).await
}
