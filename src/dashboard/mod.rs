//! Dashboard — Axum web server exposing the UV and copper panels as JSON.
//!
//! CORS enabled for local development.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub use routes::{AppState, DashboardState};

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/cities", get(routes::get_cities))
        .route("/api/uv/history", get(routes::get_uv_history))
        .route("/api/uv/history.csv", get(routes::get_uv_history_csv))
        .route("/api/uv/forecast", get(routes::get_uv_forecast))
        .route("/api/copper", get(routes::get_copper))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

/// Bind `port` and serve until Ctrl+C.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard port {port}"))?;
    info!(port, "Dashboard server listening on http://localhost:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received.");
        })
        .await
        .context("Dashboard server error")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
