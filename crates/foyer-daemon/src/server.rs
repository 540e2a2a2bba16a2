//! Web server setup and routing

use anyhow::Result;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::api;
use crate::state::AppState;

/// Run the web server
pub async fn run(state: Arc<AppState>, bind: &str) -> Result<()> {
    let app = Router::new()
        // API routes
        .route("/api/devices", post(api::ingest_devices))
        .route("/api/devices", get(api::list_devices))
        .route("/api/known-devices", get(api::list_known_devices))
        .route("/api/devices/{mac}/name", put(api::rename_device))
        .route("/api/devices/{mac}/priority", put(api::reprioritize_device))
        .route("/api/devices/{mac}/preferences", put(api::update_preferences))
        .route("/api/weather", get(api::get_weather))
        // Static files for the display client
        .fallback_service(ServeDir::new(&state.config.daemon.web_root))
        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // State
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, "Starting web server");
    axum::serve(listener, app).await?;
    Ok(())
}
