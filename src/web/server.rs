//! Web server implementation using axum

use anyhow::{Context, Result};
use axum::http::{HeaderName, Method};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Settings;

use super::api::{self, ApiState};

/// Build the application router
pub fn build_router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([HeaderName::from_static("content-type")]);

    Router::new()
        .route("/resource-share/increment", post(api::record_increment))
        .route("/recommendation/{name}", get(api::get_recommendation))
        .route("/quota", post(api::record_quota))
        .route("/quota/latest", get(api::get_latest_quota))
        .route("/resource/today/{name}", get(api::get_today_share))
        .route("/resource/summary", get(api::get_summary))
        .route("/status", get(api::get_status))
        .route("/identities", get(api::get_identities))
        .route("/health", get(api::health))
        .with_state(state)
        .layer(cors)
}

/// HTTP server for agents and dashboards
pub struct WebServer {
    settings: Settings,
    state: Arc<ApiState>,
}

impl WebServer {
    /// Create a new web server
    pub fn new(settings: Settings, state: Arc<ApiState>) -> Self {
        Self { settings, state }
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.settings.web.host, self.settings.web.port);
        let app = build_router(self.state);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        tracing::info!("Resource-share server listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Resource-share server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
