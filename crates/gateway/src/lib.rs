//! HTTP gateway for LingoChat.
//!
//! Serves the embedded chat page and the v1 session API. Each browser tab
//! holds one session id; the server keeps the conversation.
//!
//! Built on Axum.

pub mod api;
pub mod frontend;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use lingochat_agent::SessionSettings;
use lingochat_config::AppConfig;

pub use api::{ApiState, SessionRegistry, SharedApiState};

/// Request bodies above this size are rejected.
pub const BODY_LIMIT_BYTES: usize = 64 * 1024;

/// Build the full router: health, page, and the v1 API.
///
/// Layers applied:
/// - CORS for `cors_origin` when one is configured (the page itself is
///   same-origin)
/// - Request body size limit (64 KiB)
/// - HTTP trace logging
pub fn build_router(state: SharedApiState, cors_origin: Option<&str>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api::v1_router(state))
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES));

    if let Some(origin) = cors_origin {
        match origin.parse::<HeaderValue>() {
            Ok(value) => {
                let cors = CorsLayer::new()
                    .allow_origin(AllowOrigin::exact(value))
                    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                    .allow_headers([header::CONTENT_TYPE])
                    .max_age(std::time::Duration::from_secs(3600));
                router = router.layer(cors);
            }
            Err(_) => warn!(origin = %origin, "Ignoring invalid CORS origin"),
        }
    }

    router.layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server and run until Ctrl+C.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = lingochat_providers::build_from_config(&config)?;
    let settings = Arc::new(SessionSettings::from_config(&config)?);
    let state = Arc::new(ApiState::new(
        provider,
        settings,
        config.gateway.max_sessions,
    ));

    let app = build_router(state, config.gateway.cors_origin.as_deref());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, model = %config.model, "Gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
