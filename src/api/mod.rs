//! Hackboard REST API
//!
//! HTTP API layer for the hackathon site, built with Axum. Callers are
//! identified by the `x-user-id` header set by the auth proxy in front.
//!
//! # Endpoints
//!
//! ## Render
//! - `POST /api/v1/render/chat` - Render chat text for a viewer
//! - `POST /api/v1/render/blog` - Render a blog post (JSON blocks or HTML)
//!
//! ## Chat
//! - `GET /api/v1/chat/messages` - Recent messages
//! - `POST /api/v1/chat/messages` - Send a message
//!
//! ## Announcements
//! - `GET /api/v1/announcements/unread` - Unread count for the caller
//! - `POST /api/v1/announcements/read-all` - Mark everything read
//! - `DELETE /api/v1/announcements/tracking` - Stop polling for the caller
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use hackboard::api::{serve, AppState};
//! use hackboard::config::{ApiConfig, NotificationsConfig};
//! use hackboard::store::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::with_announcements(["welcome"]));
//!     let state = AppState::new(store, ApiConfig::default(), &NotificationsConfig::default());
//!     serve(state).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Render routes
        .route("/render/chat", post(routes::render::render_chat))
        .route("/render/blog", post(routes::render::render_blog))
        // Chat routes
        .route(
            "/chat/messages",
            get(routes::chat::list_messages).post(routes::chat::post_message),
        )
        // Announcement routes
        .route(
            "/announcements/unread",
            get(routes::announcements::get_unread),
        )
        .route(
            "/announcements/read-all",
            post(routes::announcements::read_all),
        )
        .route(
            "/announcements/tracking",
            delete(routes::announcements::stop_tracking),
        );

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config.cors_origins);
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Start the API server
pub async fn serve(state: AppState) -> Result<(), ApiError> {
    let addr = state.config.addr();
    let unread = Arc::clone(&state.unread);
    unread.spawn_sweeper();
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Hackboard API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    unread.shutdown().await;
    tracing::info!("Hackboard API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
