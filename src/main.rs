//! Hackboard API Server
//!
//! Run with: cargo run --bin hackboard -- --config config.toml
//!
//! # Configuration
//!
//! Settings come from the TOML file (or the default search path) with
//! environment overrides:
//! - `HACKBOARD_API_HOST`, `HACKBOARD_API_PORT`: bind address (default 0.0.0.0:8090)
//! - `HACKBOARD_STORE_BACKEND`: `rest` or `memory`
//! - `HACKBOARD_STORE_URL`, `HACKBOARD_STORE_API_KEY`: hosted backend
//! - `HACKBOARD_POLL_INTERVAL_SECS`: unread badge poll interval (default 10)
//! - `HACKBOARD_IDLE_TIMEOUT_SECS`, `HACKBOARD_MAX_TRACKED_USERS`: limits on polled users
//! - `HACKBOARD_LOG_LEVEL`, `HACKBOARD_LOG_FORMAT`: logging
//! - `RUST_LOG`: overrides the log filter entirely

use clap::Parser;
use hackboard::api::{serve, AppState};
use hackboard::config::{Config, StoreBackend};
use hackboard::logging::init_tracing;
use hackboard::store::{MemoryStore, RestStore};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "hackboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Hackathon site API: chat, blog rendering and announcement badges")]
struct Args {
    /// Config file (default: search standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_tracing(&config.logging);

    tracing::info!("Starting Hackboard API server v{}", env!("CARGO_PKG_VERSION"));

    let notifications = &config.notifications;
    tracing::info!(
        "Unread poll interval: {:?}, idle timeout: {:?}, max users: {}",
        notifications.poll_interval(),
        notifications.idle_timeout(),
        notifications.max_tracked_users
    );

    let state = match config.store.backend {
        StoreBackend::Rest => {
            let store = Arc::new(RestStore::new(config.store.rest_config())?);
            tracing::info!("Using REST store at {}", store.config().base_url);

            if let Err(e) = store.health_check().await {
                tracing::warn!("Store not reachable at startup: {}", e);
                tracing::warn!("Continuing; requests will fail until it comes up");
            }

            AppState::new(store, config.api.clone(), notifications)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            AppState::new(Arc::new(MemoryStore::new()), config.api.clone(), notifications)
        }
    };

    serve(state).await?;

    Ok(())
}
