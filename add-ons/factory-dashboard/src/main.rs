//! AI Factory dashboard: six tabs over the Universal Data Hub extension, the AI
//! orchestrator, the memory store and n8n. Starts in degraded mode when any of them is missing.

mod html;
mod plugin_loader;
mod routes;
mod state;
mod views;

use std::sync::Arc;
use std::time::Duration;

use factory_core::{FactoryConfig, LiveCollaborators, Secrets};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::state::{spawn_session_sweeper, AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[factory-dashboard] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = FactoryConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Invalid dashboard configuration ({}); using defaults", e);
        FactoryConfig::default()
    });
    let secrets = Secrets::load(&config.secrets_path()).unwrap_or_else(|e| {
        tracing::warn!("{}; continuing without secrets file", e);
        Secrets::default()
    });

    // Resolved exactly once, before any request is served.
    let registry = plugin_loader::initialize_registry(&config);
    if registry.is_degraded() {
        tracing::warn!("Universal Data Hub unavailable: dashboard runs in degraded mode");
    }

    let bind_addr = config.bind_addr.clone();
    let idle_timeout = Duration::from_secs(config.session_idle_secs);
    let max_sessions = config.max_sessions;
    let state = AppState::new(registry, Arc::new(LiveCollaborators::new(config, secrets)))
        .with_session_limits(idle_timeout, max_sessions);
    spawn_session_sweeper(state.clone());
    let app = routes::build_app(state);

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Cannot bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("🏭 AI Factory dashboard listening on http://{}", bind_addr);
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
