mod auth;
mod booking;
mod config;
mod db;
mod geometry;
mod handlers;
mod links;
mod models;
mod provisioning;
mod router;
mod teardown;
mod ws;

use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use booking::ReservationManager;
use config::Config;
use db::Store;
use links::LinkOrchestrator;
use provisioning::{InterconnectClient, LinkProvisioner};
use teardown::TopologyTeardown;
use ws::Hub;

/// Application state shared across handlers
pub struct AppState {
    pub store: Store,
    pub config: Config,
    pub ws_hub: Option<Arc<Hub>>,
    pub reservations: ReservationManager,
    pub links: LinkOrchestrator,
    pub teardown: TopologyTeardown,
}

impl AppState {
    /// Wire the services on top of a store, hub and link provisioner
    pub fn new(
        store: Store,
        config: Config,
        ws_hub: Option<Arc<Hub>>,
        provisioner: Arc<dyn LinkProvisioner>,
    ) -> Self {
        let reservations = ReservationManager::new(store.clone(), ws_hub.clone(), config.admin_force_unbook);
        let links = LinkOrchestrator::new(store.clone(), provisioner, ws_hub.clone());
        let teardown = TopologyTeardown::new(store.clone(), links.clone(), reservations.clone());
        Self {
            store,
            config,
            ws_hub,
            reservations,
            links,
            teardown,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "labforge=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut cfg = Config::load();
    if cfg.jwt_secret.is_empty() {
        tracing::warn!("JWT_SECRET not set - generating random secret (tokens will be invalidated on restart)");
        cfg.jwt_secret = uuid::Uuid::new_v4().to_string();
    }
    tracing::info!("Starting LabForge Server");
    tracing::info!("Database: {}", cfg.db_path);
    tracing::info!("Interconnect API: {}", cfg.interconnect_api_url);
    tracing::info!("Listen: {}", cfg.listen_addr);
    if cfg.admin_force_unbook {
        tracing::info!("Administrators may release other users' bookings");
    }

    // Initialize database
    let store = Store::with_pool_size(&cfg.db_path, cfg.db_max_connections).await?;
    tracing::info!("Database initialized (pool_size={})", cfg.db_max_connections);

    // Initialize WebSocket hub
    let ws_hub = Arc::new(Hub::new());

    // Interconnect link API client
    let provisioner = Arc::new(InterconnectClient::new(
        &cfg.interconnect_api_url,
        &cfg.interconnect_api_token,
        cfg.interconnect_timeout_secs,
    )?);

    // Create app state
    let state = Arc::new(AppState::new(store, cfg.clone(), Some(ws_hub), provisioner));

    // Build router
    let app = router::build(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    tracing::info!("LabForge listening on {}", cfg.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("LabForge shutting down");
    Ok(())
}

/// WebSocket upgrade handler
pub async fn ws_upgrade_handler(
    _auth: auth::AuthUser,
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> axum::response::Response {
    use axum::response::IntoResponse;

    if let Some(hub) = &state.ws_hub {
        ws::ws_handler(ws, axum::extract::State(hub.clone())).await
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE.into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => { sig.recv().await; }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
}
