// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use citrea_mcp_server::{
    api::create_router,
    blockchain::{evm_client::EvmClient, gateway::ChainGateway},
    config::Config,
    storage::{DocumentStore, JsonFileStore},
    AppState,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// --- HTTP Server Logic ---
async fn run_http_server(state: AppState) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], state.config.port));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🚀 HTTP Server listening on {}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("HTTP server stopped")
}

fn build_state() -> Result<AppState> {
    let config = Config::from_env().context("Failed to load configuration")?;

    let gateway: Arc<dyn ChainGateway> = Arc::new(
        EvmClient::new(
            &config.rpc_url,
            config.chain_id,
            config.require_private_key()?,
            config.retry_policy,
        )
        .context("Failed to initialize EVM client")?,
    );

    let store = JsonFileStore::open(&config.cache_dir).context("Failed to open cache directory")?;
    info!("Cache directory: {}", store.base_dir().display());
    let store: Arc<dyn DocumentStore> = Arc::new(store);

    AppState::new(config, gateway, store).context("Failed to initialize services")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "citrea_mcp_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let app_state = build_state().map_err(|e| {
        error!("❌ {:#}", e);
        e
    })?;

    run_http_server(app_state).await
}
