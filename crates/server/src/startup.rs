use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use configs::{AppConfig, ServerConfig};
use service::registry::{StoreRegistry, StoreRepository};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::routes::{self, ServerState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(server: &ServerConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", server.host, server.port).parse()?)
}

/// Ensure the data directory, rebuild the registry from it and wrap it in app state
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<ServerState> {
    common::env::ensure_data_dir(&cfg.storage.data_dir).await?;
    let registry = StoreRegistry::open(cfg.storage.data_dir.clone()).await?;
    info!(data_dir = %registry.data_dir().display(), stores = registry.len(), "registry ready");
    let repo: Arc<dyn StoreRepository> = registry;
    Ok(ServerState::new(repo))
}

pub fn build_app(state: ServerState) -> Router {
    routes::build_router(state, build_cors())
}

/// Public entry: build the app and run the HTTP server
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let state = build_state(&cfg).await?;
    let app = build_app(state);

    let addr = bind_addr(&cfg.server)?;
    info!(%addr, "starting jsondb server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
