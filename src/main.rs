use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{extract::DefaultBodyLimit, Router};
use tower_http::trace::TraceLayer;

mod config;
mod error;
mod logging;
mod routes;
mod services;

use services::{insight::InsightAgent, store::DatasetStore};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let config = config::Config::from_env()?;
    let port = config.port;
    let max_upload_bytes = config.max_upload_bytes;

    let state = Arc::new(AppState::new(config));

    let app = Router::new()
        .merge(routes::routes())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub struct AppState {
    pub config: config::Config,
    pub store: DatasetStore,
    pub insight: InsightAgent,
}

impl AppState {
    fn new(config: config::Config) -> Self {
        let store = DatasetStore::new(config.dataset_cache_capacity, config.dataset_ttl);
        let insight = InsightAgent::from_config(&config);
        Self {
            config,
            store,
            insight,
        }
    }
}
