//! # bazaar-server
//!
//! HTTP front for the Bazaar marketplace engine.
//!
//! Exposes the catalog and transaction operations of `bazaar-market` as a
//! small JSON API and serves one-shot reads of its live feeds.  The caller's
//! identity is taken from headers set by whatever authenticates requests in
//! front of this process.

mod api;
mod config;
mod error;

use std::sync::Arc;

use bazaar_market::Market;
use bazaar_shared::constants::{TRANSACTIONS, TX_ITEM_FIELD};
use bazaar_store::{DocPath, DocumentStore, MemoryStore, SqliteStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::{ServerConfig, StoreBackend};

fn open_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    Ok(match config.store_backend {
        StoreBackend::Memory => {
            let mut store = MemoryStore::new();
            if config.transaction_index {
                store = store.with_index(DocPath::parse(TRANSACTIONS)?, TX_ITEM_FIELD);
            }
            Arc::new(store)
        }
        StoreBackend::Sqlite => {
            let store = match &config.database_path {
                Some(path) => SqliteStore::open_at(path)?,
                None => SqliteStore::open_default()?,
            };
            if let Some(path) = store.path() {
                info!(path = %path.display(), "Opened SQLite store");
            }
            Arc::new(store)
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,bazaar_server=debug")),
        )
        .init();

    info!("Starting Bazaar server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration and open the store
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    let store = open_store(&config)?;
    let http_addr = config.http_addr;
    let app_state = AppState {
        market: Market::new(store),
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 3. Run the HTTP API server until it fails or Ctrl+C arrives
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
