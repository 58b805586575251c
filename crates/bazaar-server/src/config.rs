//! Server configuration loaded from environment variables.
//!
//! Every setting has a default so the server starts with zero configuration
//! for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Which [`DocumentStore`](bazaar_store::DocumentStore) backend to run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Durable SQLite database.
    Sqlite,
    /// Process-local tree; everything is lost on exit.
    Memory,
}

impl StoreBackend {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Some(StoreBackend::Sqlite),
            "memory" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP API.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Env: `STORE_BACKEND` (`sqlite` | `memory`)
    /// Default: `sqlite`
    pub store_backend: StoreBackend,

    /// SQLite file.  `None` uses the platform data directory.
    /// Env: `DATABASE_PATH`
    pub database_path: Option<PathBuf>,

    /// Declare the `transactions.itemId` index on the memory backend.  With it
    /// off, pending-transaction lookups scan the whole collection.
    /// Env: `TRANSACTION_INDEX` (true/false)
    /// Default: `true`
    pub transaction_index: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            store_backend: StoreBackend::Sqlite,
            database_path: None,
            transaction_index: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Some(backend) = lookup("STORE_BACKEND") {
            match StoreBackend::parse(&backend) {
                Some(parsed) => config.store_backend = parsed,
                None => tracing::warn!(value = %backend, "Unknown STORE_BACKEND, using sqlite"),
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(val) = lookup("TRANSACTION_INDEX") {
            config.transaction_index = val != "false" && val != "0";
        }

        // RUST_LOG is read by tracing-subscriber's EnvFilter directly.

        config
    }
}
