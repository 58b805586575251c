use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend refused access to a path.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The backend could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// An equality query was issued for a field the backend has no index for.
    #[error("Index not defined for '{field}' at {path}")]
    IndexNotDefined { path: String, field: String },

    /// A path or batch was malformed.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored or submitted value could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Internal backend failure (poisoned lock, crashed worker task).
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether retrying the same request might succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StoreError::InvalidPath(_))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
