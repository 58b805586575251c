//! # bazaar-store
//!
//! The hierarchical document store the marketplace runs on.
//!
//! The store offers point reads, generation of creation-ordered push ids, an
//! atomic multi-path write, change subscriptions and an optional indexed
//! equality query.  It deliberately offers no compare-and-set: a reader can
//! never make a later write conditional on what it read.
//!
//! Two backends implement [`DocumentStore`]: [`MemoryStore`] for tests and
//! ephemeral deployments, and [`SqliteStore`] for durable local storage.

pub mod batch;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod path;
pub mod push_id;
pub mod snapshot;
pub mod subscription;

mod error;
mod tree;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

pub use batch::{server_timestamp, WriteBatch};
pub use database::SqliteStore;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use path::DocPath;
pub use snapshot::Snapshot;
pub use subscription::{subscribe, Subscription};

/// Paths touched by one committed batch.
pub type ChangeSet = Arc<Vec<DocPath>>;

/// Capacity of the change notification channel shared by all subscribers.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 256;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the subtree rooted at `path`.
    async fn get(&self, path: &DocPath) -> Result<Snapshot>;

    /// Produce a new push id without writing anything.
    fn generate_id(&self) -> String;

    /// Apply every entry of `batch` as one all-or-nothing unit.
    async fn atomic_write(&self, batch: WriteBatch) -> Result<()>;

    /// Children of `path` whose `field` equals `value`.
    ///
    /// Fails with [`StoreError::IndexNotDefined`] when the backend has no
    /// index for `field` under `path`; callers are expected to fall back to
    /// a full read and filter locally.
    async fn query_equal_to(&self, path: &DocPath, field: &str, value: &Value)
        -> Result<Snapshot>;

    /// Receiver of change notifications, one per committed batch.
    fn changes(&self) -> broadcast::Receiver<ChangeSet>;
}
