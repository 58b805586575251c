#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bazaar_market::{Actor, Market, UserId};
use bazaar_store::{
    ChangeSet, DocPath, DocumentStore, MemoryStore, Result, Snapshot, WriteBatch,
};
use serde_json::Value;
use tokio::sync::{broadcast, Barrier};

pub fn actor(id: &str) -> Actor {
    Actor::new(UserId::new(id).unwrap())
}

pub fn named(id: &str, name: &str) -> Actor {
    actor(id).with_display_name(name)
}

pub fn memory_market() -> (Arc<MemoryStore>, Market) {
    let store = Arc::new(MemoryStore::new());
    (store.clone(), Market::new(store))
}

/// Store wrapper that holds back the next `n` atomic writes until all of
/// them have arrived, so every writer has finished its checks before any
/// batch lands.
pub struct GatedStore {
    inner: MemoryStore,
    gate: Barrier,
    remaining: AtomicUsize,
}

impl GatedStore {
    pub fn new(inner: MemoryStore, writers: usize) -> Self {
        Self {
            inner,
            gate: Barrier::new(writers),
            remaining: AtomicUsize::new(0),
        }
    }

    /// Start gating: the next `writers` batches wait for each other.
    pub fn arm(&self, writers: usize) {
        self.remaining.store(writers, Ordering::SeqCst);
    }

    fn take_slot(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl DocumentStore for GatedStore {
    async fn get(&self, path: &DocPath) -> Result<Snapshot> {
        self.inner.get(path).await
    }

    fn generate_id(&self) -> String {
        self.inner.generate_id()
    }

    async fn atomic_write(&self, batch: WriteBatch) -> Result<()> {
        if self.take_slot() {
            self.gate.wait().await;
        }
        self.inner.atomic_write(batch).await
    }

    async fn query_equal_to(
        &self,
        path: &DocPath,
        field: &str,
        value: &Value,
    ) -> Result<Snapshot> {
        self.inner.query_equal_to(path, field, value).await
    }

    fn changes(&self) -> broadcast::Receiver<ChangeSet> {
        self.inner.changes()
    }
}
