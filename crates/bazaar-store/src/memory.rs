//! In-memory [`DocumentStore`].
//!
//! Holds the whole tree as one `serde_json::Value`.  Equality queries are
//! only answered for fields that were declared with
//! [`MemoryStore::with_index`], matching a hosted store whose index rules
//! must be configured up front.  Access faults can be injected to exercise
//! caller error paths.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, RwLock};

use crate::batch::WriteBatch;
use crate::error::{Result, StoreError};
use crate::path::DocPath;
use crate::push_id::PushIdGenerator;
use crate::snapshot::Snapshot;
use crate::{tree, ChangeSet, DocumentStore, CHANGE_CHANNEL_CAPACITY};

#[derive(Debug, Default)]
struct Faults {
    offline: bool,
    denied: Vec<DocPath>,
}

pub struct MemoryStore {
    root: RwLock<Value>,
    indexes: HashSet<(DocPath, String)>,
    faults: Mutex<Faults>,
    ids: Mutex<PushIdGenerator>,
    notifier: broadcast::Sender<ChangeSet>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (notifier, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            root: RwLock::new(Value::Object(Map::new())),
            indexes: HashSet::new(),
            faults: Mutex::new(Faults::default()),
            ids: Mutex::new(PushIdGenerator::new()),
            notifier,
        }
    }

    /// Declare an index on `field` for the children of `path`.
    pub fn with_index(mut self, path: DocPath, field: impl Into<String>) -> Self {
        self.indexes.insert((path, field.into()));
        self
    }

    /// Simulate loss of connectivity.  Every operation fails while offline.
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.offline = offline;
        }
    }

    /// Refuse reads and writes touching `prefix`.
    pub fn deny(&self, prefix: DocPath) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.denied.push(prefix);
        }
    }

    /// Lift every injected fault.
    pub fn clear_faults(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            *faults = Faults::default();
        }
    }

    /// Number of live change receivers.
    pub fn subscriber_count(&self) -> usize {
        self.notifier.receiver_count()
    }

    fn check_access<'a>(&self, paths: impl IntoIterator<Item = &'a DocPath>) -> Result<()> {
        let faults = self
            .faults
            .lock()
            .map_err(|_| StoreError::Backend("fault table poisoned".to_string()))?;
        if faults.offline {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        for path in paths {
            if let Some(denied) = faults.denied.iter().find(|d| d.overlaps(path)) {
                return Err(StoreError::PermissionDenied(format!(
                    "access to '{path}' denied by rule on '{denied}'"
                )));
            }
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> Result<Snapshot> {
        self.check_access([path])?;
        let root = self.root.read().await;
        let value = tree::get_at(&root, path.segments()).cloned();
        Ok(Snapshot::new(path.clone(), value))
    }

    fn generate_id(&self) -> String {
        match self.ids.lock() {
            Ok(mut ids) => ids.generate(),
            // A poisoned generator still holds valid state.
            Err(poisoned) => poisoned.into_inner().generate(),
        }
    }

    async fn atomic_write(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        batch.validate()?;
        self.check_access(batch.paths())?;

        let changed: Vec<DocPath> = batch.paths().cloned().collect();
        let now_ms = chrono::Utc::now().timestamp_millis();

        {
            let mut root = self.root.write().await;
            for (path, value) in batch.into_entries() {
                let value = value.and_then(|mut v| {
                    tree::resolve_server_values(&mut v, now_ms);
                    tree::normalize(v)
                });
                tree::set_at(&mut root, path.segments(), value);
            }
            if root.is_null() {
                *root = Value::Object(Map::new());
            }
        }

        tracing::trace!(paths = changed.len(), "memory batch committed");
        // No receivers is not an error.
        let _ = self.notifier.send(std::sync::Arc::new(changed));
        Ok(())
    }

    async fn query_equal_to(
        &self,
        path: &DocPath,
        field: &str,
        value: &Value,
    ) -> Result<Snapshot> {
        if !self.indexes.contains(&(path.clone(), field.to_string())) {
            return Err(StoreError::IndexNotDefined {
                path: path.to_string(),
                field: field.to_string(),
            });
        }
        self.check_access([path])?;

        let root = self.root.read().await;
        let matches: Map<String, Value> = tree::get_at(&root, path.segments())
            .and_then(Value::as_object)
            .map(|children| {
                children
                    .iter()
                    .filter(|(_, child)| child.get(field) == Some(value))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Snapshot::new(path.clone(), Some(Value::Object(matches))))
    }

    fn changes(&self) -> broadcast::Receiver<ChangeSet> {
        self.notifier.subscribe()
    }
}
