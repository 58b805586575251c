//! Point-in-time views of a subtree.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;
use crate::path::DocPath;

/// The value found at a path when it was read.  `None` means absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    path: DocPath,
    value: Option<Value>,
}

impl Snapshot {
    pub fn new(path: DocPath, value: Option<Value>) -> Self {
        let value = value.filter(|v| !crate::tree::is_empty(v));
        Self { path, value }
    }

    pub fn path(&self) -> &DocPath {
        &self.path
    }

    /// Last segment of the path the snapshot was taken at.
    pub fn key(&self) -> Option<&str> {
        self.path.key()
    }

    pub fn exists(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<Value> {
        self.value
    }

    /// Snapshot of a direct child.  Absent when the key is unknown.
    pub fn child(&self, key: &str) -> Snapshot {
        let value = self
            .value
            .as_ref()
            .and_then(|v| v.get(key))
            .cloned();
        // Keys inside stored data were validated when written.
        let path = self.path.child(key).unwrap_or_else(|_| self.path.clone());
        Snapshot::new(path, value)
    }

    /// Direct children, ordered by key.  Push ids order by creation time.
    pub fn children(&self) -> Vec<Snapshot> {
        let Some(Value::Object(map)) = &self.value else {
            return Vec::new();
        };
        map.iter()
            .filter_map(|(key, value)| {
                let path = self.path.child(key).ok()?;
                Some(Snapshot::new(path, Some(value.clone())))
            })
            .collect()
    }

    /// Keys of direct children, ordered.
    pub fn child_keys(&self) -> Vec<String> {
        match &self.value {
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Decode the value into `T`.  Absent values decode to `None`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.value {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }
}
