//! Multi-path atomic write batches.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::error::{Result, StoreError};
use crate::path::DocPath;

pub(crate) const SERVER_VALUE_KEY: &str = ".sv";

/// Placeholder the store replaces with its own clock at commit time.
pub fn server_timestamp() -> Value {
    json!({ SERVER_VALUE_KEY: "timestamp" })
}

/// A set of absolute-path writes applied as one unit.
///
/// A `None` value deletes the path.  Two entries may not overlap (one path
/// may not lie inside another), mirroring what the backend accepts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    entries: BTreeMap<DocPath, Option<Value>>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `value` at `path`.  `Value::Null` is treated as a delete.
    pub fn set(&mut self, path: DocPath, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        let value = if value.is_null() { None } else { Some(value) };
        self.entries.insert(path, value);
        self
    }

    pub fn delete(&mut self, path: DocPath) -> &mut Self {
        self.entries.insert(path, None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn paths(&self) -> impl Iterator<Item = &DocPath> {
        self.entries.keys()
    }

    pub fn get(&self, path: &DocPath) -> Option<&Option<Value>> {
        self.entries.get(path)
    }

    /// Reject batches the backend would refuse: writes to the root or
    /// overlapping entries.
    pub fn validate(&self) -> Result<()> {
        let mut previous: Option<&DocPath> = None;
        for path in self.entries.keys() {
            if path.is_root() {
                return Err(StoreError::InvalidPath(
                    "batch may not write the root".to_string(),
                ));
            }
            // Sorted order puts every descendant directly after its ancestor
            // or after another descendant of it.
            if let Some(prev) = previous {
                if prev.contains(path) {
                    return Err(StoreError::InvalidPath(format!(
                        "batch entries overlap: '{prev}' contains '{path}'"
                    )));
                }
            }
            previous = Some(path);
        }
        Ok(())
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (DocPath, Option<Value>)> {
        self.entries.into_iter()
    }
}
