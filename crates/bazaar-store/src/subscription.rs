//! Live views of a subtree.
//!
//! A [`Subscription`] yields the current value of its path as soon as it is
//! polled, then a fresh full snapshot after every committed batch that
//! touches an overlapping path.  It runs until [`Subscription::unsubscribe`]
//! is called or the store goes away; subscribing again restarts it from the
//! current state.

use std::sync::Arc;

use futures::stream::{self, Stream};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::error::Result;
use crate::path::DocPath;
use crate::snapshot::Snapshot;
use crate::{ChangeSet, DocumentStore};

pub struct Subscription {
    store: Arc<dyn DocumentStore>,
    path: DocPath,
    changes: broadcast::Receiver<ChangeSet>,
    primed: bool,
    closed: bool,
}

/// Start watching `path`.
///
/// The change receiver is taken before the first read so no commit can slip
/// between the initial snapshot and the first notification.
pub fn subscribe(store: Arc<dyn DocumentStore>, path: DocPath) -> Subscription {
    let changes = store.changes();
    tracing::debug!(path = %path, "subscribed");
    Subscription {
        store,
        path,
        changes,
        primed: false,
        closed: false,
    }
}

impl Subscription {
    pub fn path(&self) -> &DocPath {
        &self.path
    }

    /// Wait for the next full snapshot.
    ///
    /// Read failures are yielded as `Some(Err(_))` and the subscription stays
    /// usable.  `None` means the subscription has ended.
    pub async fn next(&mut self) -> Option<Result<Snapshot>> {
        if self.closed {
            return None;
        }
        if !self.primed {
            self.primed = true;
            return Some(self.store.get(&self.path).await);
        }

        loop {
            match self.changes.recv().await {
                Ok(changed) => {
                    if changed.iter().any(|p| p.overlaps(&self.path)) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Every event is a full snapshot, so one fresh read covers
                    // whatever was dropped.
                    tracing::debug!(path = %self.path, skipped, "subscription lagged");
                    break;
                }
                Err(RecvError::Closed) => {
                    self.closed = true;
                    return None;
                }
            }
        }

        Some(self.store.get(&self.path).await)
    }

    /// Stop receiving updates.
    pub fn unsubscribe(self) {
        tracing::debug!(path = %self.path, "unsubscribed");
    }

    /// Adapt into a [`Stream`] of snapshots.  Dropping the stream unsubscribes.
    pub fn into_stream(self) -> impl Stream<Item = Result<Snapshot>> + Send {
        stream::unfold(self, |mut sub| async move {
            let next = sub.next().await?;
            Some((next, sub))
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use serde_json::json;

    use super::*;
    use crate::{MemoryStore, WriteBatch};

    fn p(raw: &str) -> DocPath {
        DocPath::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn lagging_subscriber_reads_latest_state() {
        let store = Arc::new(MemoryStore::new());
        let mut sub = subscribe(store.clone(), p("counters"));
        assert!(!sub.next().await.unwrap().unwrap().exists());

        for n in 1..=300 {
            let mut batch = WriteBatch::new();
            batch.set(p("counters/hits"), n);
            store.atomic_write(batch).await.unwrap();
        }

        let snapshot = sub.next().await.unwrap().unwrap();
        assert_eq!(snapshot.child("hits").value(), Some(&json!(300)));
    }

    #[tokio::test]
    async fn stream_yields_full_snapshots() {
        let store = Arc::new(MemoryStore::new());
        let mut stream = Box::pin(subscribe(store.clone(), p("items")).into_stream());

        let initial = stream.next().await.unwrap().unwrap();
        assert!(initial.child_keys().is_empty());

        let mut batch = WriteBatch::new();
        batch
            .set(p("items/a/title"), "A")
            .set(p("items/b/title"), "B");
        store.atomic_write(batch).await.unwrap();

        let updated = stream.next().await.unwrap().unwrap();
        assert_eq!(updated.child_keys(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn read_errors_keep_subscription_alive() {
        let store = Arc::new(MemoryStore::new());
        let mut sub = subscribe(store.clone(), p("items"));
        store.set_offline(true);
        assert!(sub.next().await.unwrap().is_err());

        store.set_offline(false);
        let mut batch = WriteBatch::new();
        batch.set(p("items/a/title"), "A");
        store.atomic_write(batch).await.unwrap();
        assert!(sub.next().await.unwrap().unwrap().exists());
    }
}
