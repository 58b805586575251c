//! Shared read-check-then-commit helpers.
//!
//! Reads made here only inform the decision to write; nothing ties them to
//! the batch that follows.  The batch itself is all-or-nothing.

use bazaar_shared::constants::TX_ITEM_FIELD;
use bazaar_shared::{ItemId, TransactionId, UserId};
use bazaar_store::{DocPath, Snapshot, WriteBatch};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{EntityKind, MarketError, Result};
use crate::models::TransactionStatus;
use crate::{paths, Market};

/// Decode a snapshot, reporting malformed documents with their path.
pub(crate) fn decode<T: DeserializeOwned>(snapshot: &Snapshot) -> Result<Option<T>> {
    snapshot.deserialize().map_err(|e| MarketError::Corrupt {
        path: snapshot.path().to_string(),
        reason: e.to_string(),
    })
}

/// Case-insensitive name comparison used for category uniqueness.
pub(crate) fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

pub(crate) fn ensure_owner(
    actor: &UserId,
    owner: &UserId,
    action: &'static str,
    kind: EntityKind,
    id: &str,
) -> Result<()> {
    if actor == owner {
        return Ok(());
    }
    tracing::warn!(actor = %actor, %kind, id, action, "ownership check failed");
    Err(MarketError::Ownership {
        actor: actor.clone(),
        action,
        kind,
        id: id.to_string(),
    })
}

/// Ids of transactions in `snapshot` that reference `item` and are pending.
///
/// Works on raw fields so that one malformed transaction cannot hide a
/// pending one.
pub(crate) fn pending_for_item(snapshot: &Snapshot, item: &ItemId) -> Vec<TransactionId> {
    snapshot
        .children()
        .into_iter()
        .filter(|tx| {
            let refers = tx.child(TX_ITEM_FIELD).value().and_then(Value::as_str)
                == Some(item.as_str());
            let pending = tx
                .child("status")
                .value()
                .and_then(Value::as_str)
                .is_some_and(|s| TransactionStatus::Pending.matches(s));
            refers && pending
        })
        .filter_map(|tx| tx.key().and_then(|k| TransactionId::new(k).ok()))
        .collect()
}

impl Market {
    pub(crate) async fn read<T: DeserializeOwned>(&self, path: &DocPath) -> Result<Option<T>> {
        let snapshot = self.store.get(path).await?;
        decode(&snapshot)
    }

    /// Commit `batch` atomically, attributing failures to `op`.
    pub(crate) async fn commit(&self, op: &'static str, batch: WriteBatch) -> Result<()> {
        let paths = batch.len();
        if let Err(e) = self.store.atomic_write(batch).await {
            tracing::warn!(op, error = %e, "atomic write failed");
            return Err(MarketError::Store(e));
        }
        tracing::debug!(op, paths, "atomic write committed");
        Ok(())
    }

    /// Transactions that reference `item`, preferring the indexed query.
    ///
    /// When the indexed query is refused the whole collection is scanned and
    /// filtered locally with the same predicate.  A failure of the scan is
    /// returned; it is never read as "no transactions".
    pub(crate) async fn transactions_for_item(&self, item: &ItemId) -> Result<Snapshot> {
        let collection = paths::transactions()?;
        let needle = Value::from(item.as_str());

        match self
            .store
            .query_equal_to(&collection, TX_ITEM_FIELD, &needle)
            .await
        {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                tracing::debug!(
                    item = %item,
                    error = %e,
                    "indexed transaction lookup refused, scanning collection"
                );
                Ok(self.store.get(&collection).await?)
            }
        }
    }

    /// Ids of pending transactions for `item`.
    pub async fn pending_transactions_for_item(&self, item: &ItemId) -> Result<Vec<TransactionId>> {
        let snapshot = self.transactions_for_item(item).await?;
        Ok(pending_for_item(&snapshot, item))
    }
}
