//! Transaction lifecycle: `none -> pending -> completed`.
//!
//! Starting a transaction reads the item and the item's existing
//! transactions, then commits one batch that creates the transaction,
//! indexes it under both parties, marks the item unavailable and drops it
//! from its category listing.  Two buyers who both pass the checks before
//! either batch lands will both commit: the item ends up pointing at the
//! later transaction and two pending transactions exist.  Nothing in the
//! store can refuse the second batch.
//!
//! `start_transaction` checks, in order: the item exists, the buyer is not
//! the seller (`SelfPurchase`), the item is available (`Unavailable`) and
//! no pending transaction references it (`AlreadyPending`).  Buying your own
//! item therefore fails the same way whether or not it is still listed.
//!
//! Only the seller may complete a transaction.  Cancellation is not
//! supported; an item never becomes available again.

use bazaar_shared::{Actor, ItemId, TransactionId};
use bazaar_store::{server_timestamp, WriteBatch};

use crate::error::{EntityKind, MarketError, Result};
use crate::models::{transaction_document, Transaction, TransactionRecord, TransactionStatus};
use crate::protocol::ensure_owner;
use crate::{paths, Market};

impl Market {
    pub async fn get_transaction(&self, id: &TransactionId) -> Result<Transaction> {
        let path = paths::transaction(id)?;
        let record: TransactionRecord = self
            .read(&path)
            .await?
            .ok_or_else(|| MarketError::not_found(EntityKind::Transaction, id))?;
        let status = record.status.clone();
        record
            .into_transaction(id.clone())
            .ok_or_else(|| MarketError::Corrupt {
                path: path.to_string(),
                reason: format!("unknown status '{status}'"),
            })
    }

    /// Reserve `item_id` for `buyer`.
    pub async fn start_transaction(&self, buyer: &Actor, item_id: &ItemId) -> Result<Transaction> {
        let item = self.get_item(item_id).await?;

        if item.author_id == buyer.id {
            tracing::warn!(item = %item_id, buyer = %buyer.id, "attempt to buy own item");
            return Err(MarketError::SelfPurchase(item_id.clone()));
        }
        if !item.available {
            tracing::warn!(item = %item_id, "item no longer available");
            return Err(MarketError::Unavailable(item_id.clone()));
        }

        let pending = self.pending_transactions_for_item(item_id).await?;
        if !pending.is_empty() {
            tracing::warn!(item = %item_id, pending = ?pending, "item already reserved");
            return Err(MarketError::AlreadyPending(item_id.clone()));
        }

        let tx_id = TransactionId::new(self.store.generate_id())?;
        let seller = &item.author_id;

        let mut batch = WriteBatch::new();
        batch
            .set(
                paths::transaction(&tx_id)?,
                transaction_document(&item, &buyer.id),
            )
            .set(paths::user_transaction(&buyer.id, &tx_id)?, true)
            .set(paths::user_transaction(seller, &tx_id)?, true)
            .set(paths::item_field(item_id, "available")?, false)
            .set(paths::item_field(item_id, "transactionId")?, tx_id.as_str());
        for category in item.categories() {
            batch.delete(paths::category_index_entry(&category, item_id)?);
        }
        self.commit("start_transaction", batch).await?;

        tracing::info!(
            transaction = %tx_id,
            item = %item_id,
            buyer = %buyer.id,
            seller = %seller,
            amount_cents = ?item.pricing().cents(),
            "transaction started"
        );
        self.get_transaction(&tx_id).await
    }

    /// Mark a pending transaction completed.  Seller only.
    pub async fn complete_transaction(
        &self,
        actor: &Actor,
        id: &TransactionId,
    ) -> Result<Transaction> {
        let tx = self.get_transaction(id).await?;
        ensure_owner(
            &actor.id,
            &tx.seller_id,
            "complete",
            EntityKind::Transaction,
            id.as_str(),
        )?;
        if tx.status == TransactionStatus::Completed {
            tracing::warn!(transaction = %id, "transaction already completed");
            return Err(MarketError::AlreadyCompleted(id.clone()));
        }

        let mut batch = WriteBatch::new();
        batch
            .set(
                paths::transaction_field(id, "status")?,
                TransactionStatus::Completed.as_str(),
            )
            .set(paths::transaction_field(id, "completedAt")?, server_timestamp())
            .set(paths::transaction_field(id, "completedBy")?, actor.id.as_str());
        self.commit("complete_transaction", batch).await?;

        tracing::info!(transaction = %id, item = %tx.item_id, "transaction completed");
        self.get_transaction(id).await
    }
}
