//! Item operations.
//!
//! Creating an item writes the item document and its category index entry
//! in one batch; deleting removes both the same way.  Edits and deletes are
//! refused while a pending transaction references the item.

use bazaar_shared::{Actor, CategoryId, ItemId};
use bazaar_store::WriteBatch;
use serde_json::Value;

use crate::error::{EntityKind, MarketError, Result};
use crate::models::{item_document, Item, ItemPatch, ItemRecord, NewItem, Pricing};
use crate::protocol::ensure_owner;
use crate::{paths, Market};

fn clean_title(raw: &str) -> Result<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(MarketError::Validation("Title required".to_string()));
    }
    Ok(title.to_string())
}

fn clean_description(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

impl Market {
    pub async fn get_item(&self, id: &ItemId) -> Result<Item> {
        let record: Option<ItemRecord> = self.read(&paths::item(id)?).await?;
        record
            .map(|r| r.into_item(id.clone()))
            .ok_or_else(|| MarketError::not_found(EntityKind::Item, id))
    }

    async fn ensure_no_pending(&self, item: &ItemId) -> Result<()> {
        let pending = self.pending_transactions_for_item(item).await?;
        if pending.is_empty() {
            Ok(())
        } else {
            tracing::warn!(item = %item, pending = pending.len(), "item has a pending transaction");
            Err(MarketError::HasPendingTransaction(item.clone()))
        }
    }

    pub async fn create_item(
        &self,
        actor: &Actor,
        new_item: NewItem,
        category: &CategoryId,
    ) -> Result<Item> {
        let new_item = NewItem {
            title: clean_title(&new_item.title)?,
            description: clean_description(new_item.description.as_deref()),
            pricing: new_item.pricing,
        };
        new_item.pricing.validate()?;

        // Listing under a category that does not exist would leave a
        // dangling index entry.
        self.get_category(category).await?;

        let author_name = self.resolve_display_name(actor).await;
        let id = ItemId::new(self.store.generate_id())?;

        let mut batch = WriteBatch::new();
        batch
            .set(
                paths::item(&id)?,
                item_document(&new_item, &actor.id, &author_name, category),
            )
            .set(paths::category_index_entry(category, &id)?, true);
        self.commit("create_item", batch).await?;

        tracing::info!(item = %id, category = %category, author = %actor.id, "item created");
        self.get_item(&id).await
    }

    /// Apply an author's edit.  Concurrent edits resolve last-write-wins per
    /// field.
    pub async fn update_item(&self, actor: &Actor, id: &ItemId, patch: ItemPatch) -> Result<Item> {
        let title = patch.title.as_deref().map(clean_title).transpose()?;
        if let Some(pricing) = &patch.pricing {
            pricing.validate()?;
        }

        let item = self.get_item(id).await?;
        ensure_owner(&actor.id, &item.author_id, "edit", EntityKind::Item, id.as_str())?;
        if patch.is_empty() {
            return Ok(item);
        }
        self.ensure_no_pending(id).await?;

        let mut batch = WriteBatch::new();
        if let Some(title) = title {
            batch.set(paths::item_field(id, "title")?, title);
        }
        if let Some(description) = &patch.description {
            let description = clean_description(description.as_deref());
            batch.set(
                paths::item_field(id, "description")?,
                description.map(Value::from).unwrap_or(Value::Null),
            );
        }
        if let Some(pricing) = patch.pricing {
            batch
                .set(paths::item_field(id, "isFree")?, pricing.is_free())
                .set(
                    paths::item_field(id, "priceCents")?,
                    pricing.cents().map(Value::from).unwrap_or(Value::Null),
                );
        }
        self.commit("update_item", batch).await?;

        tracing::info!(item = %id, author = %actor.id, "item updated");
        self.get_item(id).await
    }

    pub async fn delete_item(&self, actor: &Actor, id: &ItemId) -> Result<()> {
        let item = self.get_item(id).await?;
        ensure_owner(&actor.id, &item.author_id, "delete", EntityKind::Item, id.as_str())?;
        self.ensure_no_pending(id).await?;

        let mut batch = WriteBatch::new();
        batch.delete(paths::item(id)?);
        for category in item.categories() {
            batch.delete(paths::category_index_entry(&category, id)?);
        }
        self.commit("delete_item", batch).await?;

        tracing::info!(item = %id, author = %actor.id, "item deleted");
        Ok(())
    }
}

impl NewItem {
    /// Convenience constructor for a priced item.
    pub fn priced(title: impl Into<String>, cents: i64) -> Self {
        Self {
            title: title.into(),
            description: None,
            pricing: Pricing::Cents(cents),
        }
    }

    /// Convenience constructor for a free item.
    pub fn free(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            pricing: Pricing::Free,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
