//! Category operations.
//!
//! Names are unique ignoring case.  Uniqueness is checked by scanning all
//! categories before writing, so two users creating the same name at the
//! same moment can both succeed.  Renames and deletes require the owner and
//! an empty `category-items` entry; an item listed between that check and
//! the write is not detected.

use bazaar_shared::{Actor, CategoryId};
use bazaar_store::WriteBatch;
use serde_json::Value;

use crate::error::{EntityKind, MarketError, Result};
use crate::models::{category_document, Category, CategoryRecord};
use crate::protocol::{decode, ensure_owner, same_name};
use crate::{paths, Market};

fn validate_name(raw: &str) -> Result<&str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(MarketError::Validation("Name cannot be empty".to_string()));
    }
    Ok(name)
}

impl Market {
    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub async fn get_category(&self, id: &CategoryId) -> Result<Category> {
        let record: Option<CategoryRecord> = self.read(&paths::category(id)?).await?;
        record
            .map(|r| r.into_category(id.clone()))
            .ok_or_else(|| MarketError::not_found(EntityKind::Category, id))
    }

    /// Whether the category index lists no items for `id`.
    pub async fn is_category_empty(&self, id: &CategoryId) -> Result<bool> {
        let index = self.store.get(&paths::category_index(id)?).await?;
        Ok(!index.exists())
    }

    /// Fail with `DuplicateName` if another category already uses `name`.
    async fn ensure_unique_name(&self, name: &str, except: Option<&CategoryId>) -> Result<()> {
        let all = self.store.get(&paths::categories()?).await?;
        for category in all.children() {
            if except.is_some_and(|id| category.key() == Some(id.as_str())) {
                continue;
            }
            let existing = category.child("name");
            if existing
                .value()
                .and_then(Value::as_str)
                .is_some_and(|n| same_name(n, name))
            {
                tracing::warn!(name, "category name already taken");
                return Err(MarketError::DuplicateName(name.to_string()));
            }
        }
        Ok(())
    }

    async fn ensure_empty(&self, id: &CategoryId) -> Result<()> {
        if self.is_category_empty(id).await? {
            Ok(())
        } else {
            tracing::warn!(category = %id, "category still lists items");
            Err(MarketError::NotEmpty(id.clone()))
        }
    }

    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    pub async fn create_category(&self, actor: &Actor, name: &str) -> Result<Category> {
        let name = validate_name(name)?;
        self.ensure_unique_name(name, None).await?;

        let owner_name = self.resolve_display_name(actor).await;
        let id = CategoryId::new(self.store.generate_id())?;

        let mut batch = WriteBatch::new();
        batch.set(
            paths::category(&id)?,
            category_document(name, &actor.id, &owner_name),
        );
        self.commit("create_category", batch).await?;

        tracing::info!(category = %id, name, owner = %actor.id, "category created");
        self.get_category(&id).await
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Rename an empty category.  Also moves `createdAt` to the rename time.
    pub async fn rename_category(
        &self,
        actor: &Actor,
        id: &CategoryId,
        new_name: &str,
    ) -> Result<Category> {
        let new_name = validate_name(new_name)?;
        let category = self.get_category(id).await?;
        ensure_owner(
            &actor.id,
            &category.created_by,
            "rename",
            EntityKind::Category,
            id.as_str(),
        )?;
        self.ensure_empty(id).await?;
        self.ensure_unique_name(new_name, Some(id)).await?;

        let path = paths::category(id)?;
        let mut batch = WriteBatch::new();
        batch
            .set(path.child("name")?, new_name)
            .set(path.child("createdAt")?, bazaar_store::server_timestamp());
        self.commit("rename_category", batch).await?;

        tracing::info!(category = %id, from = %category.name, to = new_name, "category renamed");
        self.get_category(id).await
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    pub async fn delete_category(&self, actor: &Actor, id: &CategoryId) -> Result<()> {
        let snapshot = self.store.get(&paths::category(id)?).await?;
        let record: CategoryRecord = decode(&snapshot)?
            .ok_or_else(|| MarketError::not_found(EntityKind::Category, id))?;
        ensure_owner(
            &actor.id,
            &record.created_by,
            "delete",
            EntityKind::Category,
            id.as_str(),
        )?;
        self.ensure_empty(id).await?;

        let mut batch = WriteBatch::new();
        batch.delete(paths::category(id)?);
        self.commit("delete_category", batch).await?;

        // The index entry is expected to be empty already; clearing it is
        // housekeeping and does not undo the delete.
        let mut cleanup = WriteBatch::new();
        cleanup.delete(paths::category_index(id)?);
        if let Err(e) = self.store.atomic_write(cleanup).await {
            tracing::warn!(category = %id, error = %e, "failed to clear category index");
        }

        tracing::info!(category = %id, name = %record.name, "category deleted");
        Ok(())
    }
}
