//! User profiles and display-name resolution.
//!
//! Display names are copied into categories and items when they are
//! written.  Renaming a profile later does not touch those copies.

use bazaar_shared::{Actor, UserId};
use bazaar_store::WriteBatch;

use crate::error::{MarketError, Result};
use crate::models::{Profile, ProfileRecord};
use crate::{paths, Market};

impl Market {
    /// Create or replace the caller's display name.
    pub async fn save_profile(&self, actor: &Actor, display_name: &str) -> Result<Profile> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(MarketError::Validation(
                "Display name cannot be empty".to_string(),
            ));
        }

        let mut batch = WriteBatch::new();
        batch.set(
            paths::user(&actor.id)?.child("displayName")?,
            display_name,
        );
        self.commit("save_profile", batch).await?;

        tracing::info!(user = %actor.id, "profile saved");

        let stored = self.get_profile(&actor.id).await?;
        Ok(stored.unwrap_or_else(|| Profile {
            user_id: actor.id.clone(),
            display_name: Some(display_name.to_string()),
            username: None,
        }))
    }

    pub async fn get_profile(&self, user: &UserId) -> Result<Option<Profile>> {
        let record: Option<ProfileRecord> = self.read(&paths::user(user)?).await?;
        Ok(record.map(|r| r.into_profile(user.clone())))
    }

    /// Name to copy into documents written by `actor`.
    ///
    /// Prefers the name the caller already holds, then the stored profile,
    /// then a short form of the user id.  A failed profile read falls
    /// through to the short id; the name is a convenience copy only.
    pub(crate) async fn resolve_display_name(&self, actor: &Actor) -> String {
        if let Some(name) = actor
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
        {
            return name.to_string();
        }

        match self.get_profile(&actor.id).await {
            Ok(Some(profile)) => {
                if let Some(name) = profile.preferred_name() {
                    return name.to_string();
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(user = %actor.id, error = %e, "profile lookup failed");
            }
        }

        actor.id.short()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bazaar_store::{DocPath, DocumentStore, MemoryStore};
    use serde_json::json;

    use super::*;

    fn actor(id: &str) -> Actor {
        Actor::new(UserId::new(id).unwrap())
    }

    #[tokio::test]
    async fn resolution_order() {
        let store = Arc::new(MemoryStore::new());
        let market = Market::new(store.clone());

        let cached = actor("user-0001-abcdef").with_display_name("Ada");
        assert_eq!(market.resolve_display_name(&cached).await, "Ada");

        let anonymous = actor("user-0001-abcdef");
        assert_eq!(market.resolve_display_name(&anonymous).await, "user-000");

        let mut batch = WriteBatch::new();
        batch.set(
            DocPath::parse("users/user-0001-abcdef").unwrap(),
            json!({"username": "legacy"}),
        );
        store.atomic_write(batch).await.unwrap();
        assert_eq!(market.resolve_display_name(&anonymous).await, "legacy");

        market.save_profile(&anonymous, "  Grace ").await.unwrap();
        assert_eq!(market.resolve_display_name(&anonymous).await, "Grace");
    }

    #[tokio::test]
    async fn unreadable_profile_falls_back_to_short_id() {
        let store = Arc::new(MemoryStore::new());
        store.deny(DocPath::parse("users").unwrap());
        let market = Market::new(store);

        assert_eq!(market.resolve_display_name(&actor("abcdefghij")).await, "abcdefgh");
    }

    #[tokio::test]
    async fn blank_display_name_is_rejected() {
        let market = Market::new(Arc::new(MemoryStore::new()));
        let err = market.save_profile(&actor("u1"), "   ").await.unwrap_err();
        assert!(matches!(err, MarketError::Validation(_)));
    }
}
