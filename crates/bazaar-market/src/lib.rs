//! # bazaar-market
//!
//! The catalog-and-transaction consistency engine of the Bazaar marketplace.
//!
//! Four denormalized views live in the document store: categories, items,
//! the `category-items` index and transactions.  Every mutation here follows
//! the same discipline: read what the invariants depend on, reject the
//! request if a check fails, then commit all affected paths in one atomic
//! batch.  The store cannot make the batch conditional on the reads, so a
//! concurrent writer can still slip in between check and commit.  Those
//! windows are known and covered by the race tests under `tests/`.
//!
//! Every operation takes the acting user as an explicit [`Actor`].

pub mod categories;
pub mod error;
pub mod feeds;
pub mod items;
pub mod models;
pub mod profiles;
pub mod transactions;

mod paths;
mod protocol;

use std::sync::Arc;

use bazaar_store::DocumentStore;

pub use bazaar_shared::{Actor, CategoryId, ItemId, TransactionId, UserId};
pub use error::{Disposition, EntityKind, MarketError, Result};
pub use feeds::Feed;
pub use models::*;

/// Handle to the marketplace.  Cheap to clone.
#[derive(Clone)]
pub struct Market {
    store: Arc<dyn DocumentStore>,
}

impl Market {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// The underlying document store.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }
}

/// Build an [`Actor`] from the raw identity supplied by the caller's
/// authentication layer.
pub fn actor(raw_id: &str, display_name: Option<&str>) -> Result<Actor> {
    let id = UserId::new(raw_id.trim())
        .map_err(|e| MarketError::Identity(format!("invalid user id: {e}")))?;
    let actor = Actor::new(id);
    Ok(match display_name {
        Some(name) => actor.with_display_name(name),
        None => actor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_requires_an_id() {
        assert!(matches!(actor("  ", None), Err(MarketError::Identity(_))));
        assert!(matches!(actor("bo\tb", None), Err(MarketError::Identity(_))));
        let a = actor("uid-1", Some("Ada")).unwrap();
        assert_eq!(a.id.as_str(), "uid-1");
        assert_eq!(a.display_name.as_deref(), Some("Ada"));
    }
}
