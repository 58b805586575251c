//! Live, ordered views for a UI layer.
//!
//! A [`Feed`] wraps a store subscription and turns every snapshot into the
//! full current list.  Documents that fail to decode are logged and left out
//! so one bad record cannot blank a whole listing.

use std::collections::HashSet;
use std::future::Future;

use bazaar_shared::{Actor, CategoryId, ItemId, TransactionId, UserId};
use bazaar_store::{subscribe, DocPath, Snapshot, Subscription};
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::models::{
    Category, CategoryRecord, Item, ItemRecord, Transaction, TransactionRecord, TransactionStatus,
};
use crate::protocol::decode;
use crate::{paths, Market};

type Projector<T> =
    Box<dyn Fn(Market, Snapshot) -> BoxFuture<'static, Result<Vec<T>>> + Send + Sync>;

pub struct Feed<T> {
    market: Market,
    subscription: Subscription,
    project: Projector<T>,
}

impl<T: Send + 'static> Feed<T> {
    fn new<F, Fut>(market: Market, path: DocPath, project: F) -> Self
    where
        F: Fn(Market, Snapshot) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>>> + Send + 'static,
    {
        let subscription = subscribe(market.store.clone(), path);
        Self {
            market,
            subscription,
            project: Box::new(move |market, snapshot| project(market, snapshot).boxed()),
        }
    }

    /// The full list as of the next change (the current one on first call).
    ///
    /// `None` once the feed has ended.  Errors leave the feed usable.
    pub async fn next(&mut self) -> Option<Result<Vec<T>>> {
        let snapshot = match self.subscription.next().await? {
            Ok(snapshot) => snapshot,
            Err(e) => return Some(Err(e.into())),
        };
        Some((self.project)(self.market.clone(), snapshot).await)
    }

    pub fn path(&self) -> &DocPath {
        self.subscription.path()
    }

    pub fn unsubscribe(self) {
        self.subscription.unsubscribe();
    }
}

/// Decode every child of `snapshot`, skipping the ones that do not decode.
fn collect<R, T>(snapshot: &Snapshot, mut build: impl FnMut(&str, R) -> Option<T>) -> Vec<T>
where
    R: DeserializeOwned,
{
    snapshot
        .children()
        .iter()
        .filter_map(|child| {
            let key = child.key()?;
            match decode::<R>(child) {
                Ok(Some(record)) => build(key, record),
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed document");
                    None
                }
            }
        })
        .collect()
}

fn project_categories(snapshot: &Snapshot) -> Vec<Category> {
    let mut categories = collect(snapshot, |key, record: CategoryRecord| {
        Some(record.into_category(CategoryId::new(key).ok()?))
    });
    categories.sort_by_cached_key(|c| (c.name.to_lowercase(), c.id.to_string()));
    categories
}

fn project_items(snapshot: &Snapshot, keep: impl Fn(&Item) -> bool) -> Vec<Item> {
    let mut items = collect(snapshot, |key, record: ItemRecord| {
        let item = record.into_item(ItemId::new(key).ok()?);
        keep(&item).then_some(item)
    });
    items.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.as_str().cmp(a.id.as_str()))
    });
    items
}

fn project_transactions(
    snapshot: &Snapshot,
    user: &UserId,
    status: Option<TransactionStatus>,
) -> Vec<Transaction> {
    let mut transactions = collect(snapshot, |key, record: TransactionRecord| {
        if &record.buyer_id != user && &record.seller_id != user {
            return None;
        }
        let raw_status = record.status.clone();
        let Some(tx) = record.into_transaction(TransactionId::new(key).ok()?) else {
            tracing::debug!(transaction = key, status = %raw_status, "unknown status, skipped");
            return None;
        };
        status.map_or(true, |s| tx.status == s).then_some(tx)
    });
    transactions.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.as_str().cmp(a.id.as_str()))
    });
    transactions
}

impl Market {
    /// All categories, ordered by name ignoring case.
    pub fn categories(&self) -> Result<Feed<Category>> {
        Ok(Feed::new(
            self.clone(),
            paths::categories()?,
            |_, snapshot| async move { Ok(project_categories(&snapshot)) },
        ))
    }

    /// Items listed in `category`, newest first.
    ///
    /// Watches the item collection: every change to a category listing is
    /// written in the same batch as a change to the listed item.
    pub fn items_in_category(&self, category: &CategoryId) -> Result<Feed<Item>> {
        let index_path = paths::category_index(category)?;
        Ok(Feed::new(self.clone(), paths::items()?, move |market, items| {
            let index_path = index_path.clone();
            async move {
                let index = market.store.get(&index_path).await?;
                let listed: HashSet<String> = index.child_keys().into_iter().collect();
                Ok(project_items(&items, |item| listed.contains(item.id.as_str())))
            }
        }))
    }

    /// Items authored by `actor`, sold or not, newest first.
    pub fn my_items(&self, actor: &Actor) -> Result<Feed<Item>> {
        let author = actor.id.clone();
        Ok(Feed::new(self.clone(), paths::items()?, move |_, items| {
            let author = author.clone();
            async move { Ok(project_items(&items, |item| item.author_id == author)) }
        }))
    }

    /// Transactions where `actor` is buyer or seller, newest first.
    /// `status` of `None` keeps every status.
    pub fn my_transactions(
        &self,
        actor: &Actor,
        status: Option<TransactionStatus>,
    ) -> Result<Feed<Transaction>> {
        let user = actor.id.clone();
        Ok(Feed::new(
            self.clone(),
            paths::transactions()?,
            move |_, snapshot| {
                let user = user.clone();
                async move { Ok(project_transactions(&snapshot, &user, status)) }
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bazaar_store::{DocumentStore, MemoryStore, WriteBatch};
    use serde_json::json;

    use super::*;
    use crate::models::NewItem;

    fn actor(id: &str) -> Actor {
        Actor::new(UserId::new(id).unwrap())
    }

    async fn next<T: Send + 'static>(feed: &mut Feed<T>) -> Vec<T> {
        feed.next().await.expect("feed ended").expect("feed errored")
    }

    #[tokio::test]
    async fn categories_sorted_ignoring_case() {
        let market = Market::new(Arc::new(MemoryStore::new()));
        let a = actor("a");
        for name in ["beta", "Alpha", "gamma"] {
            market.create_category(&a, name).await.unwrap();
        }
        let mut feed = market.categories().unwrap();
        let names: Vec<_> = next(&mut feed).await.into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["Alpha", "beta", "gamma"]);
    }

    #[tokio::test]
    async fn category_feed_follows_purchases() {
        let market = Market::new(Arc::new(MemoryStore::new()));
        let seller = actor("seller");
        let cat = market.create_category(&seller, "Books").await.unwrap();
        let older = market
            .create_item(&seller, NewItem::priced("Calculus", 1999), &cat.id)
            .await
            .unwrap();
        let newer = market
            .create_item(&seller, NewItem::free("Poems"), &cat.id)
            .await
            .unwrap();

        let mut feed = market.items_in_category(&cat.id).unwrap();
        let ids: Vec<_> = next(&mut feed).await.into_iter().map(|i| i.id).collect();
        assert_eq!(ids, [newer.id.clone(), older.id.clone()]);

        market
            .start_transaction(&actor("buyer"), &older.id)
            .await
            .unwrap();
        let ids: Vec<_> = next(&mut feed).await.into_iter().map(|i| i.id).collect();
        assert_eq!(ids, [newer.id]);
        feed.unsubscribe();
    }

    #[tokio::test]
    async fn my_items_keeps_sold_items() {
        let market = Market::new(Arc::new(MemoryStore::new()));
        let seller = actor("seller");
        let cat = market.create_category(&seller, "Books").await.unwrap();
        let item = market
            .create_item(&seller, NewItem::priced("Calculus", 1), &cat.id)
            .await
            .unwrap();
        market.start_transaction(&actor("buyer"), &item.id).await.unwrap();

        let mut mine = market.my_items(&seller).unwrap();
        let items = next(&mut mine).await;
        assert_eq!(items.len(), 1);
        assert!(!items[0].available);

        let mut theirs = market.my_items(&actor("buyer")).unwrap();
        assert!(next(&mut theirs).await.is_empty());
    }

    #[tokio::test]
    async fn transactions_filtered_by_party_and_status() {
        let market = Market::new(Arc::new(MemoryStore::new()));
        let seller = actor("seller");
        let cat = market.create_category(&seller, "Books").await.unwrap();
        let item = market
            .create_item(&seller, NewItem::free("Calculus"), &cat.id)
            .await
            .unwrap();
        let tx = market.start_transaction(&actor("buyer"), &item.id).await.unwrap();

        let mut pending = market
            .my_transactions(&seller, Some(TransactionStatus::Pending))
            .unwrap();
        assert_eq!(next(&mut pending).await.len(), 1);

        market.complete_transaction(&seller, &tx.id).await.unwrap();
        assert!(next(&mut pending).await.is_empty());

        let mut done = market
            .my_transactions(&actor("buyer"), Some(TransactionStatus::Completed))
            .unwrap();
        assert_eq!(next(&mut done).await[0].id, tx.id);

        let mut stranger = market.my_transactions(&actor("other"), None).unwrap();
        assert!(next(&mut stranger).await.is_empty());
    }

    #[tokio::test]
    async fn malformed_and_unknown_documents_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        let market = Market::new(store.clone());
        let mut batch = WriteBatch::new();
        batch
            .set(
                DocPath::parse("transactions/t1").unwrap(),
                json!({"itemId": "i", "buyerId": "u", "sellerId": "s", "status": "PENDING"}),
            )
            .set(
                DocPath::parse("transactions/t2").unwrap(),
                json!({"itemId": "i", "buyerId": "u", "sellerId": "s", "status": "cancelled"}),
            )
            .set(DocPath::parse("transactions/t3").unwrap(), json!({"status": 7}));
        store.atomic_write(batch).await.unwrap();

        let mut feed = market
            .my_transactions(&actor("u"), Some(TransactionStatus::Pending))
            .unwrap();
        let txs = next(&mut feed).await;
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].id.as_str(), "t1");
    }
}
