//! The engine over both store backends and their failure modes.

mod common;

use std::sync::Arc;

use bazaar_market::{Disposition, Market, MarketError, NewItem};
use bazaar_store::{DocPath, MemoryStore, SqliteStore, StoreError};

use common::actor;

fn transactions() -> DocPath {
    DocPath::parse("transactions").unwrap()
}

#[tokio::test]
async fn pending_lookup_uses_index_when_declared() {
    let store = Arc::new(MemoryStore::new().with_index(transactions(), "itemId"));
    let market = Market::new(store);
    let seller = actor("seller");
    let books = market.create_category(&seller, "Books").await.unwrap();
    let item = market
        .create_item(&seller, NewItem::free("Calculus"), &books.id)
        .await
        .unwrap();
    let tx = market.start_transaction(&actor("bob"), &item.id).await.unwrap();

    let pending = market.pending_transactions_for_item(&item.id).await.unwrap();
    assert_eq!(pending, vec![tx.id]);
}

#[tokio::test]
async fn pending_lookup_scans_without_index() {
    let (_store, market) = common::memory_market();
    let seller = actor("seller");
    let books = market.create_category(&seller, "Books").await.unwrap();
    let first = market
        .create_item(&seller, NewItem::free("Calculus"), &books.id)
        .await
        .unwrap();
    let second = market
        .create_item(&seller, NewItem::free("Algebra"), &books.id)
        .await
        .unwrap();
    let tx = market.start_transaction(&actor("bob"), &first.id).await.unwrap();

    assert_eq!(
        market.pending_transactions_for_item(&first.id).await.unwrap(),
        vec![tx.id]
    );
    assert!(market
        .pending_transactions_for_item(&second.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn failed_scan_is_never_read_as_no_pending() {
    let (store, market) = common::memory_market();
    let seller = actor("seller");
    let books = market.create_category(&seller, "Books").await.unwrap();
    let item = market
        .create_item(&seller, NewItem::free("Calculus"), &books.id)
        .await
        .unwrap();

    store.deny(transactions());
    let err = market
        .start_transaction(&actor("bob"), &item.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MarketError::Store(StoreError::PermissionDenied(_))
    ));
    assert_eq!(err.disposition(), Disposition::Retry);
    assert!(market.get_item(&item.id).await.unwrap().available);
}

#[tokio::test]
async fn offline_store_surfaces_retryable_errors() {
    let (store, market) = common::memory_market();
    store.set_offline(true);
    let err = market
        .create_category(&actor("alice"), "Books")
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::Store(StoreError::Unavailable(_))));
    assert!(err.is_retryable());

    store.set_offline(false);
    market.create_category(&actor("alice"), "Books").await.unwrap();
}

#[tokio::test]
async fn full_lifecycle_persists_in_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("bazaar.db");

    let (item_id, tx_id) = {
        let market = Market::new(Arc::new(SqliteStore::open_at(&db).unwrap()));
        let seller = actor("seller");
        let books = market.create_category(&seller, "Books").await.unwrap();
        let item = market
            .create_item(&seller, NewItem::priced("Calculus", 1999), &books.id)
            .await
            .unwrap();
        let tx = market.start_transaction(&actor("bob"), &item.id).await.unwrap();
        market.complete_transaction(&seller, &tx.id).await.unwrap();
        (item.id, tx.id)
    };

    let market = Market::new(Arc::new(SqliteStore::open_at(&db).unwrap()));
    let item = market.get_item(&item_id).await.unwrap();
    assert!(!item.available);
    assert_eq!(item.transaction_id.as_ref(), Some(&tx_id));
    let tx = market.get_transaction(&tx_id).await.unwrap();
    assert_eq!(tx.amount_cents, Some(1999));
    assert!(tx.completed_at.is_some());
    assert!(market
        .pending_transactions_for_item(&item_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn sqlite_refuses_second_buyer() {
    let market = Market::new(Arc::new(SqliteStore::open_in_memory().unwrap()));
    let seller = actor("seller");
    let books = market.create_category(&seller, "Books").await.unwrap();
    let item = market
        .create_item(&seller, NewItem::free("Calculus"), &books.id)
        .await
        .unwrap();
    market.start_transaction(&actor("bob"), &item.id).await.unwrap();

    let err = market
        .start_transaction(&actor("carol"), &item.id)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::Unavailable(_)));
}
