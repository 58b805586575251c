//! End-to-end walk through the marketplace lifecycle.

mod common;

use bazaar_market::{Disposition, EntityKind, MarketError, NewItem, TransactionStatus};
use bazaar_store::{DocPath, DocumentStore};

use common::{actor, memory_market, named};

#[tokio::test]
async fn list_buy_complete_and_clean_up() {
    let (_store, market) = memory_market();
    let alice = named("alice", "Alice");
    let bob = named("bob", "Bob");

    // Alice lists "Calculus" under "Books".
    let books = market.create_category(&alice, "Books").await.unwrap();
    assert_eq!(books.created_by_name.as_deref(), Some("Alice"));
    let calculus = market
        .create_item(&alice, NewItem::priced("Calculus", 1999), &books.id)
        .await
        .unwrap();

    let mut listing = market.items_in_category(&books.id).unwrap();
    let items = listing.next().await.unwrap().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, calculus.id);
    assert_eq!(items[0].price_cents, Some(1999));
    assert!(items[0].available);

    // A listed item blocks category deletion.
    let err = market.delete_category(&alice, &books.id).await.unwrap_err();
    assert!(matches!(err, MarketError::NotEmpty(_)));
    assert_eq!(err.disposition(), Disposition::Stop);

    // Bob buys it.
    let tx = market.start_transaction(&bob, &calculus.id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.buyer_id, bob.id);
    assert_eq!(tx.seller_id, alice.id);
    assert_eq!(tx.amount_cents, Some(1999));

    let item = market.get_item(&calculus.id).await.unwrap();
    assert!(!item.available);
    assert!(listing.next().await.unwrap().unwrap().is_empty());
    listing.unsubscribe();

    // Alice completes it; a second completion and the buyer are refused.
    let done = market.complete_transaction(&alice, &tx.id).await.unwrap();
    assert_eq!(done.status, TransactionStatus::Completed);

    let again = market.complete_transaction(&alice, &tx.id).await.unwrap_err();
    assert!(matches!(again, MarketError::AlreadyCompleted(_)));
    let by_buyer = market.complete_transaction(&bob, &tx.id).await.unwrap_err();
    assert!(matches!(by_buyer, MarketError::Ownership { kind: EntityKind::Transaction, .. }));

    let stored = market.get_transaction(&tx.id).await.unwrap();
    assert_eq!(stored.completed_at, done.completed_at);

    // The sold item left the index, so the category can go now.
    market.delete_category(&alice, &books.id).await.unwrap();
    assert!(matches!(
        market.get_category(&books.id).await,
        Err(MarketError::NotFound { .. })
    ));
}

#[tokio::test]
async fn self_purchase_changes_nothing() {
    let (store, market) = memory_market();
    let alice = actor("alice");
    let books = market.create_category(&alice, "Books").await.unwrap();
    let item = market
        .create_item(&alice, NewItem::free("Calculus"), &books.id)
        .await
        .unwrap();

    let before = store.get(&DocPath::root()).await.unwrap();
    let err = market.start_transaction(&alice, &item.id).await.unwrap_err();
    assert!(matches!(err, MarketError::SelfPurchase(_)));
    let after = store.get(&DocPath::root()).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn index_tracks_item_lifecycle() {
    let (store, market) = memory_market();
    let alice = actor("alice");
    let books = market.create_category(&alice, "Books").await.unwrap();
    let item = market
        .create_item(&alice, NewItem::free("Calculus"), &books.id)
        .await
        .unwrap();

    let entry = DocPath::new(["category-items", books.id.as_str(), item.id.as_str()]).unwrap();
    assert!(store.get(&entry).await.unwrap().exists());

    market.delete_item(&alice, &item.id).await.unwrap();
    assert!(!store.get(&entry).await.unwrap().exists());
    assert!(market.is_category_empty(&books.id).await.unwrap());
}

#[tokio::test]
async fn rename_and_delete_wait_for_empty_category() {
    let (_store, market) = memory_market();
    let alice = actor("alice");
    let books = market.create_category(&alice, "Books").await.unwrap();
    let item = market
        .create_item(&alice, NewItem::free("Calculus"), &books.id)
        .await
        .unwrap();

    let err = market
        .rename_category(&alice, &books.id, "Textbooks")
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::NotEmpty(_)));

    market.delete_item(&alice, &item.id).await.unwrap();
    let renamed = market
        .rename_category(&alice, &books.id, "Textbooks")
        .await
        .unwrap();
    assert_eq!(renamed.name, "Textbooks");
}

#[tokio::test]
async fn pending_item_cannot_be_edited_or_deleted() {
    let (_store, market) = memory_market();
    let alice = actor("alice");
    let books = market.create_category(&alice, "Books").await.unwrap();
    let item = market
        .create_item(&alice, NewItem::priced("Calculus", 500), &books.id)
        .await
        .unwrap();
    market.start_transaction(&actor("bob"), &item.id).await.unwrap();

    let patch = bazaar_market::ItemPatch {
        title: Some("Calculus II".into()),
        ..Default::default()
    };
    let err = market.update_item(&alice, &item.id, patch).await.unwrap_err();
    assert!(matches!(err, MarketError::HasPendingTransaction(_)));

    let err = market.delete_item(&alice, &item.id).await.unwrap_err();
    assert!(matches!(err, MarketError::HasPendingTransaction(_)));
}

#[tokio::test]
async fn profile_name_is_cached_on_new_records_only() {
    let (_store, market) = memory_market();
    let alice = actor("alice-0123456789");

    let first = market.create_category(&alice, "Books").await.unwrap();
    assert_eq!(first.created_by_name.as_deref(), Some("alice-01"));

    market.save_profile(&alice, "Alice").await.unwrap();
    let second = market.create_category(&alice, "Games").await.unwrap();
    assert_eq!(second.created_by_name.as_deref(), Some("Alice"));

    // Older records keep the name they were written with.
    let first = market.get_category(&first.id).await.unwrap();
    assert_eq!(first.created_by_name.as_deref(), Some("alice-01"));
}
