//! Locations of every view in the document tree.

use bazaar_shared::constants::{
    CATEGORIES, CATEGORY_ITEMS, ITEMS, TRANSACTIONS, USERS, USER_TRANSACTIONS,
};
use bazaar_shared::{CategoryId, ItemId, TransactionId, UserId};
use bazaar_store::{DocPath, Result};

pub(crate) fn categories() -> Result<DocPath> {
    DocPath::new([CATEGORIES])
}

pub(crate) fn category(id: &CategoryId) -> Result<DocPath> {
    DocPath::new([CATEGORIES, id.as_str()])
}

pub(crate) fn items() -> Result<DocPath> {
    DocPath::new([ITEMS])
}

pub(crate) fn item(id: &ItemId) -> Result<DocPath> {
    DocPath::new([ITEMS, id.as_str()])
}

pub(crate) fn item_field(id: &ItemId, field: &str) -> Result<DocPath> {
    DocPath::new([ITEMS, id.as_str(), field])
}

/// `category-items/{category}`: the set of items listed under a category.
pub(crate) fn category_index(category: &CategoryId) -> Result<DocPath> {
    DocPath::new([CATEGORY_ITEMS, category.as_str()])
}

pub(crate) fn category_index_entry(category: &CategoryId, item: &ItemId) -> Result<DocPath> {
    DocPath::new([CATEGORY_ITEMS, category.as_str(), item.as_str()])
}

pub(crate) fn transactions() -> Result<DocPath> {
    DocPath::new([TRANSACTIONS])
}

pub(crate) fn transaction(id: &TransactionId) -> Result<DocPath> {
    DocPath::new([TRANSACTIONS, id.as_str()])
}

pub(crate) fn transaction_field(id: &TransactionId, field: &str) -> Result<DocPath> {
    DocPath::new([TRANSACTIONS, id.as_str(), field])
}

pub(crate) fn user_transaction(user: &UserId, tx: &TransactionId) -> Result<DocPath> {
    DocPath::new([USER_TRANSACTIONS, user.as_str(), tx.as_str()])
}

pub(crate) fn user(id: &UserId) -> Result<DocPath> {
    DocPath::new([USERS, id.as_str()])
}
