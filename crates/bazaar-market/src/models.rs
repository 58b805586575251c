//! Domain entities and the document shapes they are stored as.
//!
//! Public structs are what operations and feeds return; they serialize with
//! the same camelCase names the store uses, plus the `id` taken from the
//! document key.  The `*Record` structs describe the stored documents and
//! are tolerant of missing optional fields.

use bazaar_shared::{CategoryId, ItemId, TransactionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use bazaar_store::server_timestamp;

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub created_by: UserId,
    /// Owner's display name when the category was written.  Never refreshed.
    pub created_by_name: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CategoryRecord {
    pub name: String,
    pub created_by: UserId,
    #[serde(default)]
    pub created_by_name: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

impl CategoryRecord {
    pub fn into_category(self, id: CategoryId) -> Category {
        Category {
            id,
            name: self.name,
            created_by: self.created_by,
            created_by_name: self.created_by_name,
            created_at: from_millis(self.created_at),
        }
    }
}

pub(crate) fn category_document(name: &str, owner: &UserId, owner_name: &str) -> Value {
    json!({
        "name": name,
        "createdBy": owner,
        "createdByName": owner_name,
        "createdAt": server_timestamp(),
    })
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// How an item is priced.  An item is either free or has a price, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pricing {
    Free,
    Cents(i64),
}

impl Pricing {
    /// Build from form-style input: a free flag plus decimal price text.
    pub fn from_input(is_free: bool, price_text: Option<&str>) -> crate::Result<Self> {
        if is_free {
            return Ok(Pricing::Free);
        }
        let cents = bazaar_shared::parse_price_cents(price_text.unwrap_or(""))?;
        Ok(Pricing::Cents(cents))
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Pricing::Free)
    }

    pub fn cents(&self) -> Option<i64> {
        match self {
            Pricing::Free => None,
            Pricing::Cents(c) => Some(*c),
        }
    }

    pub(crate) fn validate(&self) -> crate::Result<()> {
        match self {
            Pricing::Cents(c) if *c < 0 => Err(crate::MarketError::Validation(
                "Price must be non-negative".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub description: Option<String>,
    pub is_free: bool,
    pub price_cents: Option<i64>,
    pub author_id: UserId,
    /// Author's display name when the item was written.  Never refreshed.
    pub created_by_name: Option<String>,
    pub category_id: Option<CategoryId>,
    pub available: bool,
    pub transaction_id: Option<TransactionId>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn pricing(&self) -> Pricing {
        match (self.is_free, self.price_cents) {
            (false, Some(cents)) => Pricing::Cents(cents),
            _ => Pricing::Free,
        }
    }

    /// Categories whose index lists this item while it is available.
    ///
    /// Items belong to a single category today; the index itself is
    /// `category -> set of items`, so callers iterate.
    pub fn categories(&self) -> Vec<CategoryId> {
        self.category_id.iter().cloned().collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ItemRecord {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub price_cents: Option<i64>,
    pub author_id: UserId,
    #[serde(default)]
    pub created_by_name: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub transaction_id: Option<TransactionId>,
    #[serde(default)]
    pub created_at: i64,
}

impl ItemRecord {
    pub fn into_item(self, id: ItemId) -> Item {
        Item {
            id,
            title: self.title,
            description: self.description,
            is_free: self.is_free,
            price_cents: self.price_cents,
            author_id: self.author_id,
            created_by_name: self.created_by_name,
            category_id: self.category_id,
            available: self.available,
            transaction_id: self.transaction_id,
            created_at: from_millis(self.created_at),
        }
    }
}

/// Input for creating an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub title: String,
    pub description: Option<String>,
    pub pricing: Pricing,
}

/// Fields an author may change on an item.  `None` leaves a field untouched;
/// `description: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub pricing: Option<Pricing>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.pricing.is_none()
    }
}

pub(crate) fn item_document(
    new_item: &NewItem,
    author: &UserId,
    author_name: &str,
    category: &CategoryId,
) -> Value {
    let mut doc = Map::new();
    doc.insert("title".into(), json!(new_item.title));
    if let Some(description) = &new_item.description {
        doc.insert("description".into(), json!(description));
    }
    doc.insert("isFree".into(), json!(new_item.pricing.is_free()));
    if let Some(cents) = new_item.pricing.cents() {
        doc.insert("priceCents".into(), json!(cents));
    }
    doc.insert("authorId".into(), json!(author));
    doc.insert("createdByName".into(), json!(author_name));
    doc.insert("categoryId".into(), json!(category));
    doc.insert("available".into(), json!(true));
    doc.insert("createdAt".into(), server_timestamp());
    Value::Object(doc)
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
        }
    }

    /// Case-insensitive match against a stored status string.
    pub fn matches(&self, raw: &str) -> bool {
        raw.eq_ignore_ascii_case(self.as_str())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [TransactionStatus::Pending, TransactionStatus::Completed]
            .into_iter()
            .find(|s| s.matches(raw))
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub item_id: ItemId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub status: TransactionStatus,
    /// Absent for free items.
    pub amount_cents: Option<i64>,
    /// Item title when the transaction started.  Never refreshed.
    pub item_title: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<UserId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionRecord {
    pub item_id: ItemId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub status: String,
    #[serde(default)]
    pub amount_cents: Option<i64>,
    #[serde(default)]
    pub item_title: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub completed_at: Option<i64>,
    #[serde(default)]
    pub completed_by: Option<UserId>,
}

impl TransactionRecord {
    /// `None` when the stored status is not one this engine understands.
    pub fn into_transaction(self, id: TransactionId) -> Option<Transaction> {
        let status = TransactionStatus::parse(&self.status)?;
        Some(Transaction {
            id,
            item_id: self.item_id,
            buyer_id: self.buyer_id,
            seller_id: self.seller_id,
            status,
            amount_cents: self.amount_cents,
            item_title: self.item_title,
            created_at: from_millis(self.created_at),
            completed_at: self.completed_at.map(from_millis),
            completed_by: self.completed_by,
        })
    }
}

pub(crate) fn transaction_document(item: &Item, buyer: &UserId) -> Value {
    let mut doc = Map::new();
    doc.insert("itemId".into(), json!(item.id));
    doc.insert("buyerId".into(), json!(buyer));
    doc.insert("sellerId".into(), json!(item.author_id));
    doc.insert("status".into(), json!(TransactionStatus::Pending.as_str()));
    if let Some(cents) = item.pricing().cents() {
        doc.insert("amountCents".into(), json!(cents));
    }
    doc.insert("itemTitle".into(), json!(item.title));
    doc.insert("createdAt".into(), server_timestamp());
    Value::Object(doc)
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: UserId,
    pub display_name: Option<String>,
    /// Older profiles carry `username` instead of `displayName`.
    pub username: Option<String>,
}

impl Profile {
    /// Best name to show for this user, if the profile has one.
    pub fn preferred_name(&self) -> Option<&str> {
        [self.display_name.as_deref(), self.username.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|n| !n.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProfileRecord {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl ProfileRecord {
    pub fn into_profile(self, user_id: UserId) -> Profile {
        Profile {
            user_id,
            display_name: self.display_name,
            username: self.username,
        }
    }
}
