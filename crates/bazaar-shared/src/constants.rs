/// Category documents, keyed by category id.
pub const CATEGORIES: &str = "categories";

/// Item documents, keyed by item id.
pub const ITEMS: &str = "items";

/// Materialized `categoryId -> { itemId: true }` index.
pub const CATEGORY_ITEMS: &str = "category-items";

/// Transaction documents, keyed by transaction id.
pub const TRANSACTIONS: &str = "transactions";

/// Per-user `userId -> { transactionId: true }` index.
pub const USER_TRANSACTIONS: &str = "user-transactions";

/// User profile documents, keyed by user id.
pub const USERS: &str = "users";

/// Field on a transaction document used for the indexed item lookup.
pub const TX_ITEM_FIELD: &str = "itemId";

/// Number of leading characters of a user id used when no display name is known.
pub const SHORT_ID_LEN: usize = 8;
