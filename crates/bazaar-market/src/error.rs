use std::fmt;

use bazaar_shared::{CategoryId, ItemId, SharedError, TransactionId, UserId};
use bazaar_store::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Category,
    Item,
    Transaction,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Category => "Category",
            EntityKind::Item => "Item",
            EntityKind::Transaction => "Transaction",
        })
    }
}

/// Failures reported by market operations.
#[derive(Error, Debug)]
pub enum MarketError {
    /// Bad input.  Detected before anything is written.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No usable identity was supplied.
    #[error("Identity error: {0}")]
    Identity(String),

    #[error("User {actor} may not {action} {kind} {id}")]
    Ownership {
        actor: UserId,
        action: &'static str,
        kind: EntityKind,
        id: String,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("A category named '{0}' already exists")]
    DuplicateName(String),

    #[error("Category {0} still lists items")]
    NotEmpty(CategoryId),

    #[error("Item {0} is no longer available")]
    Unavailable(ItemId),

    #[error("Item {0} already has a pending transaction")]
    AlreadyPending(ItemId),

    #[error("Item {0} cannot change while a transaction is pending")]
    HasPendingTransaction(ItemId),

    #[error("Transaction {0} is already completed")]
    AlreadyCompleted(TransactionId),

    #[error("Cannot buy your own item {0}")]
    SelfPurchase(ItemId),

    /// A stored document could not be decoded.
    #[error("Malformed document at {path}: {reason}")]
    Corrupt { path: String, reason: String },

    /// Network or permission failure reported by the store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// What a caller should do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Transient; the same request may succeed later.
    Retry,
    /// The request itself must change.
    ChangeInput,
    /// Nothing the caller can do will make this request succeed.
    Stop,
}

impl MarketError {
    pub fn disposition(&self) -> Disposition {
        match self {
            MarketError::Store(e) if e.is_retryable() => Disposition::Retry,
            MarketError::Store(_) => Disposition::Stop,
            MarketError::Validation(_) | MarketError::DuplicateName(_) => {
                Disposition::ChangeInput
            }
            MarketError::Identity(_)
            | MarketError::Ownership { .. }
            | MarketError::NotFound { .. }
            | MarketError::NotEmpty(_)
            | MarketError::Unavailable(_)
            | MarketError::AlreadyPending(_)
            | MarketError::HasPendingTransaction(_)
            | MarketError::AlreadyCompleted(_)
            | MarketError::SelfPurchase(_)
            | MarketError::Corrupt { .. } => Disposition::Stop,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.disposition() == Disposition::Retry
    }

    pub(crate) fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        MarketError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<SharedError> for MarketError {
    fn from(e: SharedError) -> Self {
        MarketError::Validation(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MarketError>;
