//! # bazaar-shared
//!
//! Identifiers, identity context and small value types shared by every
//! Bazaar crate.

pub mod constants;
pub mod error;
pub mod price;
pub mod types;

pub use error::SharedError;
pub use price::parse_price_cents;
pub use types::{Actor, CategoryId, ItemId, TransactionId, UserId};
