//! Domain types shared by the upstream clients and the reconciliation engine.
//!
//! This module provides:
//! - Lossless money handling via the Decimal wrapper
//! - Affiliate transactions and their status vocabulary
//! - Store orders with line items and discount entries
//! - The mutation payload sent back to the affiliate network

pub mod decimal;
pub mod store_order;
pub mod transaction;
pub mod update;

pub use decimal::Decimal;
pub use store_order::{Discount, DiscountGroup, LineItem, StoreOrder};
pub use transaction::{AffiliateTransaction, StatusChange, TransactionStatus};
pub use update::TransactionUpdate;
