//! Pure reconciliation logic: pricing, joining and per-row decisions.

pub mod matcher;
pub mod pricing;
pub mod rules;

pub use matcher::{enrich_all, EnrichedTransaction, OrderIndex, StoreMatch};
pub use pricing::{comparable_affiliate_amount, discount_excl_vat, store_price};
pub use rules::{ReconcileRules, RowClass};
