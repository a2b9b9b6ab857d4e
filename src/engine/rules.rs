//! Selection, classification and equalization rules over enriched transactions.

use crate::domain::Decimal;
use crate::engine::matcher::EnrichedTransaction;
use serde::Serialize;

/// Display classification of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowClass {
    /// Checked by the operator or by default.
    Selected,
    /// Affiliate amount exceeds the store price by more than the threshold.
    Mismatched,
    Neutral,
}

/// Thresholds and labels that drive reconciliation decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileRules {
    /// Maximum deviation for a transaction to be pre-checked.
    pub tolerance: Decimal,
    /// Deviation above which a row is flagged and equalization is offered.
    pub mismatch_threshold: Decimal,
    /// Store status label meaning the order is complete.
    pub completed_status: String,
    /// Currency of the network's default-currency amount.
    pub default_currency: String,
}

impl Default for ReconcileRules {
    fn default() -> Self {
        Self {
            tolerance: Decimal::new(rust_decimal::Decimal::new(1, 1)),
            mismatch_threshold: Decimal::one(),
            completed_status: "Dokončeno".to_string(),
            default_currency: "CZK".to_string(),
        }
    }
}

impl ReconcileRules {
    /// Whether a freshly loaded transaction starts out checked.
    pub fn default_selected(&self, tx: &EnrichedTransaction) -> bool {
        if tx.store_status() != Some(self.completed_status.as_str()) {
            return false;
        }
        tx.deviation()
            .map(|dev| dev.abs() <= self.tolerance)
            .unwrap_or(false)
    }

    pub fn classify(&self, tx: &EnrichedTransaction, checked: bool) -> RowClass {
        if checked {
            return RowClass::Selected;
        }
        match tx.store_price() {
            Some(price) if tx.comparable_amount() > price + self.mismatch_threshold => {
                RowClass::Mismatched
            }
            _ => RowClass::Neutral,
        }
    }

    pub fn can_equalize(&self, tx: &EnrichedTransaction) -> bool {
        tx.deviation()
            .map(|dev| dev.abs() > self.mismatch_threshold)
            .unwrap_or(false)
    }
}
