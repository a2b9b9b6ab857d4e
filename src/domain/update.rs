//! Mutation request sent to the affiliate network for a single transaction.

use crate::domain::{AffiliateTransaction, Decimal, StatusChange};
use serde::Serialize;

/// A status change, an amount correction, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl TransactionUpdate {
    pub fn status(status: StatusChange) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Amount correction; `currency` is only meaningful alongside an amount.
    pub fn amount(order_amount: Decimal, currency: Option<String>) -> Self {
        Self {
            status: None,
            order_amount: Some(order_amount),
            currency,
        }
    }

    /// True when neither a status nor an amount is set.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.order_amount.is_none()
    }

    /// Drop a currency that came without an amount and blank currency codes.
    pub fn normalized(mut self) -> Self {
        if self.order_amount.is_none() {
            self.currency = None;
        }
        self.currency = self.currency.filter(|c| !c.trim().is_empty());
        self
    }

    /// `tx` as it looks once the network has accepted this update.
    ///
    /// An amount without a currency is in `default_currency`. It lands on the
    /// original-currency fields when the currencies agree or a currency was sent.
    pub fn applied_to(
        &self,
        tx: &AffiliateTransaction,
        default_currency: &str,
    ) -> AffiliateTransaction {
        let mut out = tx.clone();
        if let Some(status) = self.status {
            out.status = status.into();
        }
        if let Some(amount) = self.order_amount {
            let currency = self.currency.as_deref().unwrap_or(default_currency);
            if currency == default_currency {
                out.order_amount = amount;
            }
            if self.currency.is_some() || currency == out.original_currency {
                out.original_order_amount = amount;
                out.original_currency = currency.to_string();
            }
        }
        out
    }
}
