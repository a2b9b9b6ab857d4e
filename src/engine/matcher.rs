//! Joining affiliate transactions to store orders by order number.

use crate::domain::{AffiliateTransaction, Decimal, StoreOrder};
use crate::engine::pricing::{comparable_affiliate_amount, store_price};
use serde::Serialize;
use std::collections::HashMap;

/// Store-side data attached to a transaction whose order was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMatch {
    pub price: Decimal,
    pub currency: String,
    pub status: Option<String>,
    pub admin_url: String,
}

impl StoreMatch {
    pub fn from_order(order: &StoreOrder) -> Self {
        Self {
            price: store_price(order),
            currency: order.currency.clone(),
            status: order.status.clone(),
            admin_url: order.admin_url.clone(),
        }
    }
}

/// An affiliate transaction with its (optional) store match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTransaction {
    #[serde(flatten)]
    pub transaction: AffiliateTransaction,
    pub store: Option<StoreMatch>,
}

impl EnrichedTransaction {
    pub fn unmatched(transaction: AffiliateTransaction) -> Self {
        Self {
            transaction,
            store: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.transaction.id
    }

    pub fn store_price(&self) -> Option<Decimal> {
        self.store.as_ref().map(|s| s.price)
    }

    pub fn store_currency(&self) -> Option<&str> {
        self.store.as_ref().map(|s| s.currency.as_str())
    }

    pub fn store_status(&self) -> Option<&str> {
        self.store.as_ref().and_then(|s| s.status.as_deref())
    }

    /// Affiliate amount in the store's currency when the currencies line up.
    pub fn comparable_amount(&self) -> Decimal {
        comparable_affiliate_amount(&self.transaction, self.store_currency())
    }

    /// Affiliate amount minus store price, when a store price exists.
    pub fn deviation(&self) -> Option<Decimal> {
        self.store_price().map(|price| self.comparable_amount() - price)
    }

    /// Currency the comparable amount is expressed in, given the network's default.
    pub fn display_currency<'a>(&'a self, default_currency: &'a str) -> &'a str {
        match self.store_currency() {
            Some(currency) if currency == self.transaction.original_currency => currency,
            _ => default_currency,
        }
    }
}

/// Lookup of store orders by order number.
#[derive(Debug, Default)]
pub struct OrderIndex {
    by_number: HashMap<String, StoreOrder>,
}

impl OrderIndex {
    /// Build the index. Duplicate order numbers resolve to the last order seen.
    pub fn new(orders: Vec<StoreOrder>) -> Self {
        let mut by_number = HashMap::with_capacity(orders.len());
        for order in orders {
            by_number.insert(order.order_number.clone(), order);
        }
        Self { by_number }
    }

    pub fn get(&self, order_number: &str) -> Option<&StoreOrder> {
        self.by_number.get(order_number)
    }

    pub fn len(&self) -> usize {
        self.by_number.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_number.is_empty()
    }

    pub fn enrich(&self, transaction: AffiliateTransaction) -> EnrichedTransaction {
        let store = self.get(&transaction.order_id).map(StoreMatch::from_order);
        EnrichedTransaction { transaction, store }
    }
}

/// Join transactions to orders, preserving transaction order.
pub fn enrich_all(
    transactions: Vec<AffiliateTransaction>,
    orders: Vec<StoreOrder>,
) -> Vec<EnrichedTransaction> {
    let index = OrderIndex::new(orders);
    transactions.into_iter().map(|t| index.enrich(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LineItem, TransactionStatus};
    use chrono::Utc;

    fn tx(id: &str, order_id: &str) -> AffiliateTransaction {
        AffiliateTransaction {
            id: id.to_string(),
            order_id: order_id.to_string(),
            date_time: Utc::now(),
            order_amount: Decimal::from(100),
            original_order_amount: Decimal::from(100),
            original_currency: "CZK".to_string(),
            commission: Decimal::zero(),
            status: TransactionStatus::Pending,
            can_change_status: true,
        }
    }

    fn order(number: &str, price: i64, admin_url: &str) -> StoreOrder {
        StoreOrder {
            order_number: number.to_string(),
            currency: "CZK".to_string(),
            status: Some("Dokončeno".to_string()),
            admin_url: admin_url.to_string(),
            products: vec![LineItem {
                unit_price_excl_vat: Decimal::from(price),
                quantity: Some(Decimal::one()),
            }],
            loyalty_points: None,
            discount_voucher: None,
        }
    }

    #[test]
    fn test_enrich_matches_by_order_number() {
        let enriched = enrich_all(
            vec![tx("a", "1001"), tx("b", "1002")],
            vec![order("1002", 80, "https://admin/1002")],
        );

        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched[0].id(), "a");
        assert!(enriched[0].store.is_none());
        assert_eq!(enriched[0].store_price(), None);
        assert_eq!(enriched[0].store_currency(), None);
        assert_eq!(enriched[0].store_status(), None);

        let matched = enriched[1].store.as_ref().unwrap();
        assert_eq!(matched.price, Decimal::from(80));
        assert_eq!(matched.currency, "CZK");
        assert_eq!(matched.status.as_deref(), Some("Dokončeno"));
        assert_eq!(matched.admin_url, "https://admin/1002");
        assert_eq!(enriched[1].deviation(), Some(Decimal::from(20)));
    }

    #[test]
    fn test_duplicate_order_numbers_last_write_wins() {
        let index = OrderIndex::new(vec![
            order("1001", 10, "https://admin/first"),
            order("1001", 20, "https://admin/second"),
        ]);
        assert_eq!(index.len(), 1);
        let enriched = index.enrich(tx("a", "1001"));
        assert_eq!(enriched.store_price(), Some(Decimal::from(20)));
        assert_eq!(enriched.store.unwrap().admin_url, "https://admin/second");
    }

    #[test]
    fn test_display_currency_follows_compared_amount() {
        let mut t = tx("a", "1");
        t.original_currency = "EUR".to_string();
        assert_eq!(
            EnrichedTransaction::unmatched(t.clone()).display_currency("CZK"),
            "CZK"
        );

        let mut eur_order = order("1", 20, "https://admin/1");
        eur_order.currency = "EUR".to_string();
        let matched = enrich_all(vec![t.clone()], vec![eur_order]);
        assert_eq!(matched[0].display_currency("CZK"), "EUR");

        let czk_order = order("1", 20, "https://admin/1");
        let matched = enrich_all(vec![t], vec![czk_order]);
        assert_eq!(matched[0].display_currency("CZK"), "CZK");
    }
}
