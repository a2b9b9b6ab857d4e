//! Loading one reconciled page: affiliate page, store window, join.

use crate::datasource::{AffiliateSource, StoreSource};
use crate::domain::AffiliateTransaction;
use crate::engine::{enrich_all, EnrichedTransaction};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

/// One page of enriched pending transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledPage {
    pub page: u32,
    pub total_items: u64,
    pub total_pages: u64,
    pub transactions: Vec<EnrichedTransaction>,
}

#[derive(Debug, Clone)]
pub struct PageLoader {
    affiliate: Arc<dyn AffiliateSource>,
    store: Arc<dyn StoreSource>,
    window_padding: Duration,
}

impl PageLoader {
    pub fn new(
        affiliate: Arc<dyn AffiliateSource>,
        store: Arc<dyn StoreSource>,
        window_padding: Duration,
    ) -> Self {
        Self {
            affiliate,
            store,
            window_padding,
        }
    }

    /// Load and reconcile page `page` (1-based).
    ///
    /// Upstream failures degrade instead of failing: a failed affiliate fetch yields an
    /// empty page, a failed store fetch yields unmatched transactions.
    pub async fn load(&self, page: u32) -> ReconciledPage {
        let page = page.max(1);
        let listing = match self.affiliate.fetch_pending(page).await {
            Ok(listing) => listing,
            Err(e) => {
                error!("Failed to fetch pending transactions (page {}): {}", page, e);
                return ReconciledPage {
                    page,
                    total_items: 0,
                    total_pages: 0,
                    transactions: Vec::new(),
                };
            }
        };

        let total_pages = listing
            .total_items
            .div_ceil(u64::from(listing.page_size.max(1)));
        let transactions = self.enrich(listing.transactions).await;

        info!(
            "Loaded page {}/{}: {} transactions, {} matched",
            page,
            total_pages,
            transactions.len(),
            transactions.iter().filter(|t| t.store.is_some()).count()
        );

        ReconciledPage {
            page,
            total_items: listing.total_items,
            total_pages,
            transactions,
        }
    }

    async fn enrich(&self, transactions: Vec<AffiliateTransaction>) -> Vec<EnrichedTransaction> {
        let Some((from, to)) = store_window(&transactions, self.window_padding) else {
            return Vec::new();
        };

        match self.store.fetch_orders(from, to).await {
            Ok(orders) => enrich_all(transactions, orders),
            Err(e) => {
                warn!("Failed to fetch store orders ({} .. {}): {}", from, to, e);
                transactions
                    .into_iter()
                    .map(EnrichedTransaction::unmatched)
                    .collect()
            }
        }
    }
}

/// Creation-time window covering every transaction, with `padding` added after the
/// newest one. `None` for an empty page.
pub fn store_window(
    transactions: &[AffiliateTransaction],
    padding: Duration,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let min = transactions.iter().map(|t| t.date_time).min()?;
    let max = transactions.iter().map(|t| t.date_time).max()?;
    Some((min, max + padding))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{MockAffiliateSource, MockStoreSource};
    use crate::domain::{Decimal, LineItem, StoreOrder, TransactionStatus};
    use chrono::TimeZone;

    fn tx(id: &str, order_id: &str, hour: u32) -> AffiliateTransaction {
        AffiliateTransaction {
            id: id.to_string(),
            order_id: order_id.to_string(),
            date_time: Utc.with_ymd_and_hms(2024, 5, 10, hour, 15, 0).unwrap(),
            order_amount: Decimal::from(100),
            original_order_amount: Decimal::from(100),
            original_currency: "CZK".to_string(),
            commission: Decimal::from(5),
            status: TransactionStatus::Pending,
            can_change_status: true,
        }
    }

    fn order(number: &str) -> StoreOrder {
        StoreOrder {
            order_number: number.to_string(),
            currency: "CZK".to_string(),
            status: Some("Dokončeno".to_string()),
            admin_url: format!("https://admin/{}", number),
            products: vec![LineItem {
                unit_price_excl_vat: Decimal::from(100),
                quantity: Some(Decimal::one()),
            }],
            loyalty_points: None,
            discount_voucher: None,
        }
    }

    fn loader(affiliate: MockAffiliateSource, store: MockStoreSource) -> PageLoader {
        PageLoader::new(Arc::new(affiliate), Arc::new(store), Duration::hours(1))
    }

    #[test]
    fn test_store_window_pads_max_by_an_hour() {
        let txs = vec![tx("a", "1", 12), tx("b", "2", 8), tx("c", "3", 10)];
        let (from, to) = store_window(&txs, Duration::hours(1)).unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 5, 10, 8, 15, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2024, 5, 10, 13, 15, 0).unwrap());
        assert!(store_window(&[], Duration::hours(1)).is_none());
    }

    #[tokio::test]
    async fn test_load_joins_and_counts_pages() {
        let store = MockStoreSource::new().with_order(order("1"));
        let affiliate = MockAffiliateSource::new()
            .with_transactions((0..51).map(|i| tx(&i.to_string(), &i.to_string(), 9)).collect());

        let page = loader(affiliate, store.clone()).load(1).await;
        assert_eq!(page.total_items, 51);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.transactions.len(), 50);
        assert!(page.transactions[1].store.is_some());
        assert!(page.transactions[0].store.is_none());
        assert_eq!(store.requested_windows().len(), 1);
    }

    #[tokio::test]
    async fn test_page_count_follows_upstream_page_size() {
        let affiliate = MockAffiliateSource::new()
            .with_transactions((0..7).map(|i| tx(&i.to_string(), "x", 9)).collect())
            .with_page_size(3);

        let page = loader(affiliate, MockStoreSource::new()).load(3).await;
        assert_eq!(page.total_items, 7);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.transactions.len(), 1);
    }

    #[tokio::test]
    async fn test_affiliate_failure_yields_empty_page() {
        let store = MockStoreSource::new();
        let page = loader(MockAffiliateSource::new().failing_fetch(), store.clone())
            .load(3)
            .await;
        assert_eq!(page.page, 3);
        assert!(page.transactions.is_empty());
        assert_eq!(page.total_pages, 0);
        assert!(store.requested_windows().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_yields_unmatched_transactions() {
        let affiliate = MockAffiliateSource::new().with_transaction(tx("a", "1", 9));
        let store = MockStoreSource::new().with_order(order("1")).failing();

        let page = loader(affiliate, store).load(1).await;
        assert_eq!(page.transactions.len(), 1);
        assert!(page.transactions[0].store.is_none());
    }

    #[tokio::test]
    async fn test_empty_page_skips_store_call() {
        let store = MockStoreSource::new();
        let page = loader(MockAffiliateSource::new(), store.clone()).load(1).await;
        assert!(page.transactions.is_empty());
        assert!(store.requested_windows().is_empty());
    }
}
