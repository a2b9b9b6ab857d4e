//! In-memory upstreams for testing without network calls.

use super::{AffiliateSource, DataSourceError, StoreSource, TransactionPage};
use crate::domain::{AffiliateTransaction, StoreOrder, TransactionStatus, TransactionUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Mock affiliate network holding a mutable transaction list.
///
/// Status changes are applied to the stored transaction, so a transaction that was
/// approved or declined drops out of later `fetch_pending` results. Clones share state.
#[derive(Debug, Clone)]
pub struct MockAffiliateSource {
    transactions: Arc<Mutex<Vec<AffiliateTransaction>>>,
    page_size: usize,
    fail_fetch: bool,
    failing_ids: HashSet<String>,
    partial_responses: bool,
    updates: Arc<Mutex<Vec<(String, TransactionUpdate)>>>,
}

impl MockAffiliateSource {
    pub fn new() -> Self {
        Self {
            transactions: Arc::new(Mutex::new(Vec::new())),
            page_size: 50,
            fail_fetch: false,
            failing_ids: HashSet::new(),
            partial_responses: false,
            updates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_transaction(self, transaction: AffiliateTransaction) -> Self {
        lock(&self.transactions).push(transaction);
        self
    }

    pub fn with_transactions(self, transactions: Vec<AffiliateTransaction>) -> Self {
        lock(&self.transactions).extend(transactions);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make every `fetch_pending` call fail with a 503.
    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    /// Reject updates of the given transaction with a 422.
    pub fn failing_update(mut self, transaction_id: &str) -> Self {
        self.failing_ids.insert(transaction_id.to_string());
        self
    }

    /// Accept updates without echoing the transaction back.
    pub fn partial_responses(mut self) -> Self {
        self.partial_responses = true;
        self
    }

    /// Every update call received, in call order, including rejected ones.
    pub fn recorded_updates(&self) -> Vec<(String, TransactionUpdate)> {
        lock(&self.updates).clone()
    }
}

impl Default for MockAffiliateSource {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl AffiliateSource for MockAffiliateSource {
    async fn fetch_pending(&self, page: u32) -> Result<TransactionPage, DataSourceError> {
        if self.fail_fetch {
            return Err(DataSourceError::HttpError {
                status: 503,
                message: "Service unavailable".to_string(),
            });
        }

        let pending: Vec<AffiliateTransaction> = lock(&self.transactions)
            .iter()
            .filter(|t| t.status == TransactionStatus::Pending)
            .cloned()
            .collect();
        let skip = (page.max(1) as usize - 1) * self.page_size;

        Ok(TransactionPage {
            total_items: pending.len() as u64,
            page_size: self.page_size as u32,
            transactions: pending.into_iter().skip(skip).take(self.page_size).collect(),
        })
    }

    async fn update_transaction(
        &self,
        transaction_id: &str,
        update: &TransactionUpdate,
    ) -> Result<Option<AffiliateTransaction>, DataSourceError> {
        lock(&self.updates).push((transaction_id.to_string(), update.clone()));

        if self.failing_ids.contains(transaction_id) {
            return Err(DataSourceError::HttpError {
                status: 422,
                message: format!("Transaction {} cannot be changed", transaction_id),
            });
        }

        let mut transactions = lock(&self.transactions);
        let tx = transactions
            .iter_mut()
            .find(|t| t.id == transaction_id)
            .ok_or_else(|| DataSourceError::HttpError {
                status: 404,
                message: format!("Transaction {} not found", transaction_id),
            })?;

        if let Some(status) = update.status {
            tx.status = status.into();
        }
        if let Some(amount) = update.order_amount {
            tx.order_amount = amount;
            tx.original_order_amount = amount;
            if let Some(currency) = &update.currency {
                tx.original_currency = currency.clone();
            }
        }

        Ok((!self.partial_responses).then(|| tx.clone()))
    }
}

/// Mock store returning a fixed order list and recording requested windows.
#[derive(Debug, Clone, Default)]
pub struct MockStoreSource {
    orders: Vec<StoreOrder>,
    fail: bool,
    windows: Arc<Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>>,
}

impl MockStoreSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(mut self, order: StoreOrder) -> Self {
        self.orders.push(order);
        self
    }

    pub fn with_orders(mut self, orders: Vec<StoreOrder>) -> Self {
        self.orders.extend(orders);
        self
    }

    /// Make every `fetch_orders` call fail with a 500.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn requested_windows(&self) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        lock(&self.windows).clone()
    }
}

#[async_trait]
impl StoreSource for MockStoreSource {
    async fn fetch_orders(
        &self,
        created_from: DateTime<Utc>,
        created_to: DateTime<Utc>,
    ) -> Result<Vec<StoreOrder>, DataSourceError> {
        lock(&self.windows).push((created_from, created_to));
        if self.fail {
            return Err(DataSourceError::HttpError {
                status: 500,
                message: "Server error".to_string(),
            });
        }
        Ok(self.orders.clone())
    }
}
