//! The operator's working set: current page, selection and in-flight state.

use crate::domain::{AffiliateTransaction, Decimal, TransactionStatus};
use crate::engine::{EnrichedTransaction, ReconcileRules, RowClass};
use crate::orchestration::loader::ReconciledPage;
use crate::orchestration::MutationError;
use serde::Serialize;
use std::collections::HashSet;

/// In-flight state of a single transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    #[default]
    Idle,
    Busy,
}

/// In-flight state of a bulk run over the working set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkState {
    #[default]
    Idle,
    Running,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub transaction: EnrichedTransaction,
    pub checked: bool,
    pub state: ItemState,
}

/// Everything the table needs to render one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowView {
    pub id: String,
    pub order_id: String,
    pub date_time: String,
    pub comparable_amount: Decimal,
    pub currency: String,
    pub store_price: Option<Decimal>,
    pub store_currency: Option<String>,
    pub store_status: Option<String>,
    pub admin_url: Option<String>,
    pub checked: bool,
    pub row_class: RowClass,
    pub can_equalize: bool,
    pub busy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorklistView {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_items: u64,
    pub bulk_busy: bool,
    pub rows: Vec<RowView>,
}

/// Pending transactions of the current page, in display order.
///
/// Selection is reset from the default-selection rule on every [`Worklist::refresh`]
/// and can be overridden per row until the next refresh.
#[derive(Debug, Clone, Default)]
pub struct Worklist {
    rules: ReconcileRules,
    items: Vec<WorkItem>,
    bulk: BulkState,
    page: u32,
    total_pages: u64,
    total_items: u64,
}

impl Worklist {
    pub fn new(rules: ReconcileRules) -> Self {
        Self {
            rules,
            page: 1,
            ..Default::default()
        }
    }

    /// Replace the working set with a freshly loaded page.
    ///
    /// Transactions with a mutation still in flight stay busy.
    pub fn refresh(&mut self, page: ReconciledPage) {
        let busy: HashSet<String> = self
            .items
            .iter()
            .filter(|i| i.state == ItemState::Busy)
            .map(|i| i.transaction.id().to_string())
            .collect();

        self.page = page.page;
        self.total_pages = page.total_pages;
        self.total_items = page.total_items;
        self.items = page
            .transactions
            .into_iter()
            .map(|transaction| WorkItem {
                checked: self.rules.default_selected(&transaction),
                state: if busy.contains(transaction.id()) {
                    ItemState::Busy
                } else {
                    ItemState::Idle
                },
                transaction,
            })
            .collect();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&WorkItem> {
        self.items.iter().find(|i| i.transaction.id() == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut WorkItem, MutationError> {
        self.items
            .iter_mut()
            .find(|i| i.transaction.id() == id)
            .ok_or_else(|| MutationError::NotFound(id.to_string()))
    }

    pub fn set_checked(&mut self, id: &str, checked: bool) -> Result<(), MutationError> {
        self.get_mut(id)?.checked = checked;
        Ok(())
    }

    /// Checked transaction ids in display order.
    pub fn checked_ids(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|i| i.checked)
            .map(|i| i.transaction.id().to_string())
            .collect()
    }

    /// Mark a transaction busy and hand back a snapshot of it.
    pub fn begin(&mut self, id: &str) -> Result<EnrichedTransaction, MutationError> {
        let item = self.get_mut(id)?;
        if item.state == ItemState::Busy {
            return Err(MutationError::Busy(id.to_string()));
        }
        item.state = ItemState::Busy;
        Ok(item.transaction.clone())
    }

    /// Clear the busy flag; a no-op when the transaction is gone.
    pub fn finish(&mut self, id: &str) {
        if let Ok(item) = self.get_mut(id) {
            item.state = ItemState::Idle;
        }
    }

    /// Drop a transaction that is no longer pending.
    pub fn remove(&mut self, id: &str) -> Option<WorkItem> {
        let pos = self.items.iter().position(|i| i.transaction.id() == id)?;
        Some(self.items.remove(pos))
    }

    /// Apply server-confirmed amounts; a no-op when the transaction is gone.
    pub fn apply_amounts(&mut self, id: &str, updated: &AffiliateTransaction) {
        if let Ok(item) = self.get_mut(id) {
            item.transaction.transaction.apply_amounts(updated);
        }
    }

    /// Reflect a server-confirmed transaction: drop it once it is no longer pending,
    /// otherwise take over its amounts.
    pub fn sync_confirmed(&mut self, updated: &AffiliateTransaction) {
        if updated.status == TransactionStatus::Pending {
            self.apply_amounts(&updated.id, updated);
        } else {
            self.remove(&updated.id);
        }
    }

    pub fn bulk_state(&self) -> BulkState {
        self.bulk
    }

    pub fn begin_bulk(&mut self) -> Result<(), MutationError> {
        if self.bulk == BulkState::Running {
            return Err(MutationError::BulkInProgress);
        }
        self.bulk = BulkState::Running;
        Ok(())
    }

    pub fn finish_bulk(&mut self) {
        self.bulk = BulkState::Idle;
    }

    pub fn view(&self) -> WorklistView {
        WorklistView {
            current_page: self.page,
            total_pages: self.total_pages,
            total_items: self.total_items,
            bulk_busy: self.bulk == BulkState::Running,
            rows: self.items.iter().map(|i| self.row(i)).collect(),
        }
    }

    fn row(&self, item: &WorkItem) -> RowView {
        let tx = &item.transaction;
        let store = tx.store.as_ref();
        RowView {
            id: tx.id().to_string(),
            order_id: tx.transaction.order_id.clone(),
            date_time: tx.transaction.date_time.to_rfc3339(),
            comparable_amount: tx.comparable_amount(),
            currency: tx.display_currency(&self.rules.default_currency).to_string(),
            store_price: tx.store_price(),
            store_currency: store.map(|s| s.currency.clone()),
            store_status: store.and_then(|s| s.status.clone()),
            admin_url: store.map(|s| s.admin_url.clone()).filter(|u| !u.is_empty()),
            checked: item.checked,
            row_class: self.rules.classify(tx, item.checked),
            can_equalize: self.rules.can_equalize(tx),
            busy: item.state == ItemState::Busy,
        }
    }
}
