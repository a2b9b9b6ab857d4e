//! Approve, decline and equalize operations against the affiliate network.

use crate::datasource::AffiliateSource;
use crate::domain::{AffiliateTransaction, StatusChange, TransactionUpdate};
use crate::engine::EnrichedTransaction;
use crate::orchestration::worklist::Worklist;
use crate::orchestration::MutationError;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Result of a bulk status run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<BulkFailure>,
    /// Checked when the run started, gone by the time their turn came.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub id: String,
    pub error: String,
}

/// Applies mutations one transaction at a time.
///
/// The worklist lock is never held across an upstream call.
#[derive(Debug, Clone)]
pub struct Mutator {
    affiliate: Arc<dyn AffiliateSource>,
    default_currency: String,
}

impl Mutator {
    pub fn new(affiliate: Arc<dyn AffiliateSource>, default_currency: String) -> Self {
        Self {
            affiliate,
            default_currency,
        }
    }

    /// Send a validated update straight to the network, outside any worklist.
    ///
    /// Returns the transaction as confirmed by the network. Without a confirmation
    /// body, `local` with the update applied stands in for it.
    pub async fn apply(
        &self,
        transaction_id: &str,
        update: TransactionUpdate,
        local: Option<AffiliateTransaction>,
    ) -> Result<Option<AffiliateTransaction>, MutationError> {
        let update = update.normalized();
        if update.is_empty() {
            return Err(MutationError::NothingToChange);
        }
        let confirmed = self
            .affiliate
            .update_transaction(transaction_id, &update)
            .await?;
        Ok(confirmed.or_else(|| local.map(|tx| update.applied_to(&tx, &self.default_currency))))
    }

    /// Approve or decline one transaction. On success it leaves the working set.
    pub async fn set_status(
        &self,
        worklist: &Mutex<Worklist>,
        id: &str,
        status: StatusChange,
    ) -> Result<AffiliateTransaction, MutationError> {
        let snapshot = worklist.lock().await.begin(id)?;

        let update = TransactionUpdate::status(status);
        let result = self.affiliate.update_transaction(id, &update).await;

        let mut wl = worklist.lock().await;
        match result {
            Ok(confirmed) => {
                let updated = confirmed.unwrap_or_else(|| {
                    update.applied_to(&snapshot.transaction, &self.default_currency)
                });
                wl.remove(id);
                info!("Transaction {} {}", id, status);
                Ok(updated)
            }
            Err(e) => {
                wl.finish(id);
                warn!("Failed to set transaction {} to {}: {}", id, status, e);
                Err(e.into())
            }
        }
    }

    /// The amount correction that would align a transaction with its store price.
    pub fn equalization_update(
        &self,
        tx: &EnrichedTransaction,
    ) -> Result<TransactionUpdate, MutationError> {
        let store = tx
            .store
            .as_ref()
            .ok_or_else(|| MutationError::MissingStorePrice(tx.id().to_string()))?;
        let currency = (store.currency != self.default_currency).then(|| store.currency.clone());
        Ok(TransactionUpdate::amount(store.price.round_cents(), currency))
    }

    /// Overwrite the transaction amount with the store price. The transaction stays pending.
    pub async fn equalize_price(
        &self,
        worklist: &Mutex<Worklist>,
        id: &str,
    ) -> Result<AffiliateTransaction, MutationError> {
        let (update, snapshot) = {
            let mut wl = worklist.lock().await;
            let item = wl
                .get(id)
                .ok_or_else(|| MutationError::NotFound(id.to_string()))?;
            let update = self.equalization_update(&item.transaction)?;
            (update, wl.begin(id)?)
        };

        let result = self.affiliate.update_transaction(id, &update).await;

        let mut wl = worklist.lock().await;
        match result {
            Ok(confirmed) => {
                let updated = confirmed.unwrap_or_else(|| {
                    update.applied_to(&snapshot.transaction, &self.default_currency)
                });
                wl.apply_amounts(id, &updated);
                wl.finish(id);
                info!(
                    "Transaction {} amount set to {:?} {:?}",
                    id, update.order_amount, update.currency
                );
                Ok(updated)
            }
            Err(e) => {
                wl.finish(id);
                warn!("Failed to equalize transaction {}: {}", id, e);
                Err(e.into())
            }
        }
    }

    /// Apply `status` to every checked transaction, strictly one after another.
    ///
    /// A failed item is recorded and the run moves on to the next one.
    pub async fn bulk_set_status(
        &self,
        worklist: &Mutex<Worklist>,
        status: StatusChange,
    ) -> Result<BulkOutcome, MutationError> {
        let ids = {
            let mut wl = worklist.lock().await;
            wl.begin_bulk()?;
            wl.checked_ids()
        };
        info!("Bulk {} of {} transactions", status, ids.len());

        let mut outcome = BulkOutcome::default();
        for id in ids {
            match self.set_status(worklist, &id, status).await {
                Ok(_) => outcome.succeeded.push(id),
                Err(MutationError::NotFound(_)) => outcome.skipped.push(id),
                Err(e) => outcome.failed.push(BulkFailure {
                    id,
                    error: e.to_string(),
                }),
            }
        }

        worklist.lock().await.finish_bulk();
        info!(
            "Bulk {} finished: {} succeeded, {} failed, {} skipped",
            status,
            outcome.succeeded.len(),
            outcome.failed.len(),
            outcome.skipped.len()
        );
        Ok(outcome)
    }
}
