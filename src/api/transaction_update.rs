//! Raw mutation proxy to the affiliate network.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use super::AppState;
use crate::domain::{AffiliateTransaction, Decimal, StatusChange, TransactionUpdate};
use crate::error::AppError;
use crate::orchestration::MutationError;

#[derive(Debug, Deserialize)]
pub struct TransactionRef {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub transaction_id: Option<String>,
    /// Older clients send the whole transaction instead of its id.
    pub transaction: Option<TransactionRef>,
    pub new_status: Option<StatusChange>,
    pub order_amount: Option<Decimal>,
    pub currency: Option<String>,
}

impl UpdateRequest {
    fn target_id(&self) -> Option<&str> {
        self.transaction_id
            .as_deref()
            .or(self.transaction.as_ref().map(|t| t.id.as_str()))
            .filter(|id| !id.trim().is_empty())
    }

    fn to_update(&self) -> TransactionUpdate {
        TransactionUpdate {
            status: self.new_status,
            order_amount: self.order_amount,
            currency: self.currency.clone(),
        }
        .normalized()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct UpdateResponse {
    /// `null` when the network sent no transaction back and it is not in the working set.
    pub transaction: Option<AffiliateTransaction>,
}

pub async fn patch_transaction(
    State(state): State<AppState>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<UpdateResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let update = req.to_update();
    if update.is_empty() {
        return Err(MutationError::NothingToChange.into());
    }
    let id = req
        .target_id()
        .ok_or_else(|| AppError::BadRequest("transaction id is required".to_string()))?
        .to_string();

    let local = state
        .worklist
        .lock()
        .await
        .get(&id)
        .map(|item| item.transaction.transaction.clone());

    let task_state = state.clone();
    let task_id = id.clone();
    let updated = tokio::spawn(async move {
        task_state.mutator.apply(&task_id, update, local).await
    })
    .await??;

    if let Some(updated) = &updated {
        state.worklist.lock().await.sync_confirmed(updated);
    }
    info!("Transaction {} updated via proxy", id);
    Ok(Json(UpdateResponse {
        transaction: updated,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> UpdateRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_empty_request_has_nothing_to_change() {
        let req = parse(serde_json::json!({"transactionId": "t1"}));
        assert!(req.to_update().is_empty());

        // A currency alone does not make an update.
        let req = parse(serde_json::json!({"transactionId": "t1", "currency": "EUR"}));
        assert!(req.to_update().is_empty());
    }

    #[test]
    fn test_target_id_prefers_transaction_id() {
        let req = parse(serde_json::json!({
            "transactionId": "t1",
            "transaction": {"id": "t2"},
            "newStatus": "approved"
        }));
        assert_eq!(req.target_id(), Some("t1"));

        let req = parse(serde_json::json!({"transaction": {"id": "t2"}}));
        assert_eq!(req.target_id(), Some("t2"));

        let req = parse(serde_json::json!({"transactionId": " "}));
        assert_eq!(req.target_id(), None);
    }

    #[test]
    fn test_amount_and_currency_are_forwarded() {
        let req = parse(serde_json::json!({
            "transactionId": "t1",
            "orderAmount": 182.64,
            "currency": "EUR"
        }));
        let update = req.to_update();
        assert_eq!(update.order_amount, Some("182.64".parse().unwrap()));
        assert_eq!(update.currency.as_deref(), Some("EUR"));
        assert_eq!(update.status, None);
    }
}
