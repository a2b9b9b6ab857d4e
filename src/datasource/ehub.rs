//! eHub affiliate network API client (advertiser transactions, API v3).

use super::{get_json_with_retry, AffiliateSource, DataSourceError, TransactionPage};
use crate::domain::{AffiliateTransaction, TransactionUpdate};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

/// Fixed page size of the transaction listing.
pub const EHUB_PAGE_SIZE: u32 = 50;

/// Client for one advertiser account on eHub.
#[derive(Debug, Clone)]
pub struct EhubClient {
    client: Client,
    base_url: String,
    advertiser_id: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    transactions: Vec<AffiliateTransaction>,
    #[serde(default)]
    total_items: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl EhubClient {
    pub fn new(base_url: String, advertiser_id: String, api_key: String) -> Self {
        Self::with_client(Client::new(), base_url, advertiser_id, api_key)
    }

    pub fn with_client(
        client: Client,
        base_url: String,
        advertiser_id: String,
        api_key: String,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            advertiser_id,
            api_key,
        }
    }

    fn transactions_url(&self) -> String {
        format!(
            "{}/v3/advertisers/{}/transactions/",
            self.base_url, self.advertiser_id
        )
    }

    fn transaction_url(&self, transaction_id: &str) -> String {
        format!("{}{}/", self.transactions_url(), transaction_id)
    }
}

#[async_trait]
impl AffiliateSource for EhubClient {
    async fn fetch_pending(&self, page: u32) -> Result<TransactionPage, DataSourceError> {
        debug!("Fetching pending eHub transactions, page={}", page);

        let query = [
            ("apiKey", self.api_key.clone()),
            ("status", "pending".to_string()),
            ("page", page.to_string()),
        ];
        let body: ListResponse =
            get_json_with_retry(&self.client, &self.transactions_url(), &query, None).await?;

        Ok(TransactionPage {
            transactions: body.transactions,
            total_items: body.total_items,
            page_size: EHUB_PAGE_SIZE,
        })
    }

    async fn update_transaction(
        &self,
        transaction_id: &str,
        update: &TransactionUpdate,
    ) -> Result<Option<AffiliateTransaction>, DataSourceError> {
        debug!(
            "Updating eHub transaction id={}, status={:?}, order_amount={:?}",
            transaction_id, update.status, update.order_amount
        );

        let response = self
            .client
            .patch(self.transaction_url(transaction_id))
            .query(&[("apiKey", self.api_key.as_str())])
            .json(update)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| format!("Failed to update transaction {}", transaction_id));
            warn!(
                "eHub rejected update of transaction {}: {} {}",
                transaction_id,
                status.as_u16(),
                message
            );
            return Err(DataSourceError::HttpError {
                status: status.as_u16(),
                message,
            });
        }

        // The update is applied at this point; an unreadable body only loses the echo.
        let body = response.bytes().await.unwrap_or_default();
        let confirmed = parse_update_response(&body);
        if confirmed.is_none() {
            warn!(
                "eHub accepted update of transaction {} without a full transaction body",
                transaction_id
            );
        }
        Ok(confirmed)
    }
}

/// The PATCH response wraps the transaction in `{"transaction": ...}`; accept a bare
/// transaction as well. `None` for empty, partial or malformed bodies.
fn parse_update_response(body: &[u8]) -> Option<AffiliateTransaction> {
    let mut body: serde_json::Value = serde_json::from_slice(body).ok()?;
    let transaction = match body.get_mut("transaction").map(serde_json::Value::take) {
        Some(inner) => inner,
        None => body,
    };
    serde_json::from_value(transaction).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::test_server;
    use crate::domain::{Decimal, StatusChange, TransactionStatus};
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::{get, patch};
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn transaction_json() -> serde_json::Value {
        serde_json::json!({
            "id": "77",
            "dateTime": "2024-03-20T14:30:00Z",
            "orderAmount": 182.64,
            "originalOrderAmount": 182.64,
            "originalCurrency": "CZK",
            "commission": 18.26,
            "orderId": "2024001",
            "status": "approved",
            "canChangeStatus": false
        })
    }

    #[test]
    fn test_urls() {
        let client = EhubClient::new(
            "https://api.ehub.cz/".to_string(),
            "1006".to_string(),
            "secret".to_string(),
        );
        assert_eq!(
            client.transactions_url(),
            "https://api.ehub.cz/v3/advertisers/1006/transactions/"
        );
        assert_eq!(
            client.transaction_url("77"),
            "https://api.ehub.cz/v3/advertisers/1006/transactions/77/"
        );
    }

    #[test]
    fn test_parse_list_response() {
        let body: ListResponse = serde_json::from_value(serde_json::json!({
            "transactions": [transaction_json()],
            "totalItems": 121
        }))
        .unwrap();
        assert_eq!(body.transactions.len(), 1);
        assert_eq!(body.total_items, 121);
    }

    #[test]
    fn test_parse_wrapped_update_response() {
        let body = serde_json::json!({ "transaction": transaction_json() }).to_string();
        let tx = parse_update_response(body.as_bytes()).unwrap();
        assert_eq!(tx.id, "77");
        assert_eq!(tx.status, TransactionStatus::Approved);
        assert_eq!(tx.order_amount, "182.64".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_parse_bare_update_response() {
        let tx = parse_update_response(transaction_json().to_string().as_bytes()).unwrap();
        assert_eq!(tx.order_id, "2024001");
    }

    #[test]
    fn test_parse_update_response_tolerates_partial_bodies() {
        let partial = serde_json::json!({"transaction": {"id": "a", "status": "approved"}});
        assert!(parse_update_response(partial.to_string().as_bytes()).is_none());
        assert!(parse_update_response(b"").is_none());
        assert!(parse_update_response(b"not json").is_none());
    }

    fn client_for(base_url: String) -> EhubClient {
        EhubClient::new(base_url, "1006".to_string(), "secret".to_string())
    }

    const ITEM_PATH: &str = "/v3/advertisers/1006/transactions/a/";

    #[tokio::test]
    async fn test_update_with_partial_body_is_a_success() {
        let router = Router::new().route(
            ITEM_PATH,
            patch(|| async {
                Json(serde_json::json!({"transaction": {"id": "a", "status": "approved"}}))
            }),
        );
        let client = client_for(test_server::serve(router).await);

        let result = client
            .update_transaction("a", &TransactionUpdate::status(StatusChange::Approved))
            .await;
        assert_eq!(result, Ok(None));
    }

    #[tokio::test]
    async fn test_update_with_full_body_returns_transaction() {
        let router = Router::new().route(
            ITEM_PATH,
            patch(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body, serde_json::json!({"status": "approved"}));
                Json(serde_json::json!({ "transaction": transaction_json() }))
            }),
        );
        let client = client_for(test_server::serve(router).await);

        let tx = client
            .update_transaction("a", &TransactionUpdate::status(StatusChange::Approved))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.id, "77");
    }

    #[tokio::test]
    async fn test_update_error_surfaces_upstream_message_and_status() {
        let router = Router::new().route(
            ITEM_PATH,
            patch(|| async {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(serde_json::json!({"message": "Amount must be positive"})),
                )
            }),
        );
        let client = client_for(test_server::serve(router).await);

        let err = client
            .update_transaction("a", &TransactionUpdate::amount(Decimal::from(-1), None))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DataSourceError::HttpError {
                status: 422,
                message: "Amount must be positive".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_update_error_without_message_falls_back_and_is_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            ITEM_PATH,
            patch(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                StatusCode::INTERNAL_SERVER_ERROR
            }),
        );
        let client = client_for(test_server::serve(router).await);

        let err = client
            .update_transaction("a", &TransactionUpdate::status(StatusChange::Declined))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DataSourceError::HttpError {
                status: 500,
                message: "Failed to update transaction a".to_string(),
            }
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_pending_retries_server_errors() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/v3/advertisers/1006/transactions/",
            get(
                move |Query(query): Query<HashMap<String, String>>| async move {
                    assert_eq!(query.get("apiKey").map(String::as_str), Some("secret"));
                    assert_eq!(query.get("status").map(String::as_str), Some("pending"));
                    assert_eq!(query.get("page").map(String::as_str), Some("2"));
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        return StatusCode::SERVICE_UNAVAILABLE.into_response();
                    }
                    Json(serde_json::json!({
                        "transactions": [transaction_json()],
                        "totalItems": 51
                    }))
                    .into_response()
                },
            ),
        );
        let client = client_for(test_server::serve(router).await);

        let page = client.fetch_pending(2).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(page.transactions.len(), 1);
        assert_eq!(page.total_items, 51);
        assert_eq!(page.page_size, EHUB_PAGE_SIZE);
    }
}
