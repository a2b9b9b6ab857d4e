//! Upstream data sources: the affiliate network and the store.

use crate::domain::{AffiliateTransaction, StoreOrder, TransactionUpdate};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;

pub mod ehub;
pub mod mock;
pub mod upgates;

pub use ehub::EhubClient;
pub use mock::{MockAffiliateSource, MockStoreSource};
pub use upgates::UpgatesClient;

/// One page of pending transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionPage {
    pub transactions: Vec<AffiliateTransaction>,
    /// Total number of pending transactions across all pages.
    pub total_items: u64,
    /// Number of transactions per page the upstream paginates with.
    pub page_size: u32,
}

/// Affiliate network API: pending transaction listing and per-transaction mutation.
#[async_trait]
pub trait AffiliateSource: Send + Sync + fmt::Debug {
    /// Fetch one page (1-based) of pending transactions.
    async fn fetch_pending(&self, page: u32) -> Result<TransactionPage, DataSourceError>;

    /// Apply a status change and/or amount correction to one transaction.
    ///
    /// Any success response means the update was applied. Returns the transaction as
    /// confirmed by the network, or `None` when the response did not carry one.
    async fn update_transaction(
        &self,
        transaction_id: &str,
        update: &TransactionUpdate,
    ) -> Result<Option<AffiliateTransaction>, DataSourceError>;
}

/// Store API: orders created within a time window.
#[async_trait]
pub trait StoreSource: Send + Sync + fmt::Debug {
    /// Fetch every order created between `created_from` and `created_to`,
    /// following pagination to the last page.
    async fn fetch_orders(
        &self,
        created_from: DateTime<Utc>,
        created_to: DateTime<Utc>,
    ) -> Result<Vec<StoreOrder>, DataSourceError>;
}

/// Error type for upstream operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// Non-success HTTP response, with the upstream's message when it sent one
    HttpError { status: u16, message: String },
    /// Invalid JSON or malformed response
    ParseError(String),
    RateLimited,
}

impl DataSourceError {
    /// HTTP status to report to our own callers.
    pub fn status_code(&self) -> u16 {
        match self {
            DataSourceError::HttpError { status, .. } => *status,
            DataSourceError::RateLimited => 429,
            _ => 502,
        }
    }
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
        }
    }
}

impl std::error::Error for DataSourceError {}

impl From<reqwest::Error> for DataSourceError {
    fn from(err: reqwest::Error) -> Self {
        // Query strings carry API keys; keep them out of messages and logs.
        DataSourceError::NetworkError(err.without_url().to_string())
    }
}

/// GET a JSON document, retrying network errors, 429 and 5xx with exponential backoff.
///
/// Only for idempotent reads; mutations go out exactly once.
pub(crate) async fn get_json_with_retry<T: DeserializeOwned + Send>(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    basic_auth: Option<(&str, &str)>,
) -> Result<T, DataSourceError> {
    let backoff = ExponentialBackoff {
        max_elapsed_time: Some(Duration::from_secs(30)),
        ..Default::default()
    };

    retry(backoff, || async {
        let mut request = client.get(url).query(query);
        if let Some((user, password)) = basic_auth {
            request = request.basic_auth(user, Some(password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| backoff::Error::transient(DataSourceError::from(e)))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(backoff::Error::transient(DataSourceError::RateLimited));
        }
        if status.is_server_error() {
            return Err(backoff::Error::transient(DataSourceError::HttpError {
                status: status.as_u16(),
                message: "Server error".to_string(),
            }));
        }
        if !status.is_success() {
            return Err(backoff::Error::permanent(DataSourceError::HttpError {
                status: status.as_u16(),
                message: "Client error".to_string(),
            }));
        }

        response.json::<T>().await.map_err(|e| {
            backoff::Error::permanent(DataSourceError::ParseError(e.without_url().to_string()))
        })
    })
    .await
}
