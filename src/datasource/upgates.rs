//! Upgates store API client (orders listing, API v2).

use super::{get_json_with_retry, DataSourceError, StoreSource};
use crate::domain::StoreOrder;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Timestamp format accepted by the `creation_time_*` filters.
const CREATION_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone)]
pub struct UpgatesClient {
    client: Client,
    base_url: String,
    username: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct OrdersPage {
    #[serde(default)]
    current_page: u32,
    #[serde(default)]
    number_of_pages: u32,
    #[serde(default)]
    orders: Vec<StoreOrder>,
}

impl UpgatesClient {
    pub fn new(base_url: String, username: String, api_key: String) -> Self {
        Self::with_client(Client::new(), base_url, username, api_key)
    }

    pub fn with_client(client: Client, base_url: String, username: String, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            api_key,
        }
    }

    fn orders_url(&self) -> String {
        format!("{}/api/v2/orders/", self.base_url)
    }
}

pub fn format_creation_time(at: DateTime<Utc>) -> String {
    at.format(CREATION_TIME_FORMAT).to_string()
}

#[async_trait]
impl StoreSource for UpgatesClient {
    async fn fetch_orders(
        &self,
        created_from: DateTime<Utc>,
        created_to: DateTime<Utc>,
    ) -> Result<Vec<StoreOrder>, DataSourceError> {
        let from = format_creation_time(created_from);
        let to = format_creation_time(created_to);
        let url = self.orders_url();

        let mut orders = Vec::new();
        let mut page: u32 = 1;
        loop {
            debug!(
                "Fetching Upgates orders created_from={}, created_to={}, page={}",
                from, to, page
            );

            let query = [
                ("creation_time_from", from.clone()),
                ("creation_time_to", to.clone()),
                ("page", page.to_string()),
            ];
            let body: OrdersPage = get_json_with_retry(
                &self.client,
                &url,
                &query,
                Some((self.username.as_str(), self.api_key.as_str())),
            )
            .await?;

            orders.extend(body.orders);
            if is_last_page(body.current_page.max(page), body.number_of_pages) {
                break;
            }
            page += 1;
        }

        Ok(orders)
    }
}

fn is_last_page(current_page: u32, number_of_pages: u32) -> bool {
    current_page >= number_of_pages
}
