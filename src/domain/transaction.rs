//! Affiliate network (eHub) transaction.

use crate::domain::Decimal;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Approval status of an affiliate transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Declined,
    /// Any status this service does not act on.
    #[serde(other)]
    Other,
}

/// Terminal status an operator can move a pending transaction to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusChange {
    Approved,
    Declined,
}

impl From<StatusChange> for TransactionStatus {
    fn from(change: StatusChange) -> Self {
        match change {
            StatusChange::Approved => TransactionStatus::Approved,
            StatusChange::Declined => TransactionStatus::Declined,
        }
    }
}

impl std::fmt::Display for StatusChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusChange::Approved => write!(f, "approved"),
            StatusChange::Declined => write!(f, "declined"),
        }
    }
}

/// One commission-bearing order tracked by the affiliate network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateTransaction {
    pub id: String,
    /// Store order number this transaction refers to.
    pub order_id: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub date_time: DateTime<Utc>,
    /// Amount in the network's default currency.
    pub order_amount: Decimal,
    /// Amount in the currency the order was placed in.
    pub original_order_amount: Decimal,
    pub original_currency: String,
    #[serde(default)]
    pub commission: Decimal,
    pub status: TransactionStatus,
    #[serde(default)]
    pub can_change_status: bool,
}

impl AffiliateTransaction {
    /// Copy the amount fields of a server-confirmed update into this transaction.
    pub fn apply_amounts(&mut self, updated: &AffiliateTransaction) {
        self.order_amount = updated.order_amount;
        self.original_order_amount = updated.original_order_amount;
        self.original_currency = updated.original_currency.clone();
        self.commission = updated.commission;
    }
}

/// Accept RFC 3339 timestamps, or naive `YYYY-MM-DDTHH:MM:SS` read as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp {:?}: {}", raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "id": "tx-1",
            "uuid": "3d0e",
            "dateTime": "2024-03-20T14:30:00+01:00",
            "orderAmount": 150,
            "originalOrderAmount": 6.1,
            "originalCurrency": "EUR",
            "commission": 12.5,
            "type": "sale",
            "orderId": "2024001",
            "status": "pending",
            "canChangeStatus": true
        })
    }

    #[test]
    fn test_deserialize_ehub_transaction() {
        let tx: AffiliateTransaction = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(tx.id, "tx-1");
        assert_eq!(tx.order_id, "2024001");
        assert_eq!(tx.date_time, Utc.with_ymd_and_hms(2024, 3, 20, 13, 30, 0).unwrap());
        assert_eq!(tx.order_amount, Decimal::from(150));
        assert_eq!(tx.original_order_amount, "6.1".parse().unwrap());
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert!(tx.can_change_status);
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let mut json = sample_json();
        json["status"] = serde_json::json!("disputed");
        let tx: AffiliateTransaction = serde_json::from_value(json).unwrap();
        assert_eq!(tx.status, TransactionStatus::Other);
    }

    #[test]
    fn test_parse_naive_timestamp_as_utc() {
        let dt = parse_timestamp("2024-03-20T14:30:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 3, 20, 14, 30, 0).unwrap());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_apply_amounts_keeps_identity() {
        let mut tx: AffiliateTransaction = serde_json::from_value(sample_json()).unwrap();
        let mut updated = tx.clone();
        updated.id = "other".to_string();
        updated.order_amount = Decimal::from(140);
        updated.original_order_amount = Decimal::from(140);
        updated.original_currency = "CZK".to_string();

        tx.apply_amounts(&updated);
        assert_eq!(tx.id, "tx-1");
        assert_eq!(tx.order_amount, Decimal::from(140));
        assert_eq!(tx.original_currency, "CZK");
    }

    #[test]
    fn test_status_change_serialization() {
        assert_eq!(
            serde_json::to_string(&StatusChange::Approved).unwrap(),
            "\"approved\""
        );
        assert_eq!(StatusChange::Declined.to_string(), "declined");
    }
}
