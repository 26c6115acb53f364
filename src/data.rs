//! Transaction ingestion, schema validation, and temporal decomposition

use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::Deserialize;
use std::collections::HashSet;

use crate::error::Error;

/// Columns the raw transaction table must carry. Any additional columns
/// (batch, account, subscription identifiers and so on) are ignored.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "CustomerId",
    "TransactionId",
    "Amount",
    "Value",
    "PricingStrategy",
    "FraudResult",
    "TransactionStartTime",
    "ProductCategory",
    "ChannelId",
    "ProviderId",
];

/// A single raw transaction event. Immutable once ingested.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    #[serde(rename = "CustomerId")]
    pub customer_id: String,
    #[serde(rename = "TransactionId")]
    pub transaction_id: String,
    #[serde(rename = "Amount")]
    pub amount: f64,
    #[serde(rename = "Value")]
    pub value: f64,
    #[serde(rename = "PricingStrategy")]
    pub pricing_strategy: Option<f64>,
    #[serde(rename = "FraudResult")]
    pub fraud_result: Option<f64>,
    /// Raw timestamp string; parsed lazily so one bad value cannot fail
    /// the whole batch.
    #[serde(rename = "TransactionStartTime")]
    pub transaction_start_time: String,
    #[serde(rename = "ProductCategory")]
    pub product_category: String,
    #[serde(rename = "ChannelId")]
    pub channel_id: String,
    #[serde(rename = "ProviderId")]
    pub provider_id: String,
}

/// Calendar components extracted from a transaction timestamp.
///
/// All four fields are `None` when the timestamp could not be parsed so
/// that downstream imputation can handle the gap.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeParts {
    pub hour: Option<f64>,
    pub day: Option<f64>,
    pub month: Option<f64>,
    pub year: Option<f64>,
}

/// Parse a timestamp, trying RFC 3339 first and then common naive formats.
/// Returns `None` rather than an error for unparsable values.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// Decompose a raw timestamp into hour (0-23), day-of-month (1-31),
/// month (1-12), and year components.
pub fn decompose_timestamp(raw: &str) -> TimeParts {
    match parse_timestamp(raw) {
        Some(ts) => TimeParts {
            hour: Some(ts.hour() as f64),
            day: Some(ts.day() as f64),
            month: Some(ts.month() as f64),
            year: Some(ts.year() as f64),
        },
        None => TimeParts::default(),
    }
}

/// Check the CSV header against [`REQUIRED_COLUMNS`], reporting every
/// missing column in a single error.
pub fn validate_schema(headers: &csv::StringRecord) -> crate::Result<()> {
    let present: HashSet<&str> = headers.iter().collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !present.contains(**column))
        .map(|column| column.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Schema { missing })
    }
}

/// Load and validate a raw transaction CSV file.
pub fn load_transactions(path: &str) -> crate::Result<Vec<Transaction>> {
    let mut reader = csv::Reader::from_path(path)?;
    validate_schema(reader.headers()?)?;

    let mut transactions = Vec::new();
    for record in reader.deserialize() {
        transactions.push(record?);
    }
    if transactions.is_empty() {
        return Err(Error::EmptyInput);
    }
    Ok(transactions)
}

/// Distinct customer identifiers in first-appearance order.
///
/// Every derived table uses this single canonical ordering, so rows stay
/// aligned by key across the feature and label paths.
pub fn customer_order(transactions: &[Transaction]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    for transaction in transactions {
        if seen.insert(transaction.customer_id.as_str()) {
            order.push(transaction.customer_id.clone());
        }
    }
    order
}
