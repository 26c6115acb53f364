//! Recency/Frequency/Monetary computation per customer

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

use crate::data::{customer_order, parse_timestamp, Transaction};
use crate::error::Error;

/// Behavioral summary for one customer relative to a snapshot date.
#[derive(Debug, Clone, PartialEq)]
pub struct RfmRecord {
    pub customer_id: String,
    /// Whole calendar days between the snapshot date and the date of the
    /// most recent valid transaction.
    pub recency: i64,
    pub frequency: u64,
    pub monetary: f64,
}

#[derive(Default)]
struct Accumulator {
    last: Option<DateTime<Utc>>,
    count: u64,
    amount: f64,
}

/// Compute RFM metrics for every customer in the batch.
///
/// Timestamps are normalized to UTC and recency is a calendar-date
/// difference, so time-of-day cannot shift the result across a day
/// boundary. A customer whose every timestamp is unparsable is a fatal
/// data-quality error; silently reporting zero recency would mislabel them
/// as maximally recent.
pub fn calculate_rfm(
    transactions: &[Transaction],
    snapshot_date: NaiveDate,
) -> crate::Result<Vec<RfmRecord>> {
    if transactions.is_empty() {
        return Err(Error::EmptyInput);
    }

    let order = customer_order(transactions);
    let mut accumulators: HashMap<&str, Accumulator> = HashMap::with_capacity(order.len());
    for transaction in transactions {
        let entry = accumulators
            .entry(transaction.customer_id.as_str())
            .or_default();
        entry.count += 1;
        entry.amount += transaction.amount;
        if let Some(ts) = parse_timestamp(&transaction.transaction_start_time) {
            if entry.last.is_none_or(|previous| ts > previous) {
                entry.last = Some(ts);
            }
        }
    }

    order
        .into_iter()
        .map(|customer_id| {
            let acc = &accumulators[customer_id.as_str()];
            let last = acc.last.ok_or_else(|| Error::NoValidTimestamps {
                customer_id: customer_id.clone(),
            })?;
            let recency = snapshot_date
                .signed_duration_since(last.date_naive())
                .num_days();
            Ok(RfmRecord {
                customer_id,
                recency,
                frequency: acc.count,
                monetary: acc.amount,
            })
        })
        .collect()
}
