//! Customer-level aggregation and feature table assembly

use log::{debug, info};
use ndarray::Array2;
use std::collections::HashMap;

use crate::data::{customer_order, Transaction};
use crate::error::Error;
use crate::transform::{reconcile_names, TransformFit, Vocabularies};

/// Aggregate columns appended after the transformed feature block.
pub const AGGREGATE_COLUMNS: [&str; 4] = ["total_amount", "avg_amount", "txn_count", "std_amount"];

/// Monetary summary statistics for one customer.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerStats {
    pub customer_id: String,
    pub total_amount: f64,
    pub avg_amount: f64,
    pub txn_count: usize,
    /// Sample standard deviation of the transaction amounts. `None` for a
    /// single-transaction customer, where no variance can be computed from
    /// one sample; reporting zero would be misleading.
    pub std_amount: Option<f64>,
}

/// Group transactions by customer and compute sum, mean, count, and sample
/// standard deviation of the amount field. Output order is the customers'
/// first appearance in the input.
pub fn aggregate_customers(transactions: &[Transaction]) -> Vec<CustomerStats> {
    let order = customer_order(transactions);
    let mut amounts: HashMap<&str, Vec<f64>> = HashMap::with_capacity(order.len());
    for transaction in transactions {
        amounts
            .entry(transaction.customer_id.as_str())
            .or_default()
            .push(transaction.amount);
    }

    order
        .into_iter()
        .map(|customer_id| {
            let values = &amounts[customer_id.as_str()];
            let count = values.len();
            let total: f64 = values.iter().sum();
            let avg = total / count as f64;
            let std_amount = if count < 2 {
                None
            } else {
                let sum_sq: f64 = values.iter().map(|v| (v - avg).powi(2)).sum();
                Some((sum_sq / (count - 1) as f64).sqrt())
            };
            CustomerStats {
                customer_id,
                total_amount: total,
                avg_amount: avg,
                txn_count: count,
                std_amount,
            }
        })
        .collect()
}

/// The per-customer feature table: one row per distinct customer, a named
/// column layout, and the customer identifier held alongside each row.
///
/// A missing standard-deviation aggregate appears as `NaN` in the matrix;
/// consumers must impute it explicitly.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub values: Array2<f64>,
    pub customer_ids: Vec<String>,
}

impl FeatureTable {
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.values.ncols()
    }
}

/// Fit and apply the column transform pipeline, reduce it to customer grain,
/// and attach the aggregated statistics.
///
/// The transform operates at transaction grain (its statistics are fit over
/// all transactions); each customer's feature vector is the mean of their
/// transformed transaction rows, so one-hot indicators become category
/// shares. Reconciliation with the aggregates is by customer key in the
/// canonical first-appearance ordering, never by position.
pub fn engineer_features(
    transactions: &[Transaction],
    vocabs: &Vocabularies,
) -> crate::Result<FeatureTable> {
    if transactions.is_empty() {
        return Err(Error::EmptyInput);
    }

    let fit = TransformFit::fit(transactions, vocabs);
    let transformed = fit.apply(transactions);
    let names = reconcile_names(fit.feature_names(), transformed.ncols());
    debug!(
        "transformed {} transactions into {} feature columns",
        transactions.len(),
        transformed.ncols()
    );

    let order = customer_order(transactions);
    let index: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(row, id)| (id.as_str(), row))
        .collect();

    // Per-customer mean of the transformed transaction rows.
    let mut sums = Array2::<f64>::zeros((order.len(), transformed.ncols()));
    let mut counts = vec![0usize; order.len()];
    for (row, transaction) in transactions.iter().enumerate() {
        let customer = index[transaction.customer_id.as_str()];
        let mut target = sums.row_mut(customer);
        target += &transformed.row(row);
        counts[customer] += 1;
    }

    let stats = aggregate_customers(transactions);
    let stats_by_id: HashMap<&str, &CustomerStats> = stats
        .iter()
        .map(|stat| (stat.customer_id.as_str(), stat))
        .collect();

    let width = transformed.ncols() + AGGREGATE_COLUMNS.len();
    let mut values = Array2::<f64>::zeros((order.len(), width));
    for (row, customer_id) in order.iter().enumerate() {
        for column in 0..transformed.ncols() {
            values[[row, column]] = sums[[row, column]] / counts[row] as f64;
        }
        let stat = stats_by_id[customer_id.as_str()];
        values[[row, transformed.ncols()]] = stat.total_amount;
        values[[row, transformed.ncols() + 1]] = stat.avg_amount;
        values[[row, transformed.ncols() + 2]] = stat.txn_count as f64;
        values[[row, transformed.ncols() + 3]] = stat.std_amount.unwrap_or(f64::NAN);
    }

    let mut columns = names;
    columns.extend(AGGREGATE_COLUMNS.iter().map(|name| name.to_string()));
    info!(
        "feature table assembled: {} customers x {} columns",
        order.len(),
        width
    );

    Ok(FeatureTable {
        columns,
        values,
        customer_ids: order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::NUMERIC_COLUMNS;

    fn transaction(customer_id: &str, amount: f64, timestamp: &str) -> Transaction {
        Transaction {
            customer_id: customer_id.to_string(),
            transaction_id: format!("TransactionId_{customer_id}_{amount}"),
            amount,
            value: amount,
            pricing_strategy: Some(2.0),
            fraud_result: Some(0.0),
            transaction_start_time: timestamp.to_string(),
            product_category: "airtime".to_string(),
            channel_id: "ChannelId_3".to_string(),
            provider_id: "ProviderId_6".to_string(),
        }
    }

    #[test]
    fn test_aggregate_multi_transaction_customer() {
        let transactions = vec![
            transaction("c1", 10.0, "2019-01-01T10:00:00Z"),
            transaction("c1", 20.0, "2019-01-02T10:00:00Z"),
        ];
        let stats = aggregate_customers(&transactions);

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].total_amount, 30.0);
        assert_eq!(stats[0].avg_amount, 15.0);
        assert_eq!(stats[0].txn_count, 2);
        // Sample std of [10, 20] is sqrt(50).
        let std = stats[0].std_amount.unwrap();
        assert!((std - 50.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_single_transaction_std_is_missing_not_zero() {
        let transactions = vec![transaction("c1", 10.0, "2019-01-01T10:00:00Z")];
        let stats = aggregate_customers(&transactions);
        assert_eq!(stats[0].std_amount, None);
    }

    #[test]
    fn test_one_row_per_customer() {
        let transactions = vec![
            transaction("c1", 10.0, "2019-01-01T10:00:00Z"),
            transaction("c2", 5.0, "2019-01-02T10:00:00Z"),
            transaction("c1", 20.0, "2019-01-03T10:00:00Z"),
        ];
        let table = engineer_features(&transactions, &Vocabularies::default()).unwrap();

        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.customer_ids, vec!["c1", "c2"]);
        assert_eq!(table.columns.len(), table.n_cols());
    }

    #[test]
    fn test_column_layout() {
        let transactions = vec![transaction("c1", 10.0, "2019-01-01T10:00:00Z")];
        let vocabs = Vocabularies::default();
        let table = engineer_features(&transactions, &vocabs).unwrap();

        let expected_width = NUMERIC_COLUMNS.len() + vocabs.width() + AGGREGATE_COLUMNS.len();
        assert_eq!(table.n_cols(), expected_width);
        assert_eq!(table.columns[0], "Amount");
        assert_eq!(
            table.columns[expected_width - 4..].to_vec(),
            vec!["total_amount", "avg_amount", "txn_count", "std_amount"]
        );
    }

    #[test]
    fn test_missing_std_is_nan_in_matrix() {
        let transactions = vec![
            transaction("solo", 10.0, "2019-01-01T10:00:00Z"),
            transaction("pair", 5.0, "2019-01-02T10:00:00Z"),
            transaction("pair", 15.0, "2019-01-03T10:00:00Z"),
        ];
        let table = engineer_features(&transactions, &Vocabularies::default()).unwrap();

        let std_column = table.n_cols() - 1;
        assert!(table.values[[0, std_column]].is_nan());
        assert!(table.values[[1, std_column]].is_finite());
    }

    #[test]
    fn test_aggregates_join_by_key_not_position() {
        let transactions = vec![
            transaction("c1", 10.0, "2019-01-01T10:00:00Z"),
            transaction("c2", 100.0, "2019-01-02T10:00:00Z"),
            transaction("c1", 30.0, "2019-01-03T10:00:00Z"),
        ];
        let table = engineer_features(&transactions, &Vocabularies::default()).unwrap();

        let total_column = table.n_cols() - 4;
        assert_eq!(table.values[[0, total_column]], 40.0); // c1
        assert_eq!(table.values[[1, total_column]], 100.0); // c2
        let count_column = table.n_cols() - 2;
        assert_eq!(table.values[[0, count_column]], 2.0);
        assert_eq!(table.values[[1, count_column]], 1.0);
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = engineer_features(&[], &Vocabularies::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
    }
}
