//! Column transform pipeline: imputation, standardization, and fixed-vocabulary
//! one-hot encoding with an explicit fit/apply split
//!
//! Fitting produces an immutable [`TransformFit`] value (per-column means,
//! standard deviations, modes, and the declared vocabularies). Applying that
//! state to a batch yields a fixed-width numeric matrix whose column layout
//! depends only on the vocabularies, never on the data being transformed.

use log::warn;
use ndarray::Array2;
use std::collections::BTreeMap;

use crate::data::{decompose_timestamp, TimeParts, Transaction};

/// Numeric column group, in output order.
pub const NUMERIC_COLUMNS: [&str; 8] = [
    "Amount",
    "Value",
    "PricingStrategy",
    "FraudResult",
    "txn_hour",
    "txn_day",
    "txn_month",
    "txn_year",
];

/// Categorical column group, in output order.
pub const CATEGORICAL_COLUMNS: [&str; 3] = ["ProductCategory", "ChannelId", "ProviderId"];

/// Closed categorical vocabularies, declared once at configuration time.
///
/// Encoders never invent categories: a value outside its column's vocabulary
/// maps to an all-zero indicator block. Declaring the sets up front keeps the
/// output matrix width stable across runs regardless of which values a given
/// batch happens to contain.
#[derive(Debug, Clone)]
pub struct Vocabularies {
    pub product_categories: Vec<String>,
    pub channel_ids: Vec<String>,
    pub provider_ids: Vec<String>,
}

impl Default for Vocabularies {
    fn default() -> Self {
        let to_strings = |values: &[&str]| values.iter().map(|v| v.to_string()).collect();
        Self {
            product_categories: to_strings(&[
                "airtime",
                "data_bundles",
                "financial_services",
                "movies",
                "other",
                "ticket",
                "transport",
                "tv",
                "utility_bill",
            ]),
            channel_ids: to_strings(&["ChannelId_1", "ChannelId_2", "ChannelId_3", "ChannelId_5"]),
            provider_ids: to_strings(&[
                "ProviderId_1",
                "ProviderId_2",
                "ProviderId_3",
                "ProviderId_4",
                "ProviderId_5",
                "ProviderId_6",
            ]),
        }
    }
}

impl Vocabularies {
    fn groups(&self) -> [&[String]; 3] {
        [
            &self.product_categories,
            &self.channel_ids,
            &self.provider_ids,
        ]
    }

    /// Total indicator width contributed by all vocabularies.
    pub fn width(&self) -> usize {
        self.product_categories.len() + self.channel_ids.len() + self.provider_ids.len()
    }
}

#[derive(Debug, Clone)]
struct NumericFit {
    mean: f64,
    std: f64,
}

impl NumericFit {
    fn from_values(name: &str, values: &[f64]) -> Self {
        if values.is_empty() {
            warn!("numeric column {name} has no observed values; imputing with 0");
            return Self { mean: 0.0, std: 1.0 };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        // A constant column scales with divisor 1 so it maps to all zeros.
        let std = if std > 0.0 && std.is_finite() { std } else { 1.0 };
        Self { mean, std }
    }
}

#[derive(Debug, Clone)]
struct CategoricalFit {
    mode: String,
    vocab: Vec<String>,
}

/// Immutable fitted state of the column transform pipeline.
///
/// Fit once per run; every subsequent [`TransformFit::apply`] reuses the same
/// statistics. Each run owns its own instance, so concurrent independent runs
/// need no synchronization.
#[derive(Debug, Clone)]
pub struct TransformFit {
    numeric: Vec<NumericFit>,
    categorical: Vec<CategoricalFit>,
}

impl TransformFit {
    /// Compute per-column means, standard deviations, and modes from the
    /// fitting batch. Missing values are excluded from the statistics.
    pub fn fit(transactions: &[Transaction], vocabs: &Vocabularies) -> Self {
        let parts: Vec<TimeParts> = transactions
            .iter()
            .map(|t| decompose_timestamp(&t.transaction_start_time))
            .collect();

        let numeric = (0..NUMERIC_COLUMNS.len())
            .map(|column| {
                let values: Vec<f64> = transactions
                    .iter()
                    .zip(&parts)
                    .filter_map(|(t, p)| numeric_value(t, p, column))
                    .collect();
                NumericFit::from_values(NUMERIC_COLUMNS[column], &values)
            })
            .collect();

        let categorical = vocabs
            .groups()
            .iter()
            .enumerate()
            .map(|(column, vocab)| {
                let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                for transaction in transactions {
                    let value = categorical_value(transaction, column);
                    if !value.is_empty() {
                        *counts.entry(value).or_insert(0) += 1;
                    }
                }
                // Iterating the BTreeMap in key order and keeping only a
                // strictly greater count makes ties resolve to the
                // lexicographically smallest mode.
                let mut mode = String::new();
                let mut best = 0;
                for (value, count) in &counts {
                    if *count > best {
                        best = *count;
                        mode = value.to_string();
                    }
                }
                if mode.is_empty() {
                    warn!(
                        "categorical column {} has no observed values; using first vocabulary entry as mode",
                        CATEGORICAL_COLUMNS[column]
                    );
                    mode = vocab.first().cloned().unwrap_or_default();
                }
                CategoricalFit {
                    mode,
                    vocab: vocab.to_vec(),
                }
            })
            .collect();

        Self {
            numeric,
            categorical,
        }
    }

    /// Total output width: numeric group plus all indicator columns.
    pub fn width(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|fit| fit.vocab.len())
                .sum::<usize>()
    }

    /// Transform a batch into an `n_rows x width()` matrix using the fitted
    /// statistics: missing numerics are mean-imputed then standardized,
    /// missing categoricals take the fitted mode, and every in-vocabulary
    /// value lights exactly one indicator column.
    pub fn apply(&self, transactions: &[Transaction]) -> Array2<f64> {
        let mut out = Array2::zeros((transactions.len(), self.width()));
        let mut drift: Vec<usize> = vec![0; self.categorical.len()];

        for (row, transaction) in transactions.iter().enumerate() {
            let parts = decompose_timestamp(&transaction.transaction_start_time);
            let mut offset = 0;
            for (column, fit) in self.numeric.iter().enumerate() {
                let raw = numeric_value(transaction, &parts, column).unwrap_or(fit.mean);
                out[[row, offset]] = (raw - fit.mean) / fit.std;
                offset += 1;
            }
            for (column, fit) in self.categorical.iter().enumerate() {
                let raw = categorical_value(transaction, column);
                let value = if raw.is_empty() { fit.mode.as_str() } else { raw };
                match fit.vocab.iter().position(|entry| entry == value) {
                    Some(index) => out[[row, offset + index]] = 1.0,
                    None => drift[column] += 1,
                }
                offset += fit.vocab.len();
            }
        }

        for (column, count) in drift.iter().enumerate() {
            if *count > 0 {
                warn!(
                    "{count} value(s) in {} outside the declared vocabulary; encoded as all-zero indicators",
                    CATEGORICAL_COLUMNS[column]
                );
            }
        }
        out
    }

    /// Human-readable column names derived from the fitted state, matching
    /// [`TransformFit::apply`] output order.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = NUMERIC_COLUMNS.iter().map(|n| n.to_string()).collect();
        for (column, fit) in self.categorical.iter().enumerate() {
            for value in &fit.vocab {
                names.push(format!("{}_{}", CATEGORICAL_COLUMNS[column], value));
            }
        }
        names
    }
}

/// Reconcile a name list against the actual matrix width. A disagreement
/// signals vocabulary/schema drift; it is recovered with deterministic
/// synthetic names and surfaced as a warning rather than a failure.
pub fn reconcile_names(names: Vec<String>, width: usize) -> Vec<String> {
    if names.len() == width {
        return names;
    }
    warn!(
        "feature name count {} does not match matrix width {width}; substituting synthetic names",
        names.len()
    );
    (0..width).map(|index| format!("f{index}")).collect()
}

fn numeric_value(transaction: &Transaction, parts: &TimeParts, column: usize) -> Option<f64> {
    match column {
        0 => Some(transaction.amount),
        1 => Some(transaction.value),
        2 => transaction.pricing_strategy,
        3 => transaction.fraud_result,
        4 => parts.hour,
        5 => parts.day,
        6 => parts.month,
        7 => parts.year,
        _ => unreachable!("numeric column index out of range"),
    }
}

fn categorical_value(transaction: &Transaction, column: usize) -> &str {
    match column {
        0 => &transaction.product_category,
        1 => &transaction.channel_id,
        2 => &transaction.provider_id,
        _ => unreachable!("categorical column index out of range"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction(
        customer_id: &str,
        amount: f64,
        timestamp: &str,
        category: &str,
        channel: &str,
        provider: &str,
    ) -> Transaction {
        Transaction {
            customer_id: customer_id.to_string(),
            transaction_id: format!("TransactionId_{customer_id}"),
            amount,
            value: amount,
            pricing_strategy: Some(2.0),
            fraud_result: Some(0.0),
            transaction_start_time: timestamp.to_string(),
            product_category: category.to_string(),
            channel_id: channel.to_string(),
            provider_id: provider.to_string(),
        }
    }

    fn sample_batch() -> Vec<Transaction> {
        vec![
            transaction(
                "c1",
                1000.0,
                "2018-11-15T02:18:49Z",
                "airtime",
                "ChannelId_3",
                "ProviderId_6",
            ),
            transaction(
                "c2",
                500.0,
                "2019-01-01T14:30:00Z",
                "utility_bill",
                "ChannelId_2",
                "ProviderId_5",
            ),
            transaction(
                "c3",
                250.0,
                "2019-01-10T09:00:00Z",
                "airtime",
                "ChannelId_1",
                "ProviderId_1",
            ),
        ]
    }

    #[test]
    fn test_output_width_is_schema_stable() {
        let vocabs = Vocabularies::default();
        let batch = sample_batch();
        let fit = TransformFit::fit(&batch, &vocabs);

        assert_eq!(fit.width(), NUMERIC_COLUMNS.len() + vocabs.width());
        assert_eq!(fit.apply(&batch).dim(), (3, fit.width()));
        // Width is independent of row count.
        assert_eq!(fit.apply(&batch[..1]).dim(), (1, fit.width()));
    }

    #[test]
    fn test_standardization_uses_fitted_statistics() {
        let vocabs = Vocabularies::default();
        let batch = sample_batch();
        let fit = TransformFit::fit(&batch, &vocabs);
        let matrix = fit.apply(&batch);

        // Amount column has zero mean over the fitting batch.
        let mean: f64 = (0..3).map(|row| matrix[[row, 0]]).sum::<f64>() / 3.0;
        assert!(mean.abs() < 1e-9);
        // Constant columns (FraudResult) scale to exactly zero, not NaN.
        for row in 0..3 {
            assert_eq!(matrix[[row, 3]], 0.0);
        }
    }

    #[test]
    fn test_missing_numeric_imputed_with_mean() {
        let vocabs = Vocabularies::default();
        let mut batch = sample_batch();
        batch[1].pricing_strategy = None;
        let fit = TransformFit::fit(&batch, &vocabs);
        let matrix = fit.apply(&batch);

        // Mean-imputed values standardize to exactly zero.
        assert_eq!(matrix[[1, 2]], 0.0);
    }

    #[test]
    fn test_unknown_category_encodes_as_all_zero_block() {
        let vocabs = Vocabularies::default();
        let mut batch = sample_batch();
        batch[0].product_category = "crypto".to_string();
        let fit = TransformFit::fit(&batch, &vocabs);
        let matrix = fit.apply(&batch);

        let start = NUMERIC_COLUMNS.len();
        let block: f64 = (start..start + vocabs.product_categories.len())
            .map(|column| matrix[[0, column]])
            .sum();
        assert_eq!(block, 0.0);
        // Known values still light exactly one indicator.
        let block_row2: f64 = (start..start + vocabs.product_categories.len())
            .map(|column| matrix[[2, column]])
            .sum();
        assert_eq!(block_row2, 1.0);
    }

    #[test]
    fn test_missing_categorical_takes_mode() {
        let vocabs = Vocabularies::default();
        let mut batch = sample_batch();
        batch[1].product_category = String::new();
        let fit = TransformFit::fit(&batch, &vocabs);
        let matrix = fit.apply(&batch);

        // Mode over the remaining values is "airtime", vocabulary index 0.
        assert_eq!(matrix[[1, NUMERIC_COLUMNS.len()]], 1.0);
    }

    #[test]
    fn test_unparsable_timestamp_imputes_temporal_columns() {
        let vocabs = Vocabularies::default();
        let mut batch = sample_batch();
        batch[2].transaction_start_time = "garbage".to_string();
        let fit = TransformFit::fit(&batch, &vocabs);
        let matrix = fit.apply(&batch);

        // Null temporal components fall back to the fitted means.
        for column in 4..8 {
            assert_eq!(matrix[[2, column]], 0.0);
            assert!(matrix[[2, column]].is_finite());
        }
    }

    #[test]
    fn test_feature_names_match_matrix_layout() {
        let vocabs = Vocabularies::default();
        let fit = TransformFit::fit(&sample_batch(), &vocabs);
        let names = fit.feature_names();

        assert_eq!(names.len(), fit.width());
        assert_eq!(names[0], "Amount");
        assert_eq!(names[8], "ProductCategory_airtime");
        assert_eq!(names[names.len() - 1], "ProviderId_ProviderId_6");
    }

    #[test]
    fn test_reconcile_names_falls_back_to_synthetic() {
        let names = vec!["a".to_string(), "b".to_string()];
        assert_eq!(reconcile_names(names.clone(), 2), names);

        let synthetic = reconcile_names(names, 3);
        assert_eq!(synthetic, vec!["f0", "f1", "f2"]);
    }
}
