//! Error types for the dataset preparation pipeline

use thiserror::Error;

/// Errors produced by the feature and label pipelines.
///
/// Recoverable conditions (unparsable timestamps, out-of-vocabulary
/// categorical values, feature-name mismatches) are handled in place and
/// logged; only genuinely fatal conditions surface here.
#[derive(Debug, Error)]
pub enum Error {
    /// The input table lacks one or more required columns.
    #[error("input is missing required column(s): {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    /// A customer has no transaction with a parseable timestamp, so no
    /// recency can be computed for them.
    #[error("customer {customer_id} has no parseable transaction timestamps")]
    NoValidTimestamps { customer_id: String },

    /// The label table carries the same customer more than once, which
    /// would grow the row count of the merged dataset.
    #[error("duplicate customer {customer_id} in label table")]
    DuplicateLabel { customer_id: String },

    /// The input contains no transactions at all.
    #[error("input contains no transactions")]
    EmptyInput,

    /// Customer segmentation could not be performed.
    #[error("clustering failed: {0}")]
    Clustering(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
