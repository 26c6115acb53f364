//! RiskForge: per-customer credit-risk modeling dataset preparation
//!
//! This library turns raw transaction records into a modeling dataset for a
//! credit-risk classifier when no ground-truth label exists. It builds a
//! per-customer feature table (temporal decomposition, categorical encoding,
//! numeric scaling, customer-level aggregation) and derives a proxy binary
//! `is_high_risk` label by clustering Recency/Frequency/Monetary metrics and
//! deterministically selecting the least-engaged group.

pub mod cli;
pub mod data;
pub mod error;
pub mod features;
pub mod rfm;
pub mod segment;
pub mod target;
pub mod transform;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{load_transactions, Transaction};
pub use error::Error;
pub use features::{aggregate_customers, engineer_features, CustomerStats, FeatureTable};
pub use rfm::{calculate_rfm, RfmRecord};
pub use segment::{segment_customers, LabelRecord, SegmentParams};
pub use target::{attach_target, ModelingTable};
pub use transform::{TransformFit, Vocabularies};

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;
