//! Behavioral customer segmentation and high-risk group selection
//!
//! RFM metrics are standardized and partitioned with K-Means. The integer
//! tags K-Means assigns to clusters are arbitrary, so the "high risk" group
//! is never a fixed index: it is resolved by ranking the clusters on their
//! raw RFM means with a deterministic rule. Combined with the seeded RNG for
//! centroid placement, the label output is reproducible across runs.

use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use log::{debug, info};
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

use crate::error::Error;
use crate::rfm::RfmRecord;

/// Tuning knobs for the segmentation step.
#[derive(Debug, Clone)]
pub struct SegmentParams {
    /// Number of behavioral groups to partition customers into.
    pub clusters: usize,
    /// Seed for centroid placement; fixed for reproducible partitions.
    pub seed: u64,
    pub max_iters: u64,
    pub tolerance: f64,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            clusters: 3,
            seed: 42,
            max_iters: 300,
            tolerance: 1e-4,
        }
    }
}

/// Proxy risk label for one customer.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRecord {
    pub customer_id: String,
    /// 1 if the customer falls in the least-engaged cluster, else 0.
    pub is_high_risk: u8,
}

/// Partition customers into behavioral groups and label the least-engaged
/// group as high risk.
pub fn segment_customers(
    rfm: &[RfmRecord],
    params: &SegmentParams,
) -> crate::Result<Vec<LabelRecord>> {
    if rfm.is_empty() {
        return Err(Error::EmptyInput);
    }
    if rfm.len() < params.clusters {
        return Err(Error::Clustering(format!(
            "need at least {} customers for {} clusters, got {}",
            params.clusters,
            params.clusters,
            rfm.len()
        )));
    }

    let raw = Array2::from_shape_fn((rfm.len(), 3), |(row, column)| match column {
        0 => rfm[row].recency as f64,
        1 => rfm[row].frequency as f64,
        _ => rfm[row].monetary,
    });
    let scaled = standardize(&raw);

    let rng = Xoshiro256Plus::seed_from_u64(params.seed);
    let dataset = Dataset::new(scaled, Array1::<usize>::zeros(rfm.len()));
    let model = KMeans::params_with(params.clusters, rng, L2Dist)
        .max_n_iterations(params.max_iters)
        .tolerance(params.tolerance)
        .fit(&dataset)
        .map_err(|e| Error::Clustering(e.to_string()))?;
    let assignments = model.predict(&dataset);

    let mut sizes = vec![0usize; params.clusters];
    for &tag in assignments.iter() {
        sizes[tag] += 1;
    }
    debug!("cluster sizes: {sizes:?}");

    let high_risk = high_risk_cluster(rfm, &assignments, params.clusters);
    let labels: Vec<LabelRecord> = rfm
        .iter()
        .zip(assignments.iter())
        .map(|(record, &tag)| LabelRecord {
            customer_id: record.customer_id.clone(),
            is_high_risk: u8::from(tag == high_risk),
        })
        .collect();

    let flagged = labels.iter().filter(|label| label.is_high_risk == 1).count();
    info!(
        "{flagged}/{} customers labeled high risk ({:.1}%)",
        labels.len(),
        100.0 * flagged as f64 / labels.len() as f64
    );
    Ok(labels)
}

/// Standardize each column to zero mean and unit variance. A zero-variance
/// column scales with divisor 1 so it maps to all zeros instead of NaN.
fn standardize(raw: &Array2<f64>) -> Array2<f64> {
    let n = raw.nrows() as f64;
    let mut scaled = raw.clone();
    for mut column in scaled.columns_mut() {
        let mean = column.sum() / n;
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        let std = if std > 0.0 && std.is_finite() { std } else { 1.0 };
        column.mapv_inplace(|v| (v - mean) / std);
    }
    scaled
}

/// Resolve the opaque cluster tags to the high-risk group: rank clusters by
/// their raw RFM means (Frequency ascending, Monetary ascending, Recency
/// descending) and take the first. Low engagement, i.e. few, small, stale
/// transactions, stands in for high credit risk.
fn high_risk_cluster(rfm: &[RfmRecord], assignments: &Array1<usize>, clusters: usize) -> usize {
    let mut recency = vec![0.0; clusters];
    let mut frequency = vec![0.0; clusters];
    let mut monetary = vec![0.0; clusters];
    let mut members = vec![0usize; clusters];
    for (record, &tag) in rfm.iter().zip(assignments.iter()) {
        recency[tag] += record.recency as f64;
        frequency[tag] += record.frequency as f64;
        monetary[tag] += record.monetary;
        members[tag] += 1;
    }

    // (tag, mean frequency, mean monetary, mean recency); empty clusters
    // have no means and are excluded from the ranking.
    let mut ranked: Vec<(usize, f64, f64, f64)> = (0..clusters)
        .filter(|&tag| members[tag] > 0)
        .map(|tag| {
            let n = members[tag] as f64;
            (tag, frequency[tag] / n, monetary[tag] / n, recency[tag] / n)
        })
        .collect();
    ranked.sort_by(|a, b| {
        a.1.total_cmp(&b.1)
            .then(a.2.total_cmp(&b.2))
            .then(b.3.total_cmp(&a.3))
    });
    ranked[0].0
}
