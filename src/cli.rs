//! Command-line interface definitions and argument parsing

use chrono::NaiveDate;
use clap::Parser;

use crate::segment::SegmentParams;

/// Prepare a per-customer credit-risk modeling dataset with RFM-based proxy labels
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the raw transaction CSV file
    #[arg(short, long, default_value = "data.csv")]
    pub input: String,

    /// Output path for the merged modeling dataset
    #[arg(short, long, default_value = "dataset.csv")]
    pub output: String,

    /// Snapshot date for recency computation (YYYY-MM-DD)
    #[arg(short, long, default_value = "2019-02-14")]
    pub snapshot: String,

    /// Number of behavioral clusters
    #[arg(short = 'k', long, default_value = "3")]
    pub clusters: usize,

    /// Random seed for centroid placement
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Maximum iterations for K-Means convergence
    #[arg(long, default_value = "300")]
    pub max_iters: u64,

    /// Tolerance for K-Means convergence
    #[arg(long, default_value = "1e-4")]
    pub tolerance: f64,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse the snapshot date argument.
    pub fn snapshot_date(&self) -> anyhow::Result<NaiveDate> {
        self.snapshot.parse().map_err(|_| {
            anyhow::anyhow!(
                "invalid snapshot date '{}', expected YYYY-MM-DD",
                self.snapshot
            )
        })
    }

    pub fn segment_params(&self) -> SegmentParams {
        SegmentParams {
            clusters: self.clusters,
            seed: self.seed,
            max_iters: self.max_iters,
            tolerance: self.tolerance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Args {
        Args {
            input: "data.csv".to_string(),
            output: "dataset.csv".to_string(),
            snapshot: "2019-02-14".to_string(),
            clusters: 3,
            seed: 42,
            max_iters: 300,
            tolerance: 1e-4,
            verbose: false,
        }
    }

    #[test]
    fn test_snapshot_date_parsing() {
        let mut args = args();
        let date = args.snapshot_date().unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2019, 2, 14).unwrap());

        args.snapshot = "14/02/2019".to_string();
        assert!(args.snapshot_date().is_err());
    }

    #[test]
    fn test_segment_params_carry_cli_values() {
        let mut args = args();
        args.clusters = 4;
        args.seed = 7;
        let params = args.segment_params();
        assert_eq!(params.clusters, 4);
        assert_eq!(params.seed, 7);
    }
}
