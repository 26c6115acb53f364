//! RiskForge CLI: build a credit-risk modeling dataset from raw transactions
//!
//! Orchestrates the two pipeline paths: feature engineering (temporal
//! decomposition, column transforms, customer aggregation) and proxy label
//! derivation (RFM metrics, behavioral clustering), then merges and writes
//! the final per-customer dataset.

use anyhow::Result;
use clap::Parser;
use riskforge::{
    attach_target, calculate_rfm, engineer_features, load_transactions, segment_customers, Args,
    Vocabularies,
};
use std::time::Instant;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let snapshot = args.snapshot_date()?;

    if args.verbose {
        println!("RiskForge - Credit-Risk Dataset Preparation");
        println!("===========================================\n");
    }

    let start_time = Instant::now();

    // Step 1: Load and validate raw transactions
    if args.verbose {
        println!("Step 1: Loading transactions from {}", args.input);
    }
    let transactions = load_transactions(&args.input)?;
    println!("✓ Loaded {} transactions", transactions.len());

    // Step 2: Build the per-customer feature table
    let vocabs = Vocabularies::default();
    let feature_start = Instant::now();
    let features = engineer_features(&transactions, &vocabs)?;
    println!(
        "✓ Feature table: {} customers x {} columns",
        features.n_rows(),
        features.n_cols()
    );
    if args.verbose {
        println!(
            "  Feature engineering time: {:.2}s",
            feature_start.elapsed().as_secs_f64()
        );
    }

    // Step 3: Derive the proxy risk label
    if args.verbose {
        println!("\nStep 2: Segmenting customers (snapshot {snapshot})");
        println!("  Clusters: {}, seed: {}", args.clusters, args.seed);
    }
    let rfm = calculate_rfm(&transactions, snapshot)?;
    let labels = segment_customers(&rfm, &args.segment_params())?;
    let high_risk = labels.iter().filter(|label| label.is_high_risk == 1).count();
    println!(
        "✓ Proxy labels: {high_risk}/{} customers high risk ({:.1}%)",
        labels.len(),
        100.0 * high_risk as f64 / labels.len() as f64
    );

    // Step 4: Merge and write the modeling dataset
    let dataset = attach_target(features, &labels)?;
    dataset.write_csv(&args.output)?;

    println!("\n=== Dataset Complete ===");
    println!("Rows written: {}", dataset.n_rows());
    println!("Output saved to: {}", args.output);
    println!(
        "Total processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}
