//! Attaching the proxy risk label to the feature table

use log::warn;
use ndarray::Array2;
use std::collections::HashMap;

use crate::error::Error;
use crate::features::FeatureTable;
use crate::segment::LabelRecord;

/// The final modeling dataset: the feature table with an aligned
/// `is_high_risk` column.
#[derive(Debug, Clone)]
pub struct ModelingTable {
    pub columns: Vec<String>,
    pub values: Array2<f64>,
    pub customer_ids: Vec<String>,
    pub is_high_risk: Vec<u8>,
}

impl ModelingTable {
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Write the dataset as CSV, preserving column order. NaN cells (the
    /// missing standard-deviation aggregate) serialize as empty fields.
    pub fn write_csv(&self, path: &str) -> crate::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        header.push("CustomerId");
        header.push("is_high_risk");
        writer.write_record(&header)?;

        for (row, customer_id) in self.customer_ids.iter().enumerate() {
            let mut record: Vec<String> = Vec::with_capacity(header.len());
            for column in 0..self.values.ncols() {
                let value = self.values[[row, column]];
                record.push(if value.is_nan() {
                    String::new()
                } else {
                    value.to_string()
                });
            }
            record.push(customer_id.clone());
            record.push(self.is_high_risk[row].to_string());
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Left-join the label table onto the feature table by customer identifier.
///
/// A duplicate customer in the label table would grow the join and is
/// rejected as an integrity violation. Customers absent from the label
/// table default to not-high-risk. The output row count always equals the
/// feature table's.
pub fn attach_target(
    features: FeatureTable,
    labels: &[LabelRecord],
) -> crate::Result<ModelingTable> {
    let mut by_id: HashMap<&str, u8> = HashMap::with_capacity(labels.len());
    for label in labels {
        if by_id
            .insert(label.customer_id.as_str(), label.is_high_risk)
            .is_some()
        {
            return Err(Error::DuplicateLabel {
                customer_id: label.customer_id.clone(),
            });
        }
    }

    let is_high_risk = features
        .customer_ids
        .iter()
        .map(|customer_id| match by_id.get(customer_id.as_str()) {
            Some(&label) => label,
            None => {
                warn!("customer {customer_id} missing from label table; defaulting is_high_risk to 0");
                0
            }
        })
        .collect();

    Ok(ModelingTable {
        columns: features.columns,
        values: features.values,
        customer_ids: features.customer_ids,
        is_high_risk,
    })
}
