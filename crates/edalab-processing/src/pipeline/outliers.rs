//! IQR outlier removal.
//!
//! Numeric columns are fenced one after another, in column order. Each
//! column's quartiles are computed on the rows that survived the previous
//! columns, so exclusions compound and the row count can only shrink.

use polars::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::utils::{column_f64, numeric_column_names, quantile_sorted, sorted_values};

/// Removes rows outside `[Q1 - k*IQR, Q3 + k*IQR]`.
pub struct OutlierFilter;

impl OutlierFilter {
    /// Filter `df` in place and log the number of removed rows.
    ///
    /// A row survives a column only if its value there is present and inside
    /// the fences; a column without any value removes every row.
    pub fn remove_iqr_outliers(
        df: &mut DataFrame,
        threshold: f64,
        processing_steps: &mut Vec<String>,
    ) -> Result<usize> {
        let rows_before = df.height();

        for name in numeric_column_names(df) {
            let values = column_f64(df, &name)?;
            let sorted = sorted_values(&values);

            let fences = match (
                quantile_sorted(&sorted, 0.25),
                quantile_sorted(&sorted, 0.75),
            ) {
                (Some(q1), Some(q3)) => {
                    let iqr = q3 - q1;
                    Some((q1 - threshold * iqr, q3 + threshold * iqr))
                }
                _ => None,
            };

            let mask: Vec<bool> = values
                .iter()
                .map(|value| match (value, fences) {
                    (Some(v), Some((lower, upper))) => *v >= lower && *v <= upper,
                    _ => false,
                })
                .collect();

            let kept = mask.iter().filter(|keep| **keep).count();
            if kept != df.height() {
                debug!(
                    column = %name,
                    removed = df.height() - kept,
                    ?fences,
                    "Removing rows outside IQR fences"
                );
                *df = df.filter(&BooleanChunked::from_slice("mask".into(), &mask))?;
            }
        }

        let removed = rows_before - df.height();
        processing_steps.push(format!("Removed outliers: {removed} rows"));
        Ok(removed)
    }
}
