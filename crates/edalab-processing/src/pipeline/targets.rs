//! Next-step targets derived from a `close` column.

use polars::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::utils::column_f64;

/// Name of the column that triggers target derivation.
pub const CLOSE_COLUMN: &str = "close";
/// Derived binary target: did the next close go up?
pub const TARGET_CLASS: &str = "target_class";
/// Derived regression target: the next close.
pub const TARGET_CLOSE: &str = "target_close";

/// Derives `target_class` and `target_close` from the following row's close.
pub struct TargetBuilder;

impl TargetBuilder {
    /// Append both targets and drop rows left without a successor.
    ///
    /// Returns `false` without touching `df` when there is no `close` column.
    pub fn derive(df: &mut DataFrame, processing_steps: &mut Vec<String>) -> Result<bool> {
        if df.column(CLOSE_COLUMN).is_err() {
            return Ok(false);
        }

        let close = column_f64(df, CLOSE_COLUMN)?;
        let (target_class, target_close) = next_step_targets(&close);

        df.with_column(Series::new(TARGET_CLASS.into(), target_class))?;
        processing_steps.push(format!(
            "Created column '{TARGET_CLASS}' (1 = next close is higher, 0 = otherwise)"
        ));
        df.with_column(Series::new(TARGET_CLOSE.into(), target_close))?;
        processing_steps.push(format!("Created column '{TARGET_CLOSE}' (next close value)"));

        let rows_before = df.height();
        let subset = [TARGET_CLASS.to_string(), TARGET_CLOSE.to_string()];
        *df = df.drop_nulls(Some(subset.as_slice()))?;
        let dropped = rows_before - df.height();
        processing_steps.push(format!("Dropped {dropped} rows without a next close"));

        debug!(rows = df.height(), dropped, "Derived next-step targets");
        Ok(true)
    }
}

/// Shift `close` one step back to build the two targets.
///
/// `target_class[i]` is 1 when `close[i + 1] > close[i]` and 0 otherwise,
/// including when either value is missing. The last row has no successor and
/// gets nulls for both targets.
pub fn next_step_targets(close: &[Option<f64>]) -> (Vec<Option<i32>>, Vec<Option<f64>>) {
    let n = close.len();
    let mut target_class = Vec::with_capacity(n);
    let mut target_close = Vec::with_capacity(n);

    for i in 0..n {
        match close.get(i + 1) {
            Some(next) => {
                let rises = matches!((next, close[i]), (Some(next), Some(current)) if *next > current);
                target_class.push(Some(i32::from(rises)));
                target_close.push(*next);
            }
            None => {
                target_class.push(None);
                target_close.push(None);
            }
        }
    }

    (target_class, target_close)
}
