//! Merging raw and processed tables for download.

use polars::prelude::*;
use tracing::debug;

use crate::error::Result;

/// Prefix for processed columns added next to the raw ones.
pub const PROCESSED_PREFIX: &str = "processed_";

/// Append processed columns to the raw table.
///
/// Only happens when both tables have the same height; otherwise the raw
/// table is returned unchanged. A processed column is added as
/// `processed_{name}` when raw has no such column or when the two differ in
/// dtype or in any value (nulls compare equal to nulls). Rows are matched by
/// position.
pub fn merge_for_export(raw: &DataFrame, processed: &DataFrame) -> Result<DataFrame> {
    let mut merged = raw.clone();
    if raw.height() != processed.height() {
        debug!(
            raw_rows = raw.height(),
            processed_rows = processed.height(),
            "Row counts differ, exporting raw table only"
        );
        return Ok(merged);
    }

    for column in processed.get_columns() {
        let series = column.as_materialized_series();
        let unchanged = raw
            .column(column.name().as_str())
            .map(|existing| {
                let existing = existing.as_materialized_series();
                existing.dtype() == series.dtype() && existing.equals_missing(series)
            })
            .unwrap_or(false);
        if unchanged {
            continue;
        }

        let renamed = series
            .clone()
            .with_name(format!("{PROCESSED_PREFIX}{}", column.name()).into());
        merged.with_column(renamed)?;
    }

    debug!(columns = merged.width(), "Merged processed columns for export");
    Ok(merged)
}

/// Serialize `df` as CSV with a header row and no index column.
pub fn to_csv_string(df: &DataFrame) -> Result<String> {
    let mut buffer = Vec::new();
    let mut df = df.clone();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(&mut df)?;
    // CsvWriter only emits UTF-8
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merge_adds_new_and_changed_columns() {
        let raw = df![
            "close" => [1.0, 2.0, 3.0],
            "ticker" => ["a", "b", "c"],
        ]
        .unwrap();
        let processed = df![
            "close" => [-1.0, 0.0, 1.0],
            "ticker" => ["a", "b", "c"],
            "target_class" => [1i32, 1, 0],
        ]
        .unwrap();

        let merged = merge_for_export(&raw, &processed).unwrap();

        assert_eq!(
            merged.get_column_names_str(),
            vec!["close", "ticker", "processed_close", "processed_target_class"]
        );
    }

    #[test]
    fn test_merge_treats_dtype_change_as_difference() {
        let raw = df!["qty" => [1i64, 2]].unwrap();
        let processed = df!["qty" => [1.0, 2.0]].unwrap();

        let merged = merge_for_export(&raw, &processed).unwrap();
        assert_eq!(merged.get_column_names_str(), vec!["qty", "processed_qty"]);
    }

    #[test]
    fn test_merge_nulls_compare_equal() {
        let raw = df!["a" => [Some(1.0), None]].unwrap();
        let processed = df!["a" => [Some(1.0), None]].unwrap();

        let merged = merge_for_export(&raw, &processed).unwrap();
        assert_eq!(merged.width(), 1);
    }

    #[test]
    fn test_mismatched_heights_return_raw_unchanged() {
        let raw = df!["close" => [1.0, 2.0, 3.0]].unwrap();
        let processed = df!["close" => [0.5, 0.7], "target_close" => [2.0, 3.0]].unwrap();

        let merged = merge_for_export(&raw, &processed).unwrap();
        assert!(merged.equals_missing(&raw));
    }

    #[test]
    fn test_to_csv_string_has_header_and_no_index() {
        let df = df!["a" => [1i64, 2], "b" => ["x", "y"]].unwrap();
        let csv = to_csv_string(&df).unwrap();
        assert_eq!(csv, "a,b\n1,x\n2,y\n");
    }
}
