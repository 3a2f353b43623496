//! Shared utilities for the processing crate.
//!
//! Dtype classification, column extraction to `f64`, quantiles and JSON
//! conversion of cell values live here so every module agrees on them.

use polars::prelude::*;
use serde_json::{Number, Value};

use crate::error::{ProcessingError, Result};

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Names of the numeric columns, in column order.
pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| is_numeric_dtype(col.dtype()))
        .map(|col| col.name().to_string())
        .collect()
}

/// Human-readable dtype label for a column (e.g. `Int64`, `Float64`, `String`).
pub fn dtype_label(dtype: &DataType) -> String {
    format!("{:?}", dtype)
}

/// Total number of null cells across the frame.
pub fn null_cell_count(df: &DataFrame) -> usize {
    df.get_columns().iter().map(|col| col.null_count()).sum()
}

// =============================================================================
// Series Extraction Utilities
// =============================================================================

/// Read a column as `f64` values, keeping nulls as `None`.
///
/// Float NaN values are reported as `None` so they count as missing.
pub fn column_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| ProcessingError::ColumnNotFound(name.to_string()))?;
    series_f64(column.as_materialized_series())
}

/// Read a series as `f64` values, keeping nulls as `None`.
pub fn series_f64(series: &Series) -> Result<Vec<Option<f64>>> {
    let casted = series
        .strict_cast(&DataType::Float64)
        .map_err(|e| ProcessingError::TypeConversionFailed {
            column: series.name().to_string(),
            target_type: "Float64".to_string(),
            reason: e.to_string(),
        })?;
    Ok(casted
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Sorted non-null values of a numeric column.
pub fn sorted_values(values: &[Option<f64>]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

// =============================================================================
// Statistics Utilities
// =============================================================================

/// Quantile of already sorted values with linear interpolation between
/// the two closest ranks. Returns `None` for an empty slice.
pub fn quantile_sorted(values: &[f64], quantile: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let pos = quantile.clamp(0.0, 1.0) * (values.len() as f64 - 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return Some(values[lower]);
    }
    let weight = pos - lower as f64;
    Some(values[lower] + (values[upper] - values[lower]) * weight)
}

/// Arithmetic mean of the non-null values.
pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Population standard deviation (ddof = 0) of the non-null values.
pub fn population_std(values: &[Option<f64>], mean: f64) -> Option<f64> {
    let (sum_sq, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(acc, count), v| {
            (acc + (v - mean).powi(2), count + 1)
        });
    (count > 0).then(|| (sum_sq / count as f64).sqrt())
}

/// Pearson correlation over pairwise-complete observations.
///
/// Returns `None` with fewer than two pairs or when either side is constant.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

// =============================================================================
// JSON Conversion Utilities
// =============================================================================

/// Convert a Polars cell to a JSON scalar. NaN and infinities become `null`.
pub fn any_value_to_json(value: AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),

        AnyValue::Int8(i) => Value::Number(i.into()),
        AnyValue::Int16(i) => Value::Number(i.into()),
        AnyValue::Int32(i) => Value::Number(i.into()),
        AnyValue::Int64(i) => Value::Number(i.into()),
        AnyValue::UInt8(u) => Value::Number(u.into()),
        AnyValue::UInt16(u) => Value::Number(u.into()),
        AnyValue::UInt32(u) => Value::Number(u.into()),
        AnyValue::UInt64(u) => Value::Number(u.into()),

        AnyValue::Float32(f) => float_to_json(f as f64),
        AnyValue::Float64(f) => float_to_json(f),

        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),

        // Dates, durations, nested values: use the Display rendering
        _ => Value::String(format!("{}", value)),
    }
}

/// Convert a float to JSON, mapping NaN/infinity to `null`.
pub fn float_to_json(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_numeric_column_names_keep_order() {
        let df = df![
            "b" => [1.0, 2.0],
            "label" => ["x", "y"],
            "a" => [3i64, 4],
        ]
        .unwrap();

        assert_eq!(numeric_column_names(&df), vec!["b", "a"]);
    }

    #[test]
    fn test_quantile_sorted_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&values, 0.25), Some(1.75));
        assert_eq!(quantile_sorted(&values, 0.5), Some(2.5));
        assert_eq!(quantile_sorted(&values, 0.75), Some(3.25));
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn test_mean_and_population_std() {
        let values = [Some(2.0), None, Some(4.0), Some(4.0), Some(4.0), Some(5.0), Some(5.0), Some(7.0), Some(9.0)];
        let m = mean(&values).unwrap();
        assert!((m - 5.0).abs() < 1e-12);
        assert!((population_std(&values, m).unwrap() - 2.0).abs() < 1e-12);
        assert_eq!(mean(&[None, None]), None);
    }

    #[test]
    fn test_pearson() {
        let x = [Some(1.0), Some(2.0), Some(3.0), None];
        let y = [Some(2.0), Some(4.0), Some(6.0), Some(100.0)];
        assert!((pearson(&x, &y).unwrap() - 1.0).abs() < 1e-12);

        let flat = [Some(1.0), Some(1.0), Some(1.0), Some(1.0)];
        assert_eq!(pearson(&flat, &y), None);
    }

    #[test]
    fn test_column_f64_treats_nan_as_missing() {
        let df = df!["v" => [Some(1.0), None, Some(f64::NAN)]].unwrap();
        assert_eq!(column_f64(&df, "v").unwrap(), vec![Some(1.0), None, None]);
        assert!(matches!(
            column_f64(&df, "nope"),
            Err(ProcessingError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_any_value_to_json() {
        assert_eq!(any_value_to_json(AnyValue::Int64(3)), Value::from(3));
        assert_eq!(any_value_to_json(AnyValue::Float64(f64::NAN)), Value::Null);
        assert_eq!(any_value_to_json(AnyValue::String("a")), Value::from("a"));
        assert_eq!(any_value_to_json(AnyValue::Null), Value::Null);
    }
}
