//! Standard scaling of numeric columns.

use polars::prelude::*;
use tracing::debug;

use crate::error::{ProcessingError, Result};
use crate::utils::{column_f64, mean, numeric_column_names, population_std};

/// Rescales numeric columns to zero mean and unit variance.
///
/// Statistics come from the frame being scaled and are not kept anywhere.
pub struct StandardScaler;

impl StandardScaler {
    /// Scale every numeric column of `df` in place.
    ///
    /// Uses population statistics over non-null values. A constant column is
    /// centred but not divided (its scale is treated as 1). Nulls stay null.
    /// Does nothing, and logs nothing, when there are no numeric columns.
    pub fn scale(df: &mut DataFrame, processing_steps: &mut Vec<String>) -> Result<()> {
        let numeric = numeric_column_names(df);
        if numeric.is_empty() {
            return Ok(());
        }
        if df.height() == 0 {
            return Err(ProcessingError::InvalidData(
                "cannot normalize a table with no rows".to_string(),
            ));
        }

        for name in &numeric {
            let values = column_f64(df, name)?;
            let (Some(center), scale) = Self::fit(&values) else {
                debug!(column = %name, "Column has no values, leaving unscaled");
                continue;
            };

            let scaled: Vec<Option<f64>> = values
                .iter()
                .map(|v| v.map(|x| (x - center) / scale))
                .collect();
            df.replace(name, Series::new(name.as_str().into(), scaled))?;
        }

        processing_steps.push("Normalized numeric columns (standard scaling)".to_string());
        debug!(columns = numeric.len(), "Numeric columns standardized");
        Ok(())
    }

    /// Mean and scale of a column; the scale falls back to 1 for zero variance.
    fn fit(values: &[Option<f64>]) -> (Option<f64>, f64) {
        let Some(center) = mean(values) else {
            return (None, 1.0);
        };
        let scale = match population_std(values, center) {
            Some(std) if std > 0.0 => std,
            _ => 1.0,
        };
        (Some(center), scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::null_cell_count;

    fn mean_and_std(df: &DataFrame, name: &str) -> (f64, f64) {
        let values = column_f64(df, name).unwrap();
        let m = mean(&values).unwrap();
        (m, population_std(&values, m).unwrap())
    }

    #[test]
    fn test_scaled_columns_have_zero_mean_unit_std() {
        let mut df = df![
            "a" => [1.0, 2.0, 3.0, 4.0, 10.0],
            "b" => [100i64, 200, 300, 400, 500],
            "label" => ["v", "w", "x", "y", "z"],
        ]
        .unwrap();
        let mut steps = vec![];

        StandardScaler::scale(&mut df, &mut steps).unwrap();

        for name in ["a", "b"] {
            let (m, s) = mean_and_std(&df, name);
            assert!(m.abs() < 1e-9, "{name} mean {m}");
            assert!((s - 1.0).abs() < 1e-9, "{name} std {s}");
        }
        assert_eq!(df.column("b").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("label").unwrap().dtype(), &DataType::String);
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn test_constant_column_is_centred() {
        let mut df = df!["c" => [5.0, 5.0, 5.0]].unwrap();
        let mut steps = vec![];

        StandardScaler::scale(&mut df, &mut steps).unwrap();

        assert_eq!(
            column_f64(&df, "c").unwrap(),
            vec![Some(0.0), Some(0.0), Some(0.0)]
        );
    }

    #[test]
    fn test_nulls_are_preserved() {
        let mut df = df!["a" => [Some(1.0), None, Some(3.0)]].unwrap();
        let mut steps = vec![];

        StandardScaler::scale(&mut df, &mut steps).unwrap();

        assert_eq!(null_cell_count(&df), 1);
        assert_eq!(
            column_f64(&df, "a").unwrap(),
            vec![Some(-1.0), None, Some(1.0)]
        );
    }

    #[test]
    fn test_no_numeric_columns_is_noop() {
        let mut df = df!["label" => ["x"]].unwrap();
        let mut steps = vec![];

        StandardScaler::scale(&mut df, &mut steps).unwrap();
        assert!(steps.is_empty());
    }

    #[test]
    fn test_empty_table_is_rejected() {
        let mut df = df!["a" => Vec::<f64>::new()].unwrap();
        let mut steps = vec![];

        let err = StandardScaler::scale(&mut df, &mut steps).unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidData(_)));
    }
}
