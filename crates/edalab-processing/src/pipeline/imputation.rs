//! Missing-value treatment.
//!
//! Strategies follow [`FillNaMethod`]: column statistics for numeric data,
//! the most frequent value for every column, a literal, or dropping rows.

use std::collections::BTreeMap;

use polars::prelude::*;
use tracing::debug;

use crate::config::{FillNaMethod, PreprocessingOptions};
use crate::error::Result;
use crate::utils::{
    column_f64, is_numeric_dtype, mean, null_cell_count, numeric_column_names, quantile_sorted,
    sorted_values,
};

/// Fills or drops missing values according to the preprocessing options.
pub struct MissingValueFiller;

impl MissingValueFiller {
    /// Apply the configured strategy to `df`.
    ///
    /// Always logs the number of missing cells that were treated, even when
    /// the strategy turned out to be a no-op.
    pub fn fill(
        df: &mut DataFrame,
        options: &PreprocessingOptions,
        processing_steps: &mut Vec<String>,
    ) -> Result<usize> {
        let missing_before = null_cell_count(df);

        match options.fill_na_method {
            FillNaMethod::Mean => {
                Self::fill_numeric_with(df, mean)?;
                processing_steps.push("Filled missing values with the column mean".to_string());
            }
            FillNaMethod::Median => {
                Self::fill_numeric_with(df, |values| {
                    quantile_sorted(&sorted_values(values), 0.5)
                })?;
                processing_steps.push("Filled missing values with the column median".to_string());
            }
            FillNaMethod::Mode => {
                Self::fill_mode(df)?;
                processing_steps
                    .push("Filled missing values with the most frequent value".to_string());
            }
            FillNaMethod::Value => match options.fill_na_value {
                Some(value) => {
                    Self::fill_literal(df, value)?;
                    processing_steps.push(format!("Filled missing values with {value}"));
                }
                None => debug!("fill_na_method is 'value' but no fill_na_value was given"),
            },
            FillNaMethod::Drop => {
                *df = df.drop_nulls::<String>(None)?;
                processing_steps.push("Dropped rows with missing values".to_string());
            }
        }

        let missing_after = null_cell_count(df);
        let treated = missing_before.saturating_sub(missing_after);
        processing_steps.push(format!("Missing values treated: {treated}"));
        debug!(
            method = options.fill_na_method.as_str(),
            missing_before, missing_after, "Missing values handled"
        );
        Ok(treated)
    }

    /// Fill numeric columns with a statistic of their non-null values.
    ///
    /// Columns that need filling become Float64; columns without any value
    /// have no statistic and are left alone.
    fn fill_numeric_with<F>(df: &mut DataFrame, statistic: F) -> Result<()>
    where
        F: Fn(&[Option<f64>]) -> Option<f64>,
    {
        for name in numeric_column_names(df) {
            let values = column_f64(df, &name)?;
            if values.iter().all(Option::is_some) {
                continue;
            }
            let Some(fill) = statistic(&values) else {
                continue;
            };

            let filled: Vec<f64> = values.into_iter().map(|v| v.unwrap_or(fill)).collect();
            df.replace(&name, Series::new(name.as_str().into(), filled))?;
        }
        Ok(())
    }

    /// Fill every column with its most frequent non-null value (smallest on ties).
    fn fill_mode(df: &mut DataFrame) -> Result<()> {
        let targets: Vec<(String, DataType)> = df
            .get_columns()
            .iter()
            .filter(|col| col.null_count() > 0)
            .map(|col| (col.name().to_string(), col.dtype().clone()))
            .collect();

        for (name, dtype) in targets {
            let series = df.column(&name)?.as_materialized_series().clone();
            let filled = match &dtype {
                dtype if is_numeric_dtype(dtype) => {
                    let values = column_f64(df, &name)?;
                    let Some(mode) = numeric_mode(&values) else {
                        continue;
                    };
                    let filled: Vec<f64> = values.into_iter().map(|v| v.unwrap_or(mode)).collect();
                    Series::new(name.as_str().into(), filled).cast(dtype)?
                }
                DataType::String => {
                    let ca = series.str()?;
                    let Some(mode) = most_frequent(ca.into_iter().flatten()) else {
                        continue;
                    };
                    let filled: Vec<&str> = ca.into_iter().map(|v| v.unwrap_or(mode)).collect();
                    Series::new(name.as_str().into(), filled)
                }
                DataType::Boolean => {
                    let ca = series.bool()?;
                    let Some(mode) = most_frequent(ca.into_iter().flatten()) else {
                        continue;
                    };
                    let filled: Vec<bool> = ca.into_iter().map(|v| v.unwrap_or(mode)).collect();
                    Series::new(name.as_str().into(), filled)
                }
                other => {
                    debug!(column = %name, dtype = ?other, "No mode fill for this dtype");
                    continue;
                }
            };
            df.replace(&name, filled)?;
        }
        Ok(())
    }

    /// Fill every column with a literal: numbers as Float64, strings as text.
    /// Boolean and temporal columns keep their nulls.
    fn fill_literal(df: &mut DataFrame, value: f64) -> Result<()> {
        let targets: Vec<(String, DataType)> = df
            .get_columns()
            .iter()
            .filter(|col| col.null_count() > 0)
            .map(|col| (col.name().to_string(), col.dtype().clone()))
            .collect();

        for (name, dtype) in targets {
            let series = df.column(&name)?.as_materialized_series().clone();
            let filled = match &dtype {
                dtype if is_numeric_dtype(dtype) => {
                    let filled: Vec<f64> = column_f64(df, &name)?
                        .into_iter()
                        .map(|v| v.unwrap_or(value))
                        .collect();
                    Series::new(name.as_str().into(), filled)
                }
                DataType::String => {
                    let text = value.to_string();
                    let filled: Vec<String> = series
                        .str()?
                        .into_iter()
                        .map(|v| v.map(str::to_string).unwrap_or_else(|| text.clone()))
                        .collect();
                    Series::new(name.as_str().into(), filled)
                }
                other => {
                    debug!(column = %name, dtype = ?other, "No literal fill for this dtype");
                    continue;
                }
            };
            df.replace(&name, filled)?;
        }
        Ok(())
    }
}

/// Most frequent value; ties resolve to the smallest value.
fn most_frequent<T: Ord>(values: impl Iterator<Item = T>) -> Option<T> {
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    let best = counts.values().copied().max()?;
    counts.into_iter().find(|(_, count)| *count == best).map(|(value, _)| value)
}

/// Most frequent non-null float; ties resolve to the smallest value.
fn numeric_mode(values: &[Option<f64>]) -> Option<f64> {
    let sorted = sorted_values(values);
    let mut best: Option<(f64, usize)> = None;
    let mut run_start = 0;
    for idx in 1..=sorted.len() {
        if idx == sorted.len() || sorted[idx] != sorted[run_start] {
            let run = idx - run_start;
            if best.is_none_or(|(_, count)| run > count) {
                best = Some((sorted[run_start], run));
            }
            run_start = idx;
        }
    }
    best.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn options(method: FillNaMethod) -> PreprocessingOptions {
        PreprocessingOptions {
            fill_na_method: method,
            ..PreprocessingOptions::default()
        }
    }

    fn f64_column(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        column_f64(df, name).unwrap()
    }

    #[test]
    fn test_mean_fill_numeric_only() {
        let mut df = df![
            "price" => [Some(1.0), None, Some(3.0)],
            "label" => [Some("a"), None, Some("b")],
        ]
        .unwrap();
        let mut steps = vec![];

        let treated = MissingValueFiller::fill(&mut df, &options(FillNaMethod::Mean), &mut steps)
            .unwrap();

        assert_eq!(treated, 1);
        assert_eq!(f64_column(&df, "price"), vec![Some(1.0), Some(2.0), Some(3.0)]);
        assert_eq!(df.column("label").unwrap().null_count(), 1);
        assert_eq!(
            steps,
            vec![
                "Filled missing values with the column mean".to_string(),
                "Missing values treated: 1".to_string(),
            ]
        );
    }

    #[test]
    fn test_median_fill_widens_integers() {
        let mut df = df!["qty" => [Some(1i64), Some(10), None, Some(2)]].unwrap();
        let mut steps = vec![];

        MissingValueFiller::fill(&mut df, &options(FillNaMethod::Median), &mut steps).unwrap();

        assert_eq!(df.column("qty").unwrap().dtype(), &DataType::Float64);
        assert_eq!(f64_column(&df, "qty")[2], Some(2.0));
    }

    #[test]
    fn test_mean_skips_all_null_column() {
        let mut df = df![
            "empty" => [None::<f64>, None],
            "full" => [1.0, 2.0],
        ]
        .unwrap();
        let mut steps = vec![];

        let treated = MissingValueFiller::fill(&mut df, &options(FillNaMethod::Mean), &mut steps)
            .unwrap();
        assert_eq!(treated, 0);
        assert_eq!(df.column("empty").unwrap().null_count(), 2);
    }

    #[test]
    fn test_mode_fill_every_column_type() {
        let mut df = df![
            "n" => [Some(3i64), Some(1), Some(3), Some(1), None],
            "s" => [Some("b"), Some("a"), None, Some("b"), Some("a")],
            "flag" => [Some(true), None, Some(true), Some(false), Some(true)],
        ]
        .unwrap();
        let mut steps = vec![];

        MissingValueFiller::fill(&mut df, &options(FillNaMethod::Mode), &mut steps).unwrap();

        assert_eq!(df.column("n").unwrap().dtype(), &DataType::Int64);
        assert_eq!(f64_column(&df, "n")[4], Some(1.0));
        let s: Vec<Option<&str>> = df.column("s").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(s[2], Some("a"));
        let flag: Vec<Option<bool>> =
            df.column("flag").unwrap().bool().unwrap().into_iter().collect();
        assert_eq!(flag[1], Some(true));
        assert_eq!(null_cell_count(&df), 0);
    }

    #[test]
    fn test_value_fill_with_and_without_value() {
        let mut df = df![
            "x" => [Some(1i64), None],
            "s" => [None, Some("k")],
        ]
        .unwrap();
        let mut steps = vec![];

        MissingValueFiller::fill(&mut df.clone(), &options(FillNaMethod::Value), &mut steps)
            .unwrap();
        assert_eq!(steps, vec!["Missing values treated: 0".to_string()]);

        let opts = PreprocessingOptions {
            fill_na_method: FillNaMethod::Value,
            fill_na_value: Some(7.5),
            ..PreprocessingOptions::default()
        };
        let mut steps = vec![];
        MissingValueFiller::fill(&mut df, &opts, &mut steps).unwrap();

        assert_eq!(f64_column(&df, "x"), vec![Some(1.0), Some(7.5)]);
        let s: Vec<Option<&str>> = df.column("s").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(s, vec![Some("7.5"), Some("k")]);
        assert_eq!(steps[0], "Filled missing values with 7.5");
    }

    #[test]
    fn test_value_fill_leaves_boolean_nulls() {
        let mut df = df![
            "flag" => [Some(true), None, Some(false)],
            "x" => [None, Some(2.0), Some(3.0)],
        ]
        .unwrap();
        let opts = PreprocessingOptions {
            fill_na_method: FillNaMethod::Value,
            fill_na_value: Some(1.0),
            ..PreprocessingOptions::default()
        };
        let mut steps = vec![];

        let treated = MissingValueFiller::fill(&mut df, &opts, &mut steps).unwrap();

        assert_eq!(treated, 1);
        assert_eq!(df.column("flag").unwrap().dtype(), &DataType::Boolean);
        assert_eq!(df.column("flag").unwrap().null_count(), 1);
        assert_eq!(f64_column(&df, "x")[0], Some(1.0));
    }

    #[test]
    fn test_drop_removes_rows_with_any_null() {
        let mut df = df![
            "a" => [Some(1.0), None, Some(3.0)],
            "b" => [Some("x"), Some("y"), None],
        ]
        .unwrap();
        let mut steps = vec![];

        let treated = MissingValueFiller::fill(&mut df, &options(FillNaMethod::Drop), &mut steps)
            .unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(null_cell_count(&df), 0);
        assert_eq!(treated, 2);
    }

    #[test]
    fn test_most_frequent_prefers_smallest_on_tie() {
        assert_eq!(most_frequent(["b", "a", "b", "a"].into_iter()), Some("a"));
        assert_eq!(most_frequent(Vec::<i32>::new().into_iter()), None);
        assert_eq!(numeric_mode(&[Some(2.0), Some(1.0), Some(2.0), Some(1.0)]), Some(1.0));
        assert_eq!(numeric_mode(&[Some(5.0), Some(2.0), Some(5.0)]), Some(5.0));
        assert_eq!(numeric_mode(&[None]), None);
    }
}
