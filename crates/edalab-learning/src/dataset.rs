//! Projection of a processed table into a feature matrix and target vector.

use ndarray::{Array1, Array2};
use polars::prelude::*;
use tracing::debug;

use crate::error::{LearningError, Result};

/// Feature matrix `x` (rows by features) and target `y`, both `f64`.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub features: Vec<String>,
    pub target: String,
}

impl Dataset {
    /// Project `features` and `target` out of `df`.
    ///
    /// Every column must be numeric or boolean and free of nulls and NaN.
    pub fn from_frame(df: &DataFrame, features: &[String], target: &str) -> Result<Self> {
        let n_rows = df.height();
        let mut x = Array2::<f64>::zeros((n_rows, features.len()));

        for (j, name) in features.iter().enumerate() {
            let values = column_values(df, name)?;
            for (i, value) in values.into_iter().enumerate() {
                x[[i, j]] = value;
            }
        }
        let y = Array1::from_vec(column_values(df, target)?);

        debug!(
            rows = n_rows,
            features = features.len(),
            target,
            "Projected training matrix"
        );

        Ok(Self {
            x,
            y,
            features: features.to_vec(),
            target: target.to_string(),
        })
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    /// Rows `indices` of `x` and `y`, in the given order.
    pub fn subset(&self, indices: &[usize]) -> (Array2<f64>, Array1<f64>) {
        let x = self.x.select(ndarray::Axis(0), indices);
        let y = indices.iter().map(|&i| self.y[i]).collect();
        (x, y)
    }
}

fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| LearningError::ColumnNotFound(name.to_string()))?;

    let dtype = column.dtype();
    if !(dtype.is_primitive_numeric() || dtype.is_bool()) {
        return Err(LearningError::InvalidData(format!(
            "Column '{name}' must be numeric, found {dtype}"
        )));
    }

    let missing = column.null_count();
    if missing > 0 {
        return Err(LearningError::InvalidData(format!(
            "Column '{name}' contains {missing} missing values"
        )));
    }

    let casted = column
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let values: Vec<f64> = casted.f64()?.into_no_null_iter().collect();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(LearningError::InvalidData(format!(
            "Column '{name}' contains NaN or infinite values"
        )));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_projects_columns_in_request_order() {
        let df = df![
            "a" => [1.0, 2.0, 3.0],
            "b" => [10i64, 20, 30],
            "t" => [0i32, 1, 0],
        ]
        .unwrap();

        let data = Dataset::from_frame(&df, &names(&["b", "a"]), "t").unwrap();

        assert_eq!(data.x.shape(), &[3, 2]);
        assert_eq!(data.x.row(1).to_vec(), vec![20.0, 2.0]);
        assert_eq!(data.y.to_vec(), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_subset_keeps_index_order() {
        let df = df!["a" => [1.0, 2.0, 3.0, 4.0], "t" => [5.0, 6.0, 7.0, 8.0]].unwrap();
        let data = Dataset::from_frame(&df, &names(&["a"]), "t").unwrap();

        let (x, y) = data.subset(&[3, 0]);
        assert_eq!(x.column(0).to_vec(), vec![4.0, 1.0]);
        assert_eq!(y.to_vec(), vec![8.0, 5.0]);
    }

    #[test]
    fn test_rejects_nulls_and_text() {
        let df = df![
            "a" => [Some(1.0), None],
            "s" => ["x", "y"],
            "t" => [1.0, 2.0],
        ]
        .unwrap();

        let err = Dataset::from_frame(&df, &names(&["a"]), "t").unwrap_err();
        assert!(matches!(err, LearningError::InvalidData(_)));

        let err = Dataset::from_frame(&df, &names(&["s"]), "t").unwrap_err();
        assert!(err.to_string().contains("must be numeric"));

        let err = Dataset::from_frame(&df, &names(&["missing"]), "t").unwrap_err();
        assert!(matches!(err, LearningError::ColumnNotFound(_)));
    }
}
