//! Shape, dtype and missing-value summaries of a table.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::{dtype_label, is_numeric_dtype};

/// Summary returned by the data-info endpoint.
///
/// `dtypes` and `missing_values` are keyed by column name and keep column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataInfo {
    pub shape: [usize; 2],
    pub columns: Vec<String>,
    pub dtypes: Map<String, Value>,
    pub missing_values: Map<String, Value>,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
}

/// Summarize `df`. Every non-numeric column is reported as categorical.
pub fn inspect(df: &DataFrame) -> DataInfo {
    let mut columns = Vec::with_capacity(df.width());
    let mut dtypes = Map::new();
    let mut missing_values = Map::new();
    let mut numeric_columns = Vec::new();
    let mut categorical_columns = Vec::new();

    for column in df.get_columns() {
        let name = column.name().to_string();
        dtypes.insert(name.clone(), Value::String(dtype_label(column.dtype())));
        missing_values.insert(name.clone(), Value::from(column.null_count()));

        if is_numeric_dtype(column.dtype()) {
            numeric_columns.push(name.clone());
        } else {
            categorical_columns.push(name.clone());
        }
        columns.push(name);
    }

    DataInfo {
        shape: [df.height(), df.width()],
        columns,
        dtypes,
        missing_values,
        numeric_columns,
        categorical_columns,
    }
}
