//! CSV ingestion and table previews.

use std::io::Cursor;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ProcessingError, Result};
use crate::utils::any_value_to_json;

/// Number of rows included in a preview.
pub const PREVIEW_ROWS: usize = 10;

/// Truncated view of a table returned to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePreview {
    /// All column names, in order.
    pub columns: Vec<String>,
    /// Up to [`PREVIEW_ROWS`] rows as arrays of JSON scalars.
    pub data: Vec<Vec<Value>>,
    /// `[row_count, column_count]` of the full table.
    pub shape: [usize; 2],
}

impl TablePreview {
    /// Build a preview from the first rows of `df`.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let head = df.head(Some(PREVIEW_ROWS));
        let columns = head
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        let mut data = Vec::with_capacity(head.height());
        for row_idx in 0..head.height() {
            let mut row = Vec::with_capacity(head.width());
            for column in head.get_columns() {
                row.push(any_value_to_json(column.get(row_idx)?));
            }
            data.push(row);
        }

        Ok(Self {
            columns,
            data,
            shape: [df.height(), df.width()],
        })
    }
}

/// Parse an uploaded CSV file.
///
/// The name must end in `.csv`; the content is never sniffed. The first row is
/// the header and column types are inferred from every row, so a column is
/// numeric only if all of its non-empty values parse as numbers.
pub fn read_csv(file_name: &str, bytes: &[u8]) -> Result<DataFrame> {
    if !file_name.ends_with(".csv") {
        return Err(ProcessingError::InvalidFile(
            "Only CSV files are accepted".to_string(),
        ));
    }

    std::str::from_utf8(bytes)
        .map_err(|e| ProcessingError::Parse(format!("file is not valid UTF-8: {e}")))?;

    debug!(file = file_name, bytes = bytes.len(), "Parsing CSV upload");

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| ProcessingError::Parse(e.to_string()))?;

    info!(
        file = file_name,
        rows = df.height(),
        columns = df.width(),
        "CSV loaded"
    );
    Ok(df)
}
