//! Tabular Data Processing Library
//!
//! CSV ingestion, dataset inspection, EDA chart rendering and the
//! preprocessing pipeline behind the EDA Lab service, built on Polars.
//!
//! # Overview
//!
//! - **Ingestion**: [`read_csv`] parses an uploaded file with full schema
//!   inference; [`TablePreview`] holds the first rows as JSON values.
//! - **Inspection**: [`inspect`] reports shape, dtypes, missing counts and the
//!   numeric/categorical split.
//! - **Visualization**: [`render_eda`] draws histograms, a correlation heatmap
//!   and boxplots as base64-encoded PNGs.
//! - **Preprocessing**: [`Preprocessor`] drops columns, fills missing values,
//!   removes IQR outliers, standardizes numeric columns and derives next-step
//!   targets from a `close` column.
//! - **Export**: [`merge_for_export`] appends changed processed columns to the
//!   raw table for download.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use edalab_processing::{FillNaMethod, PreprocessingOptions, Preprocessor, read_csv};
//!
//! let raw = read_csv("prices.csv", &bytes)?;
//!
//! let options = PreprocessingOptions::builder()
//!     .fill_na_method(FillNaMethod::Median)
//!     .remove_outliers(true)
//!     .build()?;
//!
//! let outcome = Preprocessor::new(options)?.run(&raw)?;
//! for step in &outcome.steps {
//!     println!("{step}");
//! }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod ingest;
pub mod inspect;
pub mod pipeline;
pub mod utils;
pub mod visualize;

// Re-exports for convenient access
pub use config::{
    ConfigValidationError, FillNaMethod, PreprocessingOptions, PreprocessingOptionsBuilder,
};
pub use error::{ProcessingError, Result as ProcessingResult, ResultExt};
pub use export::{PROCESSED_PREFIX, merge_for_export, to_csv_string};
pub use ingest::{PREVIEW_ROWS, TablePreview, read_csv};
pub use inspect::{DataInfo, inspect};
pub use pipeline::{
    CLOSE_COLUMN, PreprocessOutcome, Preprocessor, TARGET_CLASS, TARGET_CLOSE,
};
pub use utils::{column_f64, is_numeric_dtype, numeric_column_names};
pub use visualize::{EdaPlots, render_eda};
