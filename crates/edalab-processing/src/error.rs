//! Error types for the tabular processing crate.
//!
//! Every fallible operation in this crate returns [`ProcessingError`]. Errors
//! carry a stable code (see [`ProcessingError::error_code`]) and know whether
//! they were caused by the caller's input or by the processing itself, which
//! lets the HTTP layer pick a status code without string matching.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::config::ConfigValidationError;

/// The main error type for ingestion, inspection, plotting and preprocessing.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// Uploaded file was rejected before parsing (wrong extension).
    #[error("{0}")]
    InvalidFile(String),

    /// Uploaded content could not be decoded or parsed as CSV.
    #[error("Failed to parse CSV: {0}")]
    Parse(String),

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid preprocessing options.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    /// Data cannot be processed in its current shape.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Type conversion failed.
    #[error("Failed to convert column '{column}' to {target_type}: {reason}")]
    TypeConversionFailed {
        column: String,
        target_type: String,
        reason: String,
    },

    /// Chart rendering failed.
    #[error("Failed to render chart: {0}")]
    Plotting(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProcessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get the stable error code reported to API clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidFile(_) => "INVALID_FILE",
            Self::Parse(_) => "PARSE_ERROR",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::TypeConversionFailed { .. } => "TYPE_CONVERSION_FAILED",
            Self::Plotting(_) => "PLOTTING_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether the caller's input caused the failure (as opposed to processing).
    ///
    /// Only a rejected file name and invalid options count; a CSV that fails
    /// to parse or a pipeline step that blows up is a processing failure.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::InvalidFile(_) | Self::InvalidConfig(_) => true,
            Self::WithContext { source, .. } => source.is_client_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ProcessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProcessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for processing operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProcessingError::Polars(e).with_context(context))
    }
}
