//! Error types for the edalab-learning crate.
//!
//! This module defines [`LearningError`], the error type returned by every
//! fallible operation in the crate: configuration, dataset projection, model
//! fitting, evaluation and artifact persistence.
//!
//! # Error Handling
//!
//! Errors carry a stable code ([`LearningError::error_code`]) and a
//! classification ([`LearningError::is_client_error`]) so the HTTP layer can
//! answer 400 for bad requests and 500 for failures during training.
//!
//! ```
//! use edalab_learning::{LearningError, TrainingConfig};
//!
//! fn configure() -> Result<TrainingConfig, LearningError> {
//!     let config = TrainingConfig::builder().cv_folds(5).build()?;
//!     Ok(config)
//! }
//! ```

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for edalab-learning operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Invalid training configuration.
    ///
    /// Raised by [`TrainingConfigBuilder::build`](crate::TrainingConfigBuilder::build)
    /// when a value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The request or the data cannot be used for training.
    ///
    /// Common causes:
    /// - `feature_columns` is empty
    /// - A feature or target column contains nulls or non-numeric values
    /// - Too few rows for the requested number of folds
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A requested feature or target column does not exist.
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    /// The default target column for a model type is missing.
    ///
    /// Default targets are derived during preprocessing from a `close` column.
    #[error("Target column '{0}' not found; run preprocessing first")]
    TargetNotFound(String),

    /// `model_type` is not one of the supported families.
    #[error("Unsupported model type: {0}")]
    UnsupportedModel(String),

    /// A model could not be fitted on a training fold.
    ///
    /// For example, a classification fold that contains a single class.
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    /// A fitted model could not be encoded for storage.
    #[error("Failed to serialize model: {0}")]
    Serialization(#[from] bincode::Error),

    /// I/O error while writing model artifacts.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error while projecting the dataset.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<LearningError>,
    },
}

impl LearningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        LearningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get the stable error code reported to API clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::TargetNotFound(_) => "TARGET_NOT_FOUND",
            Self::UnsupportedModel(_) => "UNSUPPORTED_MODEL",
            Self::TrainingFailed(_) => "TRAINING_FAILED",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether the request itself was wrong (as opposed to training failing).
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::InvalidConfig(_)
            | Self::InvalidData(_)
            | Self::ColumnNotFound(_)
            | Self::TargetNotFound(_)
            | Self::UnsupportedModel(_) => true,
            Self::WithContext { source, .. } => source.is_client_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for LearningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("LearningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for learning operations.
pub type Result<T> = std::result::Result<T, LearningError>;

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

impl<T> ResultExt<T> for std::io::Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| LearningError::Io(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_value() {
        assert_eq!(
            LearningError::UnsupportedModel("svm".to_string()).to_string(),
            "Unsupported model type: svm"
        );
        assert_eq!(
            LearningError::ColumnNotFound("volume".to_string()).to_string(),
            "Column 'volume' not found"
        );
        assert_eq!(
            LearningError::TargetNotFound("target_class".to_string()).to_string(),
            "Target column 'target_class' not found; run preprocessing first"
        );
    }

    #[test]
    fn test_client_errors() {
        assert!(LearningError::UnsupportedModel("x".to_string()).is_client_error());
        assert!(LearningError::InvalidData("x".to_string()).is_client_error());
        assert!(!LearningError::TrainingFailed("x".to_string()).is_client_error());
        assert!(
            !LearningError::Io(std::io::Error::other("disk full")).is_client_error()
        );
    }

    #[test]
    fn test_context_keeps_code() {
        let error = LearningError::ColumnNotFound("close".to_string()).with_context("Fold 3");
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
        assert!(error.is_client_error());
        assert!(error.to_string().starts_with("Fold 3: "));
    }

    #[test]
    fn test_error_serialization() {
        let error = LearningError::TrainingFailed("single class".to_string());
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["code"], "TRAINING_FAILED");
        assert_eq!(json["message"], "Training failed: single class");
    }
}
