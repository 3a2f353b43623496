//! edalab-learning: model training and evaluation for EDA Lab.
//!
//! This crate trains one of three native model families on a processed
//! Polars table, evaluates it with expanding-window time-series
//! cross-validation, persists the deployed model and predicts every row.
//!
//! # Model families
//!
//! | `model_type`     | Model                               | Default target |
//! |------------------|-------------------------------------|----------------|
//! | `regression`     | OLS linear regression               | `target_close` |
//! | `classification` | L2 logistic regression (one-vs-rest)| `target_class` |
//! | `random_forest`  | Random forest of Gini trees         | none           |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use edalab_learning::{ModelStore, Trainer, TrainingConfig, TrainingRequest};
//!
//! let store = ModelStore::open("models")?;
//! let trainer = Trainer::new(TrainingConfig::default())?;
//!
//! let request = TrainingRequest {
//!     model_type: "regression".into(),
//!     target_column: String::new(),
//!     feature_columns: vec!["volume".into()],
//! };
//! let outcome = trainer.train(&processed, &request, &store)?;
//! println!("saved {}", outcome.model_filename);
//! ```
//!
//! # Evaluation
//!
//! Folds come from [`time_series_split`]: each test block lies strictly after
//! its training rows. A fresh model is fitted per fold; the model of the last
//! fold is the one persisted and used for predictions. A seeded shuffled
//! holdout is available through [`EvaluationStrategy::Holdout`].
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, LearningError>`](LearningError).
//! [`LearningError::is_client_error`] separates request mistakes from
//! failures during training.

pub mod config;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod models;
pub mod store;
pub mod trainer;
pub mod types;
pub mod validation;

// Re-exports for convenient access
pub use config::{EvaluationStrategy, TrainingConfig, TrainingConfigBuilder};
pub use dataset::Dataset;
pub use error::{LearningError, Result as LearningResult, ResultExt};
pub use metrics::{classification_metrics, mean_metrics, regression_metrics};
pub use models::FittedModel;
pub use store::{ARTIFACT_EXTENSION, ModelStore};
pub use trainer::Trainer;
pub use types::{
    ClassificationMetrics, DEFAULT_CLASS_TARGET, DEFAULT_REGRESSION_TARGET, FoldMetrics,
    MetricsReport, ModelInfo, ModelType, RegressionMetrics, TrainingOutcome, TrainingRequest,
};
pub use validation::{Fold, build_folds, holdout_split, time_series_split};
