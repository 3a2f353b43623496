//! Training and evaluation of one model on a processed table.
//!
//! A run validates the request against the table, fits a fresh model on each
//! fold, averages the fold metrics, persists the model of the last fold and
//! predicts every row with it. The last-fold model is deployed as is; there
//! is no refit on the full table.

use polars::prelude::DataFrame;
use tracing::{debug, info};

use crate::config::TrainingConfig;
use crate::dataset::Dataset;
use crate::error::{LearningError, Result, ResultExt};
use crate::metrics::{classification_metrics, mean_metrics, regression_metrics};
use crate::models::FittedModel;
use crate::store::ModelStore;
use crate::types::{
    FoldMetrics, MetricsReport, ModelType, TrainingOutcome, TrainingRequest, label_to_json,
    value_to_json,
};
use crate::validation::build_folds;

/// Runs training requests with a fixed configuration.
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    /// Create a trainer, validating the configuration first.
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Evaluate, persist and apply the model described by `request`.
    ///
    /// Request errors (missing columns, empty features, unknown model type,
    /// unusable data) are reported before anything is fitted or written.
    pub fn train(
        &self,
        df: &DataFrame,
        request: &TrainingRequest,
        store: &ModelStore,
    ) -> Result<TrainingOutcome> {
        let target = resolve_target(df, request)?;

        if request.feature_columns.is_empty() {
            return Err(LearningError::InvalidData(
                "feature_columns must name at least one column".to_string(),
            ));
        }
        for column in std::iter::once(&target).chain(&request.feature_columns) {
            if df.column(column).is_err() {
                return Err(LearningError::ColumnNotFound(column.clone()));
            }
        }

        let model_type: ModelType = request.model_type.parse()?;
        let data = Dataset::from_frame(df, &request.feature_columns, &target)?;
        if model_type.is_classifier() {
            ensure_class_labels(&data)?;
        }
        let folds = build_folds(data.n_samples(), &self.config)?;

        info!(
            model = %model_type,
            target = %target,
            features = data.features.len(),
            rows = data.n_samples(),
            folds = folds.len(),
            evaluation = %self.config.evaluation,
            "Starting training"
        );

        let mut fold_metrics = Vec::with_capacity(folds.len());
        let mut deployed = None;
        for (idx, fold) in folds.iter().enumerate() {
            let (x_train, y_train) = data.subset(&fold.train);
            let (x_test, y_test) = data.subset(&fold.test);

            let model = FittedModel::fit(model_type, &x_train, &y_train, &self.config)
                .context(format!("Fold {}", idx + 1))?;
            let y_pred = model.predict(&x_test);

            let metrics = if model_type.is_classifier() {
                FoldMetrics::Classification(classification_metrics(&y_test, &y_pred))
            } else {
                FoldMetrics::Regression(regression_metrics(&y_test, &y_pred))
            };
            debug!(
                fold = idx + 1,
                train_rows = fold.train.len(),
                test_rows = fold.test.len(),
                ?metrics,
                "Fold evaluated"
            );

            fold_metrics.push(metrics);
            deployed = Some(model);
        }

        let (Some(model), Some(mean)) = (deployed, mean_metrics(&fold_metrics)) else {
            return Err(LearningError::TrainingFailed(
                "no evaluation folds were produced".to_string(),
            ));
        };

        let model_filename = store.save(&model)?;

        let all_predictions = model.predict(&data.x);
        let (predictions, prediction) = if model_type.is_classifier() {
            (all_predictions.iter().map(|p| label_to_json(*p)).collect(), None)
        } else {
            (
                all_predictions.iter().map(|p| value_to_json(*p)).collect(),
                all_predictions.last().copied(),
            )
        };

        info!(
            model = %model_type,
            file = %model_filename,
            predictions = all_predictions.len(),
            "Training finished"
        );

        Ok(TrainingOutcome {
            prediction,
            predictions,
            metrics: MetricsReport {
                mean,
                folds: fold_metrics,
            },
            model_info: model.info(&data.features, &target),
            model_filename,
        })
    }
}

/// Classifiers take integral labels only; a continuous target is a request error.
fn ensure_class_labels(data: &Dataset) -> Result<()> {
    match data.y.iter().find(|label| label.fract() != 0.0) {
        Some(label) => Err(LearningError::InvalidData(format!(
            "Target '{}' holds continuous values (e.g. {label}); classifiers need integer class labels",
            data.target
        ))),
        None => Ok(()),
    }
}

/// The requested target, or the model type's default when none was given.
fn resolve_target(df: &DataFrame, request: &TrainingRequest) -> Result<String> {
    if !request.target_column.is_empty() {
        return Ok(request.target_column.clone());
    }

    let default = request
        .model_type
        .parse::<ModelType>()
        .ok()
        .and_then(|model| model.default_target());
    match default {
        Some(column) if df.column(column).is_ok() => Ok(column.to_string()),
        Some(column) => Err(LearningError::TargetNotFound(column.to_string())),
        // No default: the empty name fails column validation
        None => Ok(String::new()),
    }
}
