//! Common types used throughout the edalab-learning crate.
//!
//! # Overview
//!
//! - [`ModelType`]: the three supported model families
//! - [`TrainingRequest`]: what to train and on which columns
//! - [`MetricsReport`]: averaged metrics plus the per-fold breakdown
//! - [`ModelInfo`]: metadata about the deployed (last-fold) model
//! - [`TrainingOutcome`]: everything returned by [`Trainer::train`](crate::Trainer::train)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::LearningError;

/// Default classification target produced by preprocessing.
pub const DEFAULT_CLASS_TARGET: &str = "target_class";
/// Default regression target produced by preprocessing.
pub const DEFAULT_REGRESSION_TARGET: &str = "target_close";

/// Supported model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Ordinary least-squares linear regression.
    Regression,
    /// L2-regularized logistic regression.
    Classification,
    /// Random forest classifier.
    RandomForest,
}

impl ModelType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Regression => "regression",
            ModelType::Classification => "classification",
            ModelType::RandomForest => "random_forest",
        }
    }

    /// Whether the model predicts class labels.
    #[must_use]
    pub fn is_classifier(&self) -> bool {
        !matches!(self, ModelType::Regression)
    }

    /// Target used when the request leaves `target_column` empty.
    ///
    /// Only `regression` and `classification` have one; `random_forest`
    /// always needs an explicit target.
    #[must_use]
    pub fn default_target(&self) -> Option<&'static str> {
        match self {
            ModelType::Regression => Some(DEFAULT_REGRESSION_TARGET),
            ModelType::Classification => Some(DEFAULT_CLASS_TARGET),
            ModelType::RandomForest => None,
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = LearningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regression" => Ok(ModelType::Regression),
            "classification" => Ok(ModelType::Classification),
            "random_forest" => Ok(ModelType::RandomForest),
            other => Err(LearningError::UnsupportedModel(other.to_string())),
        }
    }
}

/// Body of a prediction request.
///
/// `model_type` stays a string so an unknown value can be reported with the
/// other request errors instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRequest {
    pub model_type: String,
    #[serde(default)]
    pub target_column: String,
    pub feature_columns: Vec<String>,
}

/// Regression metrics of one fold, or their fold means.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

/// Classification metrics of one fold, or their fold means.
///
/// Precision, recall and F1 are support-weighted averages over classes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Metrics for one fold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FoldMetrics {
    Regression(RegressionMetrics),
    Classification(ClassificationMetrics),
}

/// Fold-averaged metrics with the per-fold values alongside.
///
/// Serializes flat, e.g. `{"mse": .., "rmse": .., "mae": .., "r2": .., "folds": [..]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    #[serde(flatten)]
    pub mean: FoldMetrics,
    pub folds: Vec<FoldMetrics>,
}

/// Metadata about the deployed model.
///
/// Coefficients and importances are keyed by feature name in feature order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(rename = "type")]
    pub model_type: String,
    pub features: Vec<String>,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coefficients: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intercept: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_importance: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<Value>>,
}

/// Result of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOutcome {
    /// Prediction for the last row; only set for regression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<f64>,
    /// Deployed-model predictions for every row, in row order.
    pub predictions: Vec<Value>,
    pub metrics: MetricsReport,
    pub model_info: ModelInfo,
    /// File name of the persisted model inside the models directory.
    pub model_filename: String,
}

/// JSON for a continuous value; NaN and infinities become `null`.
pub fn value_to_json(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// JSON for a class label: an integer when the label is integral.
pub fn label_to_json(label: f64) -> Value {
    if label.fract() == 0.0 && label.abs() < i64::MAX as f64 {
        Value::Number((label as i64).into())
    } else {
        value_to_json(label)
    }
}

/// Pair feature names with per-feature values as a JSON object.
pub fn feature_map(features: &[String], values: &[f64]) -> Map<String, Value> {
    features
        .iter()
        .zip(values)
        .map(|(name, value)| (name.clone(), value_to_json(*value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_model_type_round_trip() {
        for model in [
            ModelType::Regression,
            ModelType::Classification,
            ModelType::RandomForest,
        ] {
            assert_eq!(model.as_str().parse::<ModelType>().unwrap(), model);
        }
        let err = "svm".parse::<ModelType>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported model type: svm");
    }

    #[test]
    fn test_default_targets() {
        assert_eq!(ModelType::Regression.default_target(), Some("target_close"));
        assert_eq!(ModelType::Classification.default_target(), Some("target_class"));
        assert_eq!(ModelType::RandomForest.default_target(), None);
    }

    #[test]
    fn test_request_target_defaults_to_empty() {
        let request: TrainingRequest = serde_json::from_value(json!({
            "model_type": "regression",
            "feature_columns": ["volume"],
        }))
        .unwrap();
        assert_eq!(request.target_column, "");
    }

    #[test]
    fn test_metrics_report_serializes_flat() {
        let fold = RegressionMetrics {
            mse: 4.0,
            rmse: 2.0,
            mae: 1.5,
            r2: 0.5,
        };
        let report = MetricsReport {
            mean: FoldMetrics::Regression(fold),
            folds: vec![FoldMetrics::Regression(fold)],
        };

        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "mse": 4.0, "rmse": 2.0, "mae": 1.5, "r2": 0.5,
                "folds": [{"mse": 4.0, "rmse": 2.0, "mae": 1.5, "r2": 0.5}],
            })
        );
    }

    #[test]
    fn test_model_info_omits_absent_fields() {
        let info = ModelInfo {
            model_type: "classification".to_string(),
            features: vec!["volume".to_string()],
            target: "target_class".to_string(),
            coefficients: None,
            intercept: None,
            feature_importance: None,
            classes: Some(vec![label_to_json(0.0), label_to_json(1.0)]),
        };
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({
                "type": "classification",
                "features": ["volume"],
                "target": "target_class",
                "classes": [0, 1],
            })
        );
    }

    #[test]
    fn test_label_json() {
        assert_eq!(label_to_json(3.0), json!(3));
        assert_eq!(label_to_json(-1.0), json!(-1));
        assert_eq!(label_to_json(0.5), json!(0.5));
        assert_eq!(value_to_json(f64::NAN), Value::Null);
    }
}
