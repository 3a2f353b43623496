//! Model implementations.
//!
//! [`FittedModel`] wraps the three supported families behind one fit/predict
//! surface so the trainer and the model store can treat them uniformly.

pub mod forest;
mod linalg;
pub mod linear;
pub mod logistic;
pub mod tree;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

pub use forest::RandomForestClassifier;
pub use linear::LinearRegression;
pub use logistic::{LogisticParams, LogisticRegression};
pub use tree::DecisionTree;

use crate::config::TrainingConfig;
use crate::error::Result;
use crate::types::{ModelInfo, ModelType, feature_map, label_to_json};

/// A trained model of any supported family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FittedModel {
    Linear(LinearRegression),
    Logistic(LogisticRegression),
    Forest(RandomForestClassifier),
}

impl FittedModel {
    /// Fit a fresh model of `model_type`.
    pub fn fit(
        model_type: ModelType,
        x: &Array2<f64>,
        y: &Array1<f64>,
        config: &TrainingConfig,
    ) -> Result<Self> {
        Ok(match model_type {
            ModelType::Regression => FittedModel::Linear(LinearRegression::fit(x, y)?),
            ModelType::Classification => {
                FittedModel::Logistic(LogisticRegression::fit(x, y, config.into())?)
            }
            ModelType::RandomForest => FittedModel::Forest(RandomForestClassifier::fit(
                x,
                y,
                config.n_estimators,
                config.random_seed,
            )?),
        })
    }

    pub fn model_type(&self) -> ModelType {
        match self {
            FittedModel::Linear(_) => ModelType::Regression,
            FittedModel::Logistic(_) => ModelType::Classification,
            FittedModel::Forest(_) => ModelType::RandomForest,
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        match self {
            FittedModel::Linear(model) => model.predict(x),
            FittedModel::Logistic(model) => model.predict(x),
            FittedModel::Forest(model) => model.predict(x),
        }
    }

    /// Metadata for this model trained on `features` to predict `target`.
    pub fn info(&self, features: &[String], target: &str) -> ModelInfo {
        let mut info = ModelInfo {
            model_type: self.model_type().as_str().to_string(),
            features: features.to_vec(),
            target: target.to_string(),
            coefficients: None,
            intercept: None,
            feature_importance: None,
            classes: None,
        };

        match self {
            FittedModel::Linear(model) => {
                info.coefficients = Some(feature_map(features, &model.coefficients().to_vec()));
                info.intercept = Some(model.intercept());
            }
            FittedModel::Logistic(model) => {
                info.classes = Some(model.classes().iter().map(|c| label_to_json(*c)).collect());
            }
            FittedModel::Forest(model) => {
                info.feature_importance =
                    Some(feature_map(features, model.feature_importances()));
                info.classes = Some(model.classes().iter().map(|c| label_to_json(*c)).collect());
            }
        }
        info
    }
}
