//! Configuration types for the preprocessing pipeline.
//!
//! [`PreprocessingOptions`] doubles as the JSON body accepted by the
//! preprocessing endpoint, so every field has a serde default and a missing
//! body field behaves exactly like the builder default.

use serde::{Deserialize, Deserializer, Serialize};

/// Strategy for filling missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FillNaMethod {
    /// Fill numeric columns with the column mean
    #[default]
    Mean,
    /// Fill numeric columns with the column median
    Median,
    /// Fill every column with its most frequent non-null value
    Mode,
    /// Fill every column with a literal value
    Value,
    /// Drop rows containing any missing value
    Drop,
}

impl FillNaMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillNaMethod::Mean => "mean",
            FillNaMethod::Median => "median",
            FillNaMethod::Mode => "mode",
            FillNaMethod::Value => "value",
            FillNaMethod::Drop => "drop",
        }
    }
}

/// Options controlling one preprocessing run.
///
/// # Example
///
/// ```rust,ignore
/// use edalab_processing::config::{FillNaMethod, PreprocessingOptions};
///
/// let options = PreprocessingOptions::builder()
///     .drop_columns(["id"])
///     .fill_na_method(FillNaMethod::Median)
///     .remove_outliers(true)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingOptions {
    /// Columns to remove. Names absent from the table are ignored.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub drop_columns: Vec<String>,

    /// How missing values are treated.
    /// Default: Mean
    #[serde(default)]
    pub fill_na_method: FillNaMethod,

    /// Literal used by [`FillNaMethod::Value`]. Without it that method is a no-op.
    #[serde(default)]
    pub fill_na_value: Option<f64>,

    /// Standard-scale numeric columns.
    /// Default: true
    #[serde(default = "default_true")]
    pub normalize: bool,

    /// Remove rows outside the IQR fences of any numeric column.
    /// Default: false
    #[serde(default)]
    pub remove_outliers: bool,

    /// IQR multiplier for the outlier fences.
    /// Default: 1.5
    #[serde(default = "default_outlier_threshold")]
    pub outlier_threshold: f64,
}

fn default_true() -> bool {
    true
}

fn default_outlier_threshold() -> f64 {
    1.5
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Default for PreprocessingOptions {
    fn default() -> Self {
        Self {
            drop_columns: Vec::new(),
            fill_na_method: FillNaMethod::default(),
            fill_na_value: None,
            normalize: true,
            remove_outliers: false,
            outlier_threshold: default_outlier_threshold(),
        }
    }
}

impl PreprocessingOptions {
    /// Create a new builder for `PreprocessingOptions`.
    pub fn builder() -> PreprocessingOptionsBuilder {
        PreprocessingOptionsBuilder::default()
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.outlier_threshold.is_finite() || self.outlier_threshold < 0.0 {
            return Err(ConfigValidationError::InvalidOutlierThreshold(
                self.outlier_threshold,
            ));
        }

        match self.fill_na_value {
            Some(value) if !value.is_finite() => {
                return Err(ConfigValidationError::InvalidFillValue(value));
            }
            _ => {}
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid outlier threshold: {0} (must be a finite number >= 0)")]
    InvalidOutlierThreshold(f64),

    #[error("Invalid fill value: {0} (must be finite)")]
    InvalidFillValue(f64),
}

/// Builder for [`PreprocessingOptions`] with fluent API.
#[derive(Debug, Default)]
pub struct PreprocessingOptionsBuilder {
    drop_columns: Option<Vec<String>>,
    fill_na_method: Option<FillNaMethod>,
    fill_na_value: Option<f64>,
    normalize: Option<bool>,
    remove_outliers: Option<bool>,
    outlier_threshold: Option<f64>,
}

impl PreprocessingOptionsBuilder {
    /// Set the columns to drop.
    pub fn drop_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drop_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn fill_na_method(mut self, method: FillNaMethod) -> Self {
        self.fill_na_method = Some(method);
        self
    }

    /// Set the literal used by [`FillNaMethod::Value`].
    pub fn fill_na_value(mut self, value: f64) -> Self {
        self.fill_na_value = Some(value);
        self
    }

    pub fn normalize(mut self, normalize: bool) -> Self {
        self.normalize = Some(normalize);
        self
    }

    pub fn remove_outliers(mut self, remove: bool) -> Self {
        self.remove_outliers = Some(remove);
        self
    }

    /// Set the IQR multiplier (must be >= 0).
    pub fn outlier_threshold(mut self, threshold: f64) -> Self {
        self.outlier_threshold = Some(threshold);
        self
    }

    /// Build the options.
    ///
    /// Returns validated `PreprocessingOptions` or an error if validation fails.
    pub fn build(self) -> Result<PreprocessingOptions, ConfigValidationError> {
        let options = PreprocessingOptions {
            drop_columns: self.drop_columns.unwrap_or_default(),
            fill_na_method: self.fill_na_method.unwrap_or_default(),
            fill_na_value: self.fill_na_value,
            normalize: self.normalize.unwrap_or(true),
            remove_outliers: self.remove_outliers.unwrap_or(false),
            outlier_threshold: self.outlier_threshold.unwrap_or(1.5),
        };

        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = PreprocessingOptions::default();
        assert!(options.drop_columns.is_empty());
        assert_eq!(options.fill_na_method, FillNaMethod::Mean);
        assert_eq!(options.fill_na_value, None);
        assert!(options.normalize);
        assert!(!options.remove_outliers);
        assert_eq!(options.outlier_threshold, 1.5);
    }

    #[test]
    fn test_builder_matches_default() {
        let built = PreprocessingOptions::builder().build().unwrap();
        assert_eq!(built, PreprocessingOptions::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let options = PreprocessingOptions::builder()
            .drop_columns(["id", "notes"])
            .fill_na_method(FillNaMethod::Value)
            .fill_na_value(0.0)
            .normalize(false)
            .remove_outliers(true)
            .outlier_threshold(3.0)
            .build()
            .unwrap();

        assert_eq!(options.drop_columns, vec!["id", "notes"]);
        assert_eq!(options.fill_na_method, FillNaMethod::Value);
        assert_eq!(options.fill_na_value, Some(0.0));
        assert!(!options.normalize);
        assert!(options.remove_outliers);
        assert_eq!(options.outlier_threshold, 3.0);
    }

    #[test]
    fn test_validation_negative_threshold() {
        let result = PreprocessingOptions::builder()
            .outlier_threshold(-0.5)
            .build();

        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidOutlierThreshold(_)
        ));
    }

    #[test]
    fn test_validation_non_finite_fill_value() {
        let result = PreprocessingOptions::builder()
            .fill_na_value(f64::INFINITY)
            .build();

        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidFillValue(_)
        ));
    }

    #[test]
    fn test_options_from_partial_json() {
        let options: PreprocessingOptions =
            serde_json::from_str(r#"{"fill_na_method": "median"}"#).unwrap();

        assert_eq!(options.fill_na_method, FillNaMethod::Median);
        assert!(options.normalize);
        assert_eq!(options.outlier_threshold, 1.5);
    }

    #[test]
    fn test_options_from_full_json() {
        let json = r#"{
            "drop_columns": null,
            "fill_na_method": "value",
            "fill_na_value": 2.5,
            "normalize": false,
            "remove_outliers": true,
            "outlier_threshold": 2.0
        }"#;

        let options: PreprocessingOptions = serde_json::from_str(json).unwrap();
        assert!(options.drop_columns.is_empty());
        assert_eq!(options.fill_na_method, FillNaMethod::Value);
        assert_eq!(options.fill_na_value, Some(2.5));
        assert!(!options.normalize);
        assert!(options.remove_outliers);
        assert_eq!(options.outlier_threshold, 2.0);
    }

    #[test]
    fn test_unknown_fill_method_rejected() {
        let result = serde_json::from_str::<PreprocessingOptions>(r#"{"fill_na_method": "knn"}"#);
        assert!(result.is_err());
    }
}
