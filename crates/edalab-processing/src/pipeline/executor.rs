//! Preprocessing executor.
//!
//! Runs the step sequence on a copy of the raw table and collects the
//! human-readable step log returned to the caller.

use polars::prelude::*;
use tracing::{debug, info};

use crate::config::PreprocessingOptions;
use crate::error::{Result, ResultExt};
use crate::pipeline::imputation::MissingValueFiller;
use crate::pipeline::outliers::OutlierFilter;
use crate::pipeline::scaling::StandardScaler;
use crate::pipeline::targets::TargetBuilder;

/// Result of one preprocessing run.
#[derive(Debug, Clone)]
pub struct PreprocessOutcome {
    /// The processed table.
    pub frame: DataFrame,
    /// One entry per applied step, in order.
    pub steps: Vec<String>,
}

/// Applies [`PreprocessingOptions`] to a raw table.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    options: PreprocessingOptions,
}

impl Preprocessor {
    /// Create a preprocessor, validating the options first.
    pub fn new(options: PreprocessingOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &PreprocessingOptions {
        &self.options
    }

    /// Run every step on a clone of `raw`.
    ///
    /// `raw` is never modified. Any failing step aborts the run, so callers
    /// either get a complete result or an error.
    pub fn run(&self, raw: &DataFrame) -> Result<PreprocessOutcome> {
        let mut df = raw.clone();
        let mut steps = Vec::new();

        info!(
            rows = df.height(),
            columns = df.width(),
            method = self.options.fill_na_method.as_str(),
            normalize = self.options.normalize,
            remove_outliers = self.options.remove_outliers,
            "Starting preprocessing"
        );

        // 1. Drop requested columns
        if !self.options.drop_columns.is_empty() {
            let present: Vec<String> = self
                .options
                .drop_columns
                .iter()
                .filter(|name| df.column(name.as_str()).is_ok())
                .cloned()
                .collect();
            df = df.drop_many(present.iter().map(String::as_str));
            steps.push(format!(
                "Dropped columns: {}",
                self.options.drop_columns.join(", ")
            ));
            debug!(dropped = ?present, "Dropped columns");
        }

        // 2. Missing values
        MissingValueFiller::fill(&mut df, &self.options, &mut steps)
            .context("Filling missing values")?;

        // 3. Outliers
        if self.options.remove_outliers {
            OutlierFilter::remove_iqr_outliers(&mut df, self.options.outlier_threshold, &mut steps)
                .context("Removing outliers")?;
        }

        // 4. Standard scaling
        if self.options.normalize {
            StandardScaler::scale(&mut df, &mut steps).context("Normalizing")?;
        }

        // 5. Next-step targets
        TargetBuilder::derive(&mut df, &mut steps).context("Deriving targets")?;

        info!(
            rows = df.height(),
            columns = df.width(),
            steps = steps.len(),
            "Preprocessing complete"
        );
        Ok(PreprocessOutcome { frame: df, steps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FillNaMethod;
    use crate::error::ProcessingError;
    use crate::pipeline::targets::{TARGET_CLASS, TARGET_CLOSE};
    use crate::utils::null_cell_count;

    #[test]
    fn test_run_never_mutates_raw() {
        let raw = df![
            "close" => [Some(1.0), None, Some(3.0), Some(4.0)],
            "volume" => [10i64, 20, 30, 40],
        ]
        .unwrap();
        let snapshot = raw.clone();

        let outcome = Preprocessor::new(PreprocessingOptions::default())
            .unwrap()
            .run(&raw)
            .unwrap();

        assert!(raw.equals_missing(&snapshot));
        assert_eq!(outcome.frame.height(), 3);
        assert!(outcome.frame.column(TARGET_CLASS).is_ok());
        assert!(outcome.frame.column(TARGET_CLOSE).is_ok());
    }

    #[test]
    fn test_drop_columns_ignores_missing_names() {
        let raw = df!["a" => [1.0, 2.0], "b" => [3.0, 4.0]].unwrap();
        let options = PreprocessingOptions::builder()
            .drop_columns(["b", "ghost"])
            .normalize(false)
            .build()
            .unwrap();

        let outcome = Preprocessor::new(options).unwrap().run(&raw).unwrap();

        assert_eq!(outcome.frame.get_column_names_str(), vec!["a"]);
        assert_eq!(outcome.steps[0], "Dropped columns: b, ghost");
    }

    #[test]
    fn test_step_log_order() {
        let raw = df!["close" => [3.0, 1.0, 2.0, 2.5, 50.0, 2.2]].unwrap();
        let options = PreprocessingOptions::builder()
            .remove_outliers(true)
            .build()
            .unwrap();

        let outcome = Preprocessor::new(options).unwrap().run(&raw).unwrap();

        assert_eq!(
            outcome.steps,
            vec![
                "Filled missing values with the column mean".to_string(),
                "Missing values treated: 0".to_string(),
                "Removed outliers: 1 rows".to_string(),
                "Normalized numeric columns (standard scaling)".to_string(),
                "Created column 'target_class' (1 = next close is higher, 0 = otherwise)"
                    .to_string(),
                "Created column 'target_close' (next close value)".to_string(),
                "Dropped 1 rows without a next close".to_string(),
            ]
        );
    }

    #[test]
    fn test_drop_method_leaves_no_nulls() {
        let raw = df![
            "a" => [Some(1.0), None, Some(3.0)],
            "s" => [Some("x"), Some("y"), None],
        ]
        .unwrap();
        let options = PreprocessingOptions::builder()
            .fill_na_method(FillNaMethod::Drop)
            .build()
            .unwrap();

        let outcome = Preprocessor::new(options).unwrap().run(&raw).unwrap();
        assert_eq!(null_cell_count(&outcome.frame), 0);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = PreprocessingOptions {
            outlier_threshold: -1.0,
            ..PreprocessingOptions::default()
        };
        let err = Preprocessor::new(options).unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidConfig(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_failure_carries_step_context() {
        let raw = df!["close" => Vec::<f64>::new()].unwrap();
        let err = Preprocessor::new(PreprocessingOptions::default())
            .unwrap()
            .run(&raw)
            .unwrap_err();

        assert!(err.to_string().contains("Normalizing"));
        assert_eq!(err.error_code(), "INVALID_DATA");
    }
}
