//! Preprocessing pipeline.
//!
//! [`Preprocessor`] runs the fixed step sequence (drop, fill, outliers,
//! normalize, targets); the step implementations live in the submodules.

mod executor;
pub mod imputation;
pub mod outliers;
pub mod scaling;
pub mod targets;

pub use executor::{PreprocessOutcome, Preprocessor};
pub use imputation::MissingValueFiller;
pub use outliers::OutlierFilter;
pub use scaling::StandardScaler;
pub use targets::{CLOSE_COLUMN, TARGET_CLASS, TARGET_CLOSE, TargetBuilder};
