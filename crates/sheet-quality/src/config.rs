//! Configuration for scanning and fixing.
//!
//! This module provides configuration options using the builder pattern.
//! Every threshold the detectors and the apply pipeline use lives here.

use crate::error::QualityError;
use serde::{Deserialize, Serialize};

/// Configuration for a quality session.
///
/// Use [`QualityConfig::builder()`] to create a new configuration with a
/// fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use sheet_quality::QualityConfig;
///
/// let config = QualityConfig::builder()
///     .chunk_rows(500)
///     .outlier_sigma(2.5)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Rows per read chunk, and cells between cancellation checks while
    /// detectors run. Ranges with more rows than this are scanned in chunks.
    /// Default: 1000
    pub chunk_rows: usize,

    /// Maximum number of undoable fixes kept per session.
    /// Default: 20
    pub max_history_entries: usize,

    /// A value is an outlier when it is more than this many standard
    /// deviations from the column mean.
    /// Default: 3.0
    pub outlier_sigma: f64,

    /// Minimum number of numeric cells before a column is checked for outliers.
    /// Default: 4
    pub outlier_min_samples: usize,

    /// Smallest number treated as a date serial in a column with date text.
    /// Default: 1.0
    pub date_serial_min: f64,

    /// Largest number treated as a date serial in a column with date text.
    /// Default: 80000.0 (year 2119)
    pub date_serial_max: f64,

    /// Share of plain-text cells (0.0 - 1.0) above which a column is checked
    /// for inconsistent casing.
    /// Default: 0.5
    pub casing_text_share: f64,

    /// Share of numbers plus numeric text (0.0 - 1.0) required before a column
    /// mixing the two is reported.
    /// Default: 0.8
    pub mixed_numeric_min_share: f64,

    /// Maximum number of example cells listed in a mixed-format issue.
    /// Default: 3
    pub max_examples: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            chunk_rows: 1000,
            max_history_entries: 20,
            outlier_sigma: 3.0,
            outlier_min_samples: 4,
            date_serial_min: 1.0,
            date_serial_max: 80000.0,
            casing_text_share: 0.5,
            mixed_numeric_min_share: 0.8,
            max_examples: 3,
        }
    }
}

impl QualityConfig {
    /// Create a new configuration builder.
    pub fn builder() -> QualityConfigBuilder {
        QualityConfigBuilder::default()
    }

    /// Inclusive serial range as `(min, max)`.
    pub fn serial_range(&self) -> (f64, f64) {
        (self.date_serial_min, self.date_serial_max)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("casing_text_share", self.casing_text_share),
            ("mixed_numeric_min_share", self.mixed_numeric_min_share),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidThreshold {
                    field: field.to_string(),
                    value,
                });
            }
        }

        for (field, value) in [
            ("chunk_rows", self.chunk_rows),
            ("max_history_entries", self.max_history_entries),
            ("max_examples", self.max_examples),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::ZeroCount(field.to_string()));
            }
        }

        if self.outlier_min_samples < 2 {
            return Err(ConfigValidationError::TooFewOutlierSamples(
                self.outlier_min_samples,
            ));
        }

        if !self.outlier_sigma.is_finite() || self.outlier_sigma <= 0.0 {
            return Err(ConfigValidationError::InvalidSigma(self.outlier_sigma));
        }

        if !(self.date_serial_min.is_finite()
            && self.date_serial_max.is_finite()
            && self.date_serial_min <= self.date_serial_max)
        {
            return Err(ConfigValidationError::InvalidSerialRange {
                min: self.date_serial_min,
                max: self.date_serial_max,
            });
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("'{0}' must be at least 1")]
    ZeroCount(String),

    #[error("Invalid outlier sample minimum: {0} (must be at least 2)")]
    TooFewOutlierSamples(usize),

    #[error("Invalid outlier sigma: {0} (must be a positive number)")]
    InvalidSigma(f64),

    #[error("Invalid date serial range: {min}..={max}")]
    InvalidSerialRange { min: f64, max: f64 },
}

impl From<ConfigValidationError> for QualityError {
    fn from(err: ConfigValidationError) -> Self {
        QualityError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`QualityConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct QualityConfigBuilder {
    chunk_rows: Option<usize>,
    max_history_entries: Option<usize>,
    outlier_sigma: Option<f64>,
    outlier_min_samples: Option<usize>,
    date_serial_min: Option<f64>,
    date_serial_max: Option<f64>,
    casing_text_share: Option<f64>,
    mixed_numeric_min_share: Option<f64>,
    max_examples: Option<usize>,
}

impl QualityConfigBuilder {
    /// Set the chunk size used for reading and for cancellation checks.
    pub fn chunk_rows(mut self, rows: usize) -> Self {
        self.chunk_rows = Some(rows);
        self
    }

    /// Set how many fixes can be undone.
    pub fn max_history_entries(mut self, max: usize) -> Self {
        self.max_history_entries = Some(max);
        self
    }

    /// Set the outlier threshold in standard deviations.
    pub fn outlier_sigma(mut self, sigma: f64) -> Self {
        self.outlier_sigma = Some(sigma);
        self
    }

    pub fn outlier_min_samples(mut self, n: usize) -> Self {
        self.outlier_min_samples = Some(n);
        self
    }

    /// Set the inclusive range of numbers treated as date serials.
    pub fn date_serial_range(mut self, min: f64, max: f64) -> Self {
        self.date_serial_min = Some(min);
        self.date_serial_max = Some(max);
        self
    }

    /// Set the plain-text share above which casing is checked.
    ///
    /// # Arguments
    /// * `share` - Value between 0.0 and 1.0 (e.g., 0.5 = more than half)
    pub fn casing_text_share(mut self, share: f64) -> Self {
        self.casing_text_share = Some(share);
        self
    }

    /// Set the numeric share required to report numbers mixed with numeric text.
    pub fn mixed_numeric_min_share(mut self, share: f64) -> Self {
        self.mixed_numeric_min_share = Some(share);
        self
    }

    pub fn max_examples(mut self, n: usize) -> Self {
        self.max_examples = Some(n);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `QualityConfig` or an error if validation fails.
    pub fn build(self) -> Result<QualityConfig, ConfigValidationError> {
        let defaults = QualityConfig::default();
        let config = QualityConfig {
            chunk_rows: self.chunk_rows.unwrap_or(defaults.chunk_rows),
            max_history_entries: self
                .max_history_entries
                .unwrap_or(defaults.max_history_entries),
            outlier_sigma: self.outlier_sigma.unwrap_or(defaults.outlier_sigma),
            outlier_min_samples: self
                .outlier_min_samples
                .unwrap_or(defaults.outlier_min_samples),
            date_serial_min: self.date_serial_min.unwrap_or(defaults.date_serial_min),
            date_serial_max: self.date_serial_max.unwrap_or(defaults.date_serial_max),
            casing_text_share: self.casing_text_share.unwrap_or(defaults.casing_text_share),
            mixed_numeric_min_share: self
                .mixed_numeric_min_share
                .unwrap_or(defaults.mixed_numeric_min_share),
            max_examples: self.max_examples.unwrap_or(defaults.max_examples),
        };

        config.validate()?;
        Ok(config)
    }
}
