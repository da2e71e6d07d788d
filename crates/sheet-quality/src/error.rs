//! Error types for the data quality engine.
//!
//! Every failure that crosses the adapter boundary is typed here. The enum is
//! closed: callers match on variants (or on [`QualityError::error_code`])
//! instead of inspecting message text.
//!
//! Errors are serializable so they can be handed to a frontend as
//! `{ "code": ..., "message": ... }`.

use crate::adapter::AdapterError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for scanning, applying fixes and undoing them.
#[derive(Error, Debug)]
pub enum QualityError {
    /// Scan was cancelled (explicitly, or superseded by a newer scan).
    #[error("Scan cancelled")]
    Cancelled,

    /// An A1-style address could not be parsed.
    #[error("Invalid range address '{0}'")]
    InvalidAddress(String),

    /// Snapshot data was not a rectangular grid matching its address.
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Reading the range to scan failed.
    #[error("Failed to read range {address}: {source}")]
    ReadFailure {
        address: String,
        #[source]
        source: AdapterError,
    },

    /// Capturing undo data before a fix failed. Nothing was mutated.
    #[error("Failed to capture undo data for {address}: {source}")]
    CaptureFailure {
        address: String,
        #[source]
        source: AdapterError,
    },

    /// Writing a fix to the sheet failed. No history entry was recorded.
    #[error("Failed to apply fix to {address}: {source}")]
    MutationFailure {
        address: String,
        #[source]
        source: AdapterError,
    },

    /// Restoring undo data failed. The history entry is retained for retry.
    #[error("Failed to restore history entry '{entry_id}': {source}")]
    RestoreFailure {
        entry_id: String,
        #[source]
        source: AdapterError,
    },

    /// Selecting or navigating to cells failed.
    #[error("Failed to navigate to cells: {source}")]
    NavigationFailure {
        #[source]
        source: AdapterError,
    },

    /// Undo was requested with no history entries.
    #[error("Nothing to undo")]
    EmptyHistory,

    /// Another apply or undo is already running in this session.
    #[error("Cannot {operation}: another fix or undo is in progress")]
    Busy { operation: String },

    /// The action only highlights or navigates; it has nothing to apply.
    #[error("Action '{action_id}' does not modify data")]
    NotMutating { action_id: String },

    /// The action would not change any cell in the current data.
    #[error("Action '{action_id}' would not change any cell")]
    NothingToApply { action_id: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

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
        source: Box<QualityError>,
    },
}

/// Error returned by the apply pipeline.
pub type ApplyError = QualityError;

/// Error returned by the undo executor.
pub type UndoError = QualityError;

impl QualityError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        QualityError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::InvalidAddress(_) => "INVALID_ADDRESS",
            Self::InvalidSnapshot(_) => "INVALID_SNAPSHOT",
            Self::ReadFailure { .. } => "READ_FAILURE",
            Self::CaptureFailure { .. } => "CAPTURE_FAILURE",
            Self::MutationFailure { .. } => "MUTATION_FAILURE",
            Self::RestoreFailure { .. } => "RESTORE_FAILURE",
            Self::NavigationFailure { .. } => "NAVIGATION_FAILURE",
            Self::EmptyHistory => "EMPTY_HISTORY",
            Self::Busy { .. } => "BUSY",
            Self::NotMutating { .. } => "NOT_MUTATING",
            Self::NothingToApply { .. } => "NOTHING_TO_APPLY",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Check if the user can simply try again (or ignore the outcome).
    ///
    /// A failed restore keeps its history entry, so retrying undo is valid.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Cancelled
            | Self::EmptyHistory
            | Self::Busy { .. }
            | Self::NothingToApply { .. }
            | Self::RestoreFailure { .. } => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

impl Serialize for QualityError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("QualityError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for quality engine operations.
pub type Result<T> = std::result::Result<T, QualityError>;

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
        self.map_err(|e| QualityError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(QualityError::Cancelled.error_code(), "CANCELLED");
        assert_eq!(QualityError::EmptyHistory.error_code(), "EMPTY_HISTORY");
        let err = QualityError::CaptureFailure {
            address: "A1:B2".to_string(),
            source: AdapterError::AccessDenied("locked".to_string()),
        };
        assert_eq!(err.error_code(), "CAPTURE_FAILURE");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(QualityError::Cancelled.is_cancelled());
        assert!(QualityError::Cancelled.with_context("scan").is_cancelled());
        assert!(!QualityError::EmptyHistory.is_cancelled());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(QualityError::EmptyHistory.is_recoverable());
        let restore = QualityError::RestoreFailure {
            entry_id: "fix_0001".to_string(),
            source: AdapterError::Backend("disk full".to_string()),
        };
        assert!(restore.is_recoverable());
        let mutation = QualityError::MutationFailure {
            address: "A1".to_string(),
            source: AdapterError::Backend("disk full".to_string()),
        };
        assert!(!mutation.is_recoverable());
    }

    #[test]
    fn test_error_serialization() {
        let error = QualityError::InvalidAddress("ZZZZ0".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("INVALID_ADDRESS"));
        assert!(json.contains("ZZZZ0"));
    }

    #[test]
    fn test_with_context() {
        let error = QualityError::EmptyHistory.with_context("Undo button");
        assert!(error.to_string().contains("Undo button"));
        assert_eq!(error.error_code(), "EMPTY_HISTORY");
    }

    #[test]
    fn test_result_ext_context() {
        let undo: Result<()> = Err(QualityError::EmptyHistory);
        let err = undo.context("Undo button").unwrap_err();
        assert_eq!(err.to_string(), "Undo button: Nothing to undo");
        assert_eq!(err.error_code(), "EMPTY_HISTORY");

        let polars: std::result::Result<(), polars::error::PolarsError> =
            Err(polars::error::PolarsError::NoData("empty".into()));
        let err = polars.context("loading orders").unwrap_err();
        assert_eq!(err.error_code(), "POLARS_ERROR");
        assert!(err.to_string().starts_with("loading orders: "));
    }
}
