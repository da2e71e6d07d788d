//! Progress reporting and cancellation support for scans.
//!
//! This module provides types for tracking scan progress and supporting
//! cancellation from external threads (e.g., a UI cancel button, or a newer
//! scan superseding an older one).
//!
//! # Example
//!
//! ```rust,ignore
//! use sheet_quality::{CancellationToken, ClosureProgressReporter, Scanner};
//!
//! let token = CancellationToken::new();
//! let token_clone = token.clone();
//!
//! // In another thread
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(5));
//!     token_clone.cancel();
//! });
//!
//! let reporter = ClosureProgressReporter::new(|update| {
//!     println!("[{:?}] {}", update.stage, update.message);
//! });
//! let result = Scanner::default().scan_with(&snapshot, &token, Some(&reporter))?;
//! ```

use crate::error::{QualityError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stages of a scan.
///
/// Progress updates include both the current stage and optional sub-stage
/// information (a chunk or column) for more granular tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStage {
    /// Reading the range from the sheet
    Reading,
    /// Looking for repeated values
    DuplicateDetection,
    /// Looking for empty cells
    MissingValueDetection,
    /// Checking representation and casing consistency
    FormatDetection,
    /// Looking for numeric outliers
    OutlierDetection,
    /// Sorting issues and assigning ids
    Aggregating,
    /// Scan completed successfully
    Complete,
    /// Scan was cancelled or superseded
    Cancelled,
    /// Scan failed with an error
    Failed,
}

impl ScanStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Reading => "Reading Range",
            Self::DuplicateDetection => "Finding Duplicates",
            Self::MissingValueDetection => "Finding Missing Values",
            Self::FormatDetection => "Checking Formats",
            Self::OutlierDetection => "Finding Outliers",
            Self::Aggregating => "Aggregating Issues",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }

    /// Returns the typical weight of this stage in the overall scan (0.0 - 1.0).
    ///
    /// Reading dominates for large ranges; the detectors are single passes.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Reading => 0.40,
            Self::DuplicateDetection => 0.15,
            Self::MissingValueDetection => 0.10,
            Self::FormatDetection => 0.15,
            Self::OutlierDetection => 0.15,
            Self::Aggregating => 0.05,
            Self::Complete => 0.0,
            Self::Cancelled => 0.0,
            Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Reading => 0.0,
            Self::DuplicateDetection => 0.40,
            Self::MissingValueDetection => 0.55,
            Self::FormatDetection => 0.65,
            Self::OutlierDetection => 0.80,
            Self::Aggregating => 0.95,
            Self::Complete => 1.0,
            Self::Cancelled => 0.0,
            Self::Failed => 0.0,
        }
    }
}

/// Detailed progress update with sub-stage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current scan stage
    pub stage: ScanStage,

    /// Optional sub-stage description (e.g., "Rows 1001-2000", "Column: Age")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    /// Human-readable message describing current activity
    pub message: String,

    /// Number of items processed in current stage (rows read, columns checked)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    /// Total items in current stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    /// Creates a new progress update for a stage without sub-stage info.
    pub fn new(stage: ScanStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            sub_stage: None,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Creates a new progress update with item counts.
    pub fn with_items(
        stage: ScanStage,
        sub_stage: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            sub_stage: Some(sub_stage.into()),
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
            items_processed: Some(current),
            items_total: Some(total),
        }
    }

    /// Creates a completion progress update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: ScanStage::Complete,
            sub_stage: None,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Creates a cancelled progress update.
    pub fn cancelled() -> Self {
        Self {
            stage: ScanStage::Cancelled,
            sub_stage: None,
            progress: 0.0,
            stage_progress: 0.0,
            message: "Scan cancelled".to_string(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: ScanStage::Failed,
            sub_stage: None,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }
}

/// Trait for receiving progress updates during a scan.
///
/// Implementations must be `Send + Sync`: scans run on whichever thread the
/// host uses for background work while updates go to the UI.
pub trait ProgressReporter: Send + Sync {
    /// Called when progress is made. May be called once per chunk, so
    /// implementations should be cheap and non-blocking.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

/// Report to an optional reporter.
pub(crate) fn report(reporter: Option<&dyn ProgressReporter>, update: ProgressUpdate) {
    if let Some(r) = reporter {
        r.report(update);
    }
}

/// Token for cancelling a running scan.
///
/// This token uses an atomic boolean internally, making it safe to clone
/// and share across threads. Call [`cancel()`](Self::cancel) from any thread
/// to request cancellation.
///
/// A [`child()`](Self::child) token observes its parent: cancelling the parent
/// cancels the child, but cancelling the child leaves the parent untouched.
/// The session uses this to supersede its own scans without cancelling a
/// token the caller still holds.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    parent: Option<Box<CancellationToken>>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

// Scans run on background threads while tokens and updates are shared
static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

impl CancellationToken {
    /// Creates a new cancellation token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            parent: None,
        }
    }

    /// Creates a token that is also cancelled when `self` is.
    pub fn child(&self) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            parent: Some(Box::new(self.clone())),
        }
    }

    /// Request cancellation.
    ///
    /// This method is thread-safe and can be called from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested on this token, any of its
    /// clones, or any ancestor.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    /// Return [`QualityError::Cancelled`] if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(QualityError::Cancelled);
        }
        Ok(())
    }

    /// Reset the token for reuse.
    ///
    /// Only this token's own flag is cleared; a cancelled parent still wins.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}
