//! Spreadsheet Data Quality Library
//!
//! Finds data quality problems in a spreadsheet range and applies fixes that
//! can be undone.
//!
//! # Overview
//!
//! - **Scanning**: duplicate values, missing values, mixed formats,
//!   inconsistent casing, and numeric outliers, reported as sorted issues
//! - **Fixes**: each issue offers fix actions; mutating actions capture the
//!   range first and are recorded in a bounded history
//! - **Undo**: the newest fix is restored exactly, values and formulas alike
//! - **Progress Reporting**: chunked reads and scans with cancellation support
//!
//! All sheet access goes through the [`SheetAdapter`] trait. [`MemorySheet`] is
//! an in-memory implementation that can be loaded from and exported to a
//! Polars `DataFrame`.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sheet_quality::{MemorySheet, QualitySession, RangeAddress, SeverityFilter};
//! use std::sync::Arc;
//!
//! let sheet = Arc::new(MemorySheet::from_dataframe("Orders", &df)?);
//! let session = QualitySession::with_defaults(sheet.clone());
//!
//! let scan = session.scan(&RangeAddress::parse("Orders!A1:F500")?, None, None)?;
//! for issue in session.filter_and_sort(&scan.issues, SeverityFilter::All) {
//!     println!("[{}] {}", issue.id, issue.summary());
//! }
//!
//! // Apply the first fix of the first issue, then take it back
//! let actions = session.resolve_fix_actions(&scan.issues[0]);
//! session.execute_fix(&actions[0])?;
//! session.perform_undo()?;
//! ```
//!
//! # Configuration
//!
//! Use [`QualityConfig`] to tune the detectors:
//!
//! ```rust,ignore
//! use sheet_quality::QualityConfig;
//!
//! let config = QualityConfig::builder()
//!     .chunk_rows(500)              // Read and check cancellation every 500 rows
//!     .outlier_sigma(2.5)           // Flag values beyond 2.5 standard deviations
//!     .max_history_entries(50)      // Keep 50 undo steps
//!     .build()?;
//! ```
//!
//! # Progress Reporting
//!
//! ```rust,ignore
//! use sheet_quality::{CancellationToken, ClosureProgressReporter, QualityError};
//!
//! let token = CancellationToken::new();
//! let reporter = ClosureProgressReporter::new(|update| {
//!     println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//! });
//!
//! match session.scan(&range, Some(&reporter), Some(&token)) {
//!     Ok(scan) => println!("{} issue(s)", scan.issues.len()),
//!     Err(QualityError::Cancelled) => println!("Cancelled"),
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod detectors;
pub mod error;
pub mod fixes;
pub mod history;
pub mod pipeline;
pub mod reporting;
pub mod session;
pub mod snapshot;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use adapter::{AdapterError, MemorySheet, RangeData, SheetAdapter};
pub use config::{ConfigValidationError, QualityConfig, QualityConfigBuilder};
pub use detectors::{
    Detector, DuplicateDetector, FormatDetector, MissingValueDetector, OutlierDetector,
    ScanContext,
};
pub use error::{ApplyError, QualityError, Result, ResultExt, UndoError};
pub use fixes::resolve_fix_actions;
pub use history::{HistoryStore, MAX_HISTORY_ENTRIES};
pub use pipeline::{
    CancellationToken, ClosureProgressReporter, ProgressReporter, ProgressUpdate, ScanStage,
    Scanner, apply_fix, filter_and_sort, perform_undo,
};
pub use reporting::{ReportGenerator, ScanReport};
pub use session::{OperationOutcome, QualitySession, SessionPhase};
pub use snapshot::{CellAddress, CellValue, RangeAddress, RepresentationClass, Snapshot};
pub use types::{
    FixAction, FixKind, FixOutcome, FixParams, HistoryEntry, Issue, IssueDetail, IssueKind,
    ScanResult, Severity, SeverityCounts, SeverityFilter, StandardizeTarget, UndoData,
};
