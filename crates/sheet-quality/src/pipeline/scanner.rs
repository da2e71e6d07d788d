//! Scanner: runs the detectors over a snapshot and aggregates their findings.

use crate::config::QualityConfig;
use crate::detectors::{
    Detector, DuplicateDetector, FormatDetector, MissingValueDetector, OutlierDetector,
    ScanContext,
};
use crate::error::Result;
use crate::pipeline::progress::{
    CancellationToken, ProgressReporter, ProgressUpdate, ScanStage, report,
};
use crate::snapshot::Snapshot;
use crate::types::{Finding, Issue, ScanResult, SeverityCounts, SeverityFilter, issue_id};
use std::time::Instant;
use tracing::{debug, info};

/// Runs every detector in a fixed order and turns findings into sorted,
/// numbered issues.
pub struct Scanner {
    config: QualityConfig,
    detectors: Vec<Box<dyn Detector>>,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(QualityConfig::default())
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("chunk_rows", &self.config.chunk_rows)
            .field(
                "detectors",
                &self.detectors.iter().map(|d| d.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Scanner {
    /// Scanner with the standard detectors: duplicates, missing values,
    /// formats, outliers.
    pub fn new(config: QualityConfig) -> Self {
        let detectors: Vec<Box<dyn Detector>> = vec![
            Box::new(DuplicateDetector),
            Box::new(MissingValueDetector),
            Box::new(FormatDetector::new(&config)),
            Box::new(OutlierDetector::new(&config)),
        ];
        Self::with_detectors(config, detectors)
    }

    /// Scanner running `detectors` in the given order.
    pub fn with_detectors(config: QualityConfig, detectors: Vec<Box<dyn Detector>>) -> Self {
        Self { config, detectors }
    }

    /// Scan without cancellation or progress. Never fails.
    pub fn scan(&self, snapshot: &Snapshot) -> ScanResult {
        // A token nobody else holds can't be cancelled
        let token = CancellationToken::new();
        self.scan_with(snapshot, &token, None)
            .unwrap_or_else(|_| empty_result(snapshot))
    }

    /// Scan with cooperative cancellation and per-stage progress.
    ///
    /// Returns [`QualityError::Cancelled`](crate::QualityError::Cancelled) if
    /// `token` is cancelled before or during the scan. For snapshots taller
    /// than `chunk_rows`, detectors observe the token at chunk boundaries.
    pub fn scan_with(
        &self,
        snapshot: &Snapshot,
        token: &CancellationToken,
        progress: Option<&dyn ProgressReporter>,
    ) -> Result<ScanResult> {
        let result = self.run(snapshot, token, progress);
        match &result {
            Ok(scan) => report(
                progress,
                ProgressUpdate::complete(format!("Found {} issue(s)", scan.issues.len())),
            ),
            Err(e) if e.is_cancelled() => report(progress, ProgressUpdate::cancelled()),
            Err(e) => report(progress, ProgressUpdate::failed(e.to_string())),
        }
        result
    }

    fn run(
        &self,
        snapshot: &Snapshot,
        token: &CancellationToken,
        progress: Option<&dyn ProgressReporter>,
    ) -> Result<ScanResult> {
        token.check()?;
        let start = Instant::now();

        info!(
            "Scanning {} ({} data rows x {} columns)",
            snapshot.address(),
            snapshot.data_row_count(),
            snapshot.col_count()
        );

        if snapshot.is_empty() {
            debug!("Nothing to scan in {}", snapshot.address());
            return Ok(empty_result(snapshot));
        }

        let mut ctx = ScanContext::new(snapshot, self.config.chunk_rows, Some(token));
        let mut findings: Vec<Finding> = Vec::new();

        for detector in &self.detectors {
            let stage = detector.stage();
            report(
                progress,
                ProgressUpdate::new(stage, 0.0, format!("{}...", stage.display_name())),
            );

            let found = detector.detect(snapshot, &mut ctx)?;
            ctx.checkpoint()?;
            debug!("Detector '{}' produced {} finding(s)", detector.name(), found.len());

            report(
                progress,
                ProgressUpdate::new(stage, 1.0, format!("{} finding(s)", found.len())),
            );
            findings.extend(found);
        }

        report(
            progress,
            ProgressUpdate::new(ScanStage::Aggregating, 0.0, "Sorting issues..."),
        );
        let issues = aggregate(findings);
        let counts = SeverityCounts::from_issues(&issues);

        info!(
            "Scan of {} finished in {:.2?}: {} error(s), {} warning(s), {} info",
            snapshot.address(),
            start.elapsed(),
            counts.error,
            counts.warning,
            counts.info
        );

        Ok(ScanResult {
            address: snapshot.address().clone(),
            issues,
            counts_by_severity: counts,
            rows_scanned: snapshot.data_row_count(),
            columns_scanned: snapshot.col_count(),
        })
    }
}

fn empty_result(snapshot: &Snapshot) -> ScanResult {
    ScanResult {
        address: snapshot.address().clone(),
        issues: Vec::new(),
        counts_by_severity: SeverityCounts::default(),
        rows_scanned: snapshot.data_row_count(),
        columns_scanned: snapshot.col_count(),
    }
}

/// Sort findings and number them `issue-0001`, `issue-0002`, ...
fn aggregate(mut findings: Vec<Finding>) -> Vec<Issue> {
    findings.sort_by_key(|f| (f.severity.rank(), f.kind().detection_rank(), f.first_cell()));
    findings
        .into_iter()
        .enumerate()
        .map(|(i, finding)| Issue::from_finding(issue_id(i), finding))
        .collect()
}

/// Keep the issues matching `filter`, in severity, detection and cell order.
///
/// The sort is stable, so issues that tie keep their relative order.
pub fn filter_and_sort(issues: &[Issue], filter: SeverityFilter) -> Vec<Issue> {
    let mut kept: Vec<Issue> = issues
        .iter()
        .filter(|issue| filter.matches(issue.severity))
        .cloned()
        .collect();
    kept.sort_by_key(|i| (i.severity.rank(), i.kind.detection_rank(), i.first_cell()));
    kept
}
