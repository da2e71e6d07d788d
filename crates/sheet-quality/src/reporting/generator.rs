use crate::error::Result;
use crate::snapshot::RangeAddress;
use crate::types::{HistoryEntry, Issue, IssueKind, ScanResult, SeverityCounts};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

// ============================================================================
// Report Types
// ============================================================================

/// Number of issues of one kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindCount {
    pub kind: IssueKind,
    pub count: usize,
}

/// Serializable summary of one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// When the report was built
    pub generated_at: DateTime<Utc>,
    /// Where the data came from (file path, workbook name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Range that was scanned
    pub address: RangeAddress,
    pub rows_scanned: usize,
    pub columns_scanned: usize,
    pub counts_by_severity: SeverityCounts,
    /// Non-zero counts only, in detection order
    pub counts_by_kind: Vec<KindCount>,
    pub issues: Vec<Issue>,
    /// Fixes applied after the scan, newest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied_fixes: Vec<HistoryEntry>,
}

impl ScanReport {
    pub fn from_scan(scan: &ScanResult, source: Option<&str>) -> Self {
        let counts_by_kind = IssueKind::ALL
            .iter()
            .map(|kind| KindCount {
                kind: *kind,
                count: scan.issues.iter().filter(|i| i.kind == *kind).count(),
            })
            .filter(|c| c.count > 0)
            .collect();

        Self {
            generated_at: Utc::now(),
            source: source.map(str::to_string),
            address: scan.address.clone(),
            rows_scanned: scan.rows_scanned,
            columns_scanned: scan.columns_scanned,
            counts_by_severity: scan.counts_by_severity,
            counts_by_kind,
            issues: scan.issues.clone(),
            applied_fixes: Vec::new(),
        }
    }

    pub fn with_applied_fixes(mut self, entries: Vec<HistoryEntry>) -> Self {
        self.applied_fixes = entries;
        self
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Plain-text rendering for terminals.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Scanned {} ({} rows x {} columns)",
            self.address, self.rows_scanned, self.columns_scanned
        );

        if self.is_clean() {
            let _ = writeln!(out, "No issues found. Data quality is good.");
            return out;
        }

        let counts = &self.counts_by_severity;
        let _ = writeln!(
            out,
            "{} issue(s): {} error(s), {} warning(s), {} info",
            counts.total(),
            counts.error,
            counts.warning,
            counts.info
        );
        for issue in &self.issues {
            let cells = match (issue.affected_cells.first(), issue.affected_cells.len()) {
                (Some(first), 1) => first.to_string(),
                (Some(first), n) => format!("{} +{}", first, n - 1),
                (None, _) => String::from("-"),
            };
            let _ = writeln!(
                out,
                "  [{}] {:<8} {:<12} {}",
                issue.id,
                issue.severity.display_name(),
                cells,
                issue.summary()
            );
        }

        for entry in &self.applied_fixes {
            let _ = writeln!(
                out,
                "Applied {}: {} ({} cell(s) changed)",
                entry.id, entry.description, entry.cells_changed
            );
        }
        out
    }
}

// ============================================================================
// Report Generator
// ============================================================================

/// Writes reports to an output directory.
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new(PathBuf::from("."))
    }
}

impl ReportGenerator {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `report` as `<base_name>_report.json` and return the path.
    pub fn write_report_to_file(&self, report: &ScanReport, base_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self.output_dir.join(format!("{}_report.json", base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());
        Ok(report_path)
    }

    /// Read a report written by [`write_report_to_file`](Self::write_report_to_file).
    pub fn read_report(path: &Path) -> Result<ScanReport> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Scanner;
    use crate::snapshot::test_support::*;
    use pretty_assertions::assert_eq;

    fn report() -> ScanReport {
        let snapshot = column_snapshot("Code", texts(&["X", "Y", "X", ""]));
        ScanReport::from_scan(&Scanner::default().scan(&snapshot), Some("codes.csv"))
    }

    #[test]
    fn test_counts_by_kind() {
        let report = report();
        assert_eq!(
            report.counts_by_kind,
            vec![
                KindCount {
                    kind: IssueKind::Duplicate,
                    count: 1
                },
                KindCount {
                    kind: IssueKind::MissingValue,
                    count: 1
                },
            ]
        );
        assert_eq!(report.counts_by_severity.warning, 2);
    }

    #[test]
    fn test_render_text() {
        let text = report().render_text();
        assert!(text.contains("Scanned A1:A5 (4 rows x 1 columns)"));
        assert!(text.contains("[issue-0001] Warning"));
        assert!(text.contains("'X' appears 2 times in column 'Code'"));

        let clean = ScanReport::from_scan(
            &Scanner::default().scan(&column_snapshot("Code", texts(&["A", "B"]))),
            None,
        );
        assert!(clean.render_text().contains("Data quality is good"));
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = std::env::temp_dir().join(format!("sheet-quality-report-{}", std::process::id()));
        let generator = ReportGenerator::new(dir.clone());
        let report = report();

        let path = generator.write_report_to_file(&report, "codes").unwrap();
        assert!(path.ends_with("codes_report.json"));
        assert_eq!(ReportGenerator::read_report(&path).unwrap(), report);

        let _ = fs::remove_dir_all(dir);
    }
}
