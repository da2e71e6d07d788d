use crate::snapshot::{CellAddress, CellValue, RangeAddress, RepresentationClass};
use crate::utils::format_number;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// Issues
// ============================================================================

/// How serious an issue is. Variants are declared in rank order, so the
/// derived `Ord` sorts `Error` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Sort rank: `Error` = 0, `Warning` = 1, `Info` = 2.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Error => 0,
            Self::Warning => 1,
            Self::Info => 2,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Info => "Info",
        }
    }
}

/// Category of a detected issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Duplicate,
    MissingValue,
    MixedFormat,
    InconsistentCasing,
    Outlier,
}

impl IssueKind {
    pub const ALL: [IssueKind; 5] = [
        Self::Duplicate,
        Self::MissingValue,
        Self::MixedFormat,
        Self::InconsistentCasing,
        Self::Outlier,
    ];

    /// Position of the producing detector in a scan. Mixed formats and casing
    /// come from the same detector and share a rank.
    pub fn detection_rank(&self) -> u8 {
        match self {
            Self::Duplicate => 0,
            Self::MissingValue => 1,
            Self::MixedFormat | Self::InconsistentCasing => 2,
            Self::Outlier => 3,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Duplicate => "Duplicate values",
            Self::MissingValue => "Missing values",
            Self::MixedFormat => "Mixed formats",
            Self::InconsistentCasing => "Inconsistent casing",
            Self::Outlier => "Outlier",
        }
    }
}

/// One example cell of a representation class in a mixed-format column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatExample {
    pub cell: CellAddress,
    pub class: RepresentationClass,
    pub text: String,
}

/// Kind-specific payload of an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IssueDetail {
    Duplicate {
        column_name: String,
        value: CellValue,
        count: usize,
        cells: Vec<CellAddress>,
    },
    MissingValue {
        column_name: String,
        count: usize,
        cells: Vec<CellAddress>,
    },
    MixedFormat {
        column_name: String,
        classes: Vec<RepresentationClass>,
        majority: RepresentationClass,
        examples: Vec<FormatExample>,
    },
    InconsistentCasing {
        column_name: String,
        canonical_lower: String,
        variants: Vec<String>,
        cells: Vec<CellAddress>,
    },
    Outlier {
        column_name: String,
        value: f64,
        mean: f64,
        stddev: f64,
        deviation: f64,
    },
}

impl IssueDetail {
    pub fn kind(&self) -> IssueKind {
        match self {
            Self::Duplicate { .. } => IssueKind::Duplicate,
            Self::MissingValue { .. } => IssueKind::MissingValue,
            Self::MixedFormat { .. } => IssueKind::MixedFormat,
            Self::InconsistentCasing { .. } => IssueKind::InconsistentCasing,
            Self::Outlier { .. } => IssueKind::Outlier,
        }
    }

    /// One-line human description.
    pub fn summary(&self) -> String {
        match self {
            Self::Duplicate {
                column_name,
                value,
                count,
                ..
            } => format!(
                "'{}' appears {} times in column '{}'",
                value.display_text().trim(),
                count,
                column_name
            ),
            Self::MissingValue {
                column_name, count, ..
            } => format!("{} empty cell(s) in column '{}'", count, column_name),
            Self::MixedFormat {
                column_name,
                classes,
                majority,
                ..
            } => format!(
                "Column '{}' mixes {} (mostly {})",
                column_name,
                classes
                    .iter()
                    .map(|c| c.display_name())
                    .collect::<Vec<_>>()
                    .join(" and "),
                majority.display_name()
            ),
            Self::InconsistentCasing {
                column_name,
                variants,
                ..
            } => format!(
                "Column '{}' spells the same value {} ways: {}",
                column_name,
                variants.len(),
                variants.join(", ")
            ),
            Self::Outlier {
                column_name,
                value,
                deviation,
                ..
            } => format!(
                "{} in column '{}' is {:.2} standard deviations from the mean",
                format_number(*value),
                column_name,
                deviation.abs()
            ),
        }
    }
}

/// An issue as produced by a detector, before the aggregator assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    pub affected_cells: BTreeSet<CellAddress>,
    pub detail: IssueDetail,
}

impl Finding {
    pub fn new(
        severity: Severity,
        sheet: Option<String>,
        cells: impl IntoIterator<Item = CellAddress>,
        detail: IssueDetail,
    ) -> Self {
        Self {
            severity,
            sheet,
            affected_cells: cells.into_iter().collect(),
            detail,
        }
    }

    pub fn kind(&self) -> IssueKind {
        self.detail.kind()
    }

    /// Row-major first affected cell, used as the final sort key.
    pub fn first_cell(&self) -> Option<CellAddress> {
        self.affected_cells.first().copied()
    }
}

/// A detected quality defect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub kind: IssueKind,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    pub affected_cells: BTreeSet<CellAddress>,
    pub detail: IssueDetail,
}

impl Issue {
    pub fn from_finding(id: impl Into<String>, finding: Finding) -> Self {
        Self {
            id: id.into(),
            kind: finding.kind(),
            severity: finding.severity,
            sheet: finding.sheet,
            affected_cells: finding.affected_cells,
            detail: finding.detail,
        }
    }

    pub fn first_cell(&self) -> Option<CellAddress> {
        self.affected_cells.first().copied()
    }

    pub fn summary(&self) -> String {
        self.detail.summary()
    }
}

/// Issue ids are assigned in sorted order: `issue-0001`, `issue-0002`, ...
pub fn issue_id(index: usize) -> String {
    format!("issue-{:04}", index + 1)
}

// ============================================================================
// Scan results
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn from_issues<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> Self {
        let mut counts = Self::default();
        for issue in issues {
            counts.add(issue.severity);
        }
        counts
    }

    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.error += 1,
            Severity::Warning => self.warning += 1,
            Severity::Info => self.info += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.error + self.warning + self.info
    }
}

/// Outcome of one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub address: RangeAddress,
    pub issues: Vec<Issue>,
    pub counts_by_severity: SeverityCounts,
    pub rows_scanned: usize,
    pub columns_scanned: usize,
}

impl ScanResult {
    /// True when no issue was found.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issue(&self, id: &str) -> Option<&Issue> {
        self.issues.iter().find(|i| i.id == id)
    }
}

/// Which severities to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "severity", rename_all = "snake_case")]
pub enum SeverityFilter {
    #[default]
    All,
    /// Exactly this severity.
    Only(Severity),
    /// This severity or anything more serious.
    AtLeast(Severity),
}

impl SeverityFilter {
    pub fn matches(&self, severity: Severity) -> bool {
        match self {
            Self::All => true,
            Self::Only(s) => severity == *s,
            Self::AtLeast(s) => severity.rank() <= s.rank(),
        }
    }
}

// ============================================================================
// Fix actions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    RemoveDuplicates,
    HighlightOnly,
    StandardizeFormat,
    GoToCell,
}

impl FixKind {
    /// Whether applying this action writes to the sheet.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::RemoveDuplicates | Self::StandardizeFormat)
    }

    /// Stable snake_case name used in action ids.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::RemoveDuplicates => "remove_duplicates",
            Self::HighlightOnly => "highlight_only",
            Self::StandardizeFormat => "standardize_format",
            Self::GoToCell => "go_to_cell",
        }
    }
}

/// What a standardize action converts cells to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StandardizeTarget {
    /// Convert cells to one representation class.
    Representation { class: RepresentationClass },
    /// Rewrite case variants to one spelling.
    Casing {
        canonical: String,
        canonical_lower: String,
    },
}

/// Everything needed to apply an action without looking up its issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    pub cells: Vec<CellAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<StandardizeTarget>,
}

/// A candidate correction for an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixAction {
    pub id: String,
    pub issue_id: String,
    pub kind: FixKind,
    pub label: String,
    pub requires_confirmation: bool,
    pub params: FixParams,
}

// ============================================================================
// History
// ============================================================================

/// Prior contents of a mutated range, exactly as captured before the write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoData {
    pub address: RangeAddress,
    pub values: Vec<Vec<CellValue>>,
    pub formulas: Vec<Vec<Option<String>>>,
}

/// Record of one applied mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FixKind,
    pub action_id: String,
    pub description: String,
    pub target: RangeAddress,
    pub timestamp: DateTime<Utc>,
    pub cells_changed: usize,
    pub undo_data: UndoData,
}

/// History entry ids: `fix_0001`, `fix_0002`, ...
pub fn history_entry_id(sequence: u64) -> String {
    format!("fix_{:04}", sequence)
}

/// What executing an action did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FixOutcome {
    Applied { entry: HistoryEntry },
    Highlighted { cells: usize },
    Navigated { cell: CellAddress },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        let mut severities = vec![Severity::Info, Severity::Error, Severity::Warning];
        severities.sort();
        assert_eq!(
            severities,
            vec![Severity::Error, Severity::Warning, Severity::Info]
        );
        assert!(Severity::Error.rank() < Severity::Info.rank());
    }

    #[test]
    fn test_severity_filter() {
        assert!(SeverityFilter::All.matches(Severity::Info));
        assert!(SeverityFilter::Only(Severity::Warning).matches(Severity::Warning));
        assert!(!SeverityFilter::Only(Severity::Warning).matches(Severity::Error));
        assert!(SeverityFilter::AtLeast(Severity::Warning).matches(Severity::Error));
        assert!(SeverityFilter::AtLeast(Severity::Warning).matches(Severity::Warning));
        assert!(!SeverityFilter::AtLeast(Severity::Warning).matches(Severity::Info));
    }

    #[test]
    fn test_detection_rank_shared_by_format_kinds() {
        assert_eq!(
            IssueKind::MixedFormat.detection_rank(),
            IssueKind::InconsistentCasing.detection_rank()
        );
        assert!(IssueKind::Duplicate.detection_rank() < IssueKind::Outlier.detection_rank());
    }

    #[test]
    fn test_ids() {
        assert_eq!(issue_id(0), "issue-0001");
        assert_eq!(issue_id(41), "issue-0042");
        assert_eq!(history_entry_id(7), "fix_0007");
    }

    #[test]
    fn test_finding_cells_are_ordered_and_unique() {
        let finding = Finding::new(
            Severity::Warning,
            None,
            [
                CellAddress::new(3, 0),
                CellAddress::new(1, 2),
                CellAddress::new(3, 0),
            ],
            IssueDetail::MissingValue {
                column_name: "A".into(),
                count: 2,
                cells: vec![],
            },
        );
        assert_eq!(finding.affected_cells.len(), 2);
        assert_eq!(finding.first_cell(), Some(CellAddress::new(1, 2)));
        assert_eq!(finding.kind(), IssueKind::MissingValue);
    }

    #[test]
    fn test_issue_json_shape() {
        let issue = Issue::from_finding(
            issue_id(0),
            Finding::new(
                Severity::Info,
                Some("Data".into()),
                [CellAddress::new(4, 1)],
                IssueDetail::Outlier {
                    column_name: "Score".into(),
                    value: 50.0,
                    mean: 6.36,
                    stddev: 14.47,
                    deviation: 3.02,
                },
            ),
        );
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["id"], "issue-0001");
        assert_eq!(json["kind"], "outlier");
        assert_eq!(json["severity"], "info");
        assert_eq!(json["affected_cells"][0], "B5");
        assert_eq!(json["detail"]["type"], "outlier");
        assert!(issue.summary().contains("3.02"));
    }
}
