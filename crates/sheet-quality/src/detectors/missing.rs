//! Missing value detection.

use super::{Detector, ScanContext};
use crate::error::Result;
use crate::pipeline::progress::ScanStage;
use crate::snapshot::{CellAddress, Snapshot};
use crate::types::{Finding, IssueDetail, Severity};
use tracing::debug;

/// Reports every column with at least one empty data cell.
#[derive(Debug, Default, Clone, Copy)]
pub struct MissingValueDetector;

impl Detector for MissingValueDetector {
    fn name(&self) -> &'static str {
        "missing_values"
    }

    fn stage(&self) -> ScanStage {
        ScanStage::MissingValueDetection
    }

    fn detect(&self, snapshot: &Snapshot, ctx: &mut ScanContext<'_>) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();

        for col in 0..snapshot.col_count() {
            let mut cells: Vec<CellAddress> = Vec::new();
            for (row, value) in snapshot.column(col) {
                ctx.tick()?;
                if value.is_empty() {
                    cells.push(snapshot.cell_address(row, col));
                }
            }
            if cells.is_empty() {
                continue;
            }

            let column_name = snapshot.column_name(col);
            debug!("Column '{}': {} empty cells", column_name, cells.len());
            findings.push(Finding::new(
                Severity::Warning,
                snapshot.sheet().map(str::to_string),
                cells.clone(),
                IssueDetail::MissingValue {
                    column_name,
                    count: cells.len(),
                    cells,
                },
            ));
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::CellValue;
    use crate::snapshot::test_support::*;

    #[test]
    fn test_counts_empty_and_blank_cells() {
        let snapshot = column_snapshot(
            "City",
            vec![
                CellValue::text("Oslo"),
                CellValue::Empty,
                CellValue::text("Rome"),
                CellValue::text("   "),
            ],
        );
        let findings = MissingValueDetector
            .detect(&snapshot, &mut ScanContext::unbounded())
            .unwrap();

        assert_eq!(findings.len(), 1);
        match &findings[0].detail {
            IssueDetail::MissingValue {
                column_name,
                count,
                cells,
            } => {
                assert_eq!(column_name, "City");
                assert_eq!(*count, 2);
                assert_eq!(cells, &vec![CellAddress::new(2, 0), CellAddress::new(4, 0)]);
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_empty_header_is_not_missing() {
        let snapshot = column_snapshot("", texts(&["a", "b"]));
        let findings = MissingValueDetector
            .detect(&snapshot, &mut ScanContext::unbounded())
            .unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_column_name_falls_back_to_letter() {
        let rows = vec![
            vec![CellValue::text("Id"), CellValue::Empty],
            vec![CellValue::Number(1.0), CellValue::Empty],
        ];
        let snapshot = Snapshot::from_grid(None, CellAddress::new(0, 0), rows).unwrap();
        let findings = MissingValueDetector
            .detect(&snapshot, &mut ScanContext::unbounded())
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert!(matches!(
            &findings[0].detail,
            IssueDetail::MissingValue { column_name, .. } if column_name == "B"
        ));
    }
}
