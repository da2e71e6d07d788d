//! Duplicate value detection.

use super::{Detector, ScanContext};
use crate::error::Result;
use crate::pipeline::progress::ScanStage;
use crate::snapshot::{CellAddress, CellValue, Snapshot};
use crate::types::{Finding, IssueDetail, Severity};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::debug;

/// Normalized comparison key. Text and numbers never compare equal, so `"1"`
/// and `1` are not duplicates of each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ValueKey {
    Text(String),
    Number(u64),
    Boolean(bool),
    Error(String),
}

impl ValueKey {
    /// Key of a non-empty value. Text is trimmed but case-sensitive.
    pub(crate) fn of(value: &CellValue) -> Option<Self> {
        if value.is_empty() {
            return None;
        }
        Some(match value {
            CellValue::Text(s) => Self::Text(s.trim().to_string()),
            // -0.0 and 0.0 are the same number
            CellValue::Number(n) if *n == 0.0 => Self::Number(0f64.to_bits()),
            CellValue::Number(n) => Self::Number(n.to_bits()),
            CellValue::Boolean(b) => Self::Boolean(*b),
            CellValue::ErrorValue(e) => Self::Error(e.clone()),
            CellValue::Empty => return None,
        })
    }
}

/// Finds values that occur more than once in a column.
///
/// One finding per repeated value, in order of first occurrence, listing
/// every row the value appears on.
#[derive(Debug, Default, Clone, Copy)]
pub struct DuplicateDetector;

impl Detector for DuplicateDetector {
    fn name(&self) -> &'static str {
        "duplicates"
    }

    fn stage(&self) -> ScanStage {
        ScanStage::DuplicateDetection
    }

    fn detect(&self, snapshot: &Snapshot, ctx: &mut ScanContext<'_>) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();

        for col in 0..snapshot.col_count() {
            let mut index: HashMap<ValueKey, usize> = HashMap::new();
            let mut groups: Vec<(CellValue, Vec<usize>)> = Vec::new();

            for (row, value) in snapshot.column(col) {
                ctx.tick()?;
                let Some(key) = ValueKey::of(value) else {
                    continue;
                };
                match index.entry(key) {
                    Entry::Occupied(slot) => groups[*slot.get()].1.push(row),
                    Entry::Vacant(slot) => {
                        slot.insert(groups.len());
                        let shown = match value {
                            CellValue::Text(s) => CellValue::text(s.trim()),
                            other => other.clone(),
                        };
                        groups.push((shown, vec![row]));
                    }
                }
            }

            let column_name = snapshot.column_name(col);
            for (value, rows) in groups.into_iter().filter(|(_, rows)| rows.len() >= 2) {
                let cells: Vec<CellAddress> =
                    rows.iter().map(|r| snapshot.cell_address(*r, col)).collect();
                debug!(
                    "Column '{}': '{}' repeated {} times",
                    column_name,
                    value,
                    cells.len()
                );
                findings.push(Finding::new(
                    Severity::Warning,
                    snapshot.sheet().map(str::to_string),
                    cells.clone(),
                    IssueDetail::Duplicate {
                        column_name: column_name.clone(),
                        value,
                        count: cells.len(),
                        cells,
                    },
                ));
            }
        }

        Ok(findings)
    }
}
