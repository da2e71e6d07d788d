//! Mutation planning: the values a fix writes, computed from a fresh capture.

use super::convert::convert_value;
use crate::detectors::ValueKey;
use crate::snapshot::{CellValue, RangeAddress};
use crate::types::{FixAction, FixKind, StandardizeTarget};
use std::collections::HashSet;

/// New contents of a captured range.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationPlan {
    pub values: Vec<Vec<CellValue>>,
    pub cells_changed: usize,
}

impl MutationPlan {
    pub fn is_noop(&self) -> bool {
        self.cells_changed == 0
    }
}

/// Plan the values `action` writes into `target`, given its current
/// `values` and `formulas`.
///
/// Only the action's own cells are touched. Cells holding a formula are
/// never rewritten, though their values still count as first occurrences
/// when removing duplicates.
pub fn plan_mutation(
    action: &FixAction,
    target: &RangeAddress,
    values: &[Vec<CellValue>],
    formulas: &[Vec<Option<String>>],
) -> MutationPlan {
    let mut planned = values.to_vec();
    let mut seen: HashSet<ValueKey> = HashSet::new();
    let mut cells_changed = 0;

    let mut cells = action.params.cells.clone();
    cells.sort();

    for cell in &cells {
        let Some((r, c)) = target.offset_of(cell) else {
            continue;
        };
        let Some(current) = values.get(r).and_then(|row| row.get(c)) else {
            continue;
        };
        let has_formula = formulas
            .get(r)
            .and_then(|row| row.get(c))
            .is_some_and(|f| f.is_some());

        let replacement = match action.kind {
            FixKind::RemoveDuplicates => match ValueKey::of(current) {
                Some(key) => (!seen.insert(key)).then_some(CellValue::Empty),
                None => None,
            },
            FixKind::StandardizeFormat => match &action.params.target {
                Some(StandardizeTarget::Casing {
                    canonical,
                    canonical_lower,
                }) => current
                    .as_text()
                    .filter(|t| {
                        t.trim().to_lowercase() == *canonical_lower && *t != canonical.as_str()
                    })
                    .map(|_| CellValue::text(canonical.as_str())),
                Some(StandardizeTarget::Representation { class }) => {
                    convert_value(current, *class)
                }
                None => None,
            },
            FixKind::HighlightOnly | FixKind::GoToCell => None,
        };

        if let Some(value) = replacement
            && !has_formula
            && value != *current
        {
            planned[r][c] = value;
            cells_changed += 1;
        }
    }

    MutationPlan {
        values: planned,
        cells_changed,
    }
}
