//! Apply pipeline: capture, mutate, record.

use crate::adapter::{AdapterError, RangeData, SheetAdapter};
use crate::error::{ApplyError, QualityError};
use crate::fixes::plan_mutation;
use crate::history::HistoryStore;
use crate::snapshot::RangeAddress;
use crate::types::{FixAction, HistoryEntry, UndoData};
use chrono::Utc;
use tracing::{debug, info, warn};

/// Capture the target range exactly as it is now.
fn capture(
    adapter: &dyn SheetAdapter,
    target: &RangeAddress,
) -> std::result::Result<RangeData, ApplyError> {
    let failure = |source| QualityError::CaptureFailure {
        address: target.to_string(),
        source,
    };
    let data = adapter.read_range(target).map_err(failure)?;
    let (rows, cols) = (target.row_count(), target.col_count());
    if !data.has_shape(rows, cols) {
        return Err(failure(AdapterError::ShapeMismatch {
            expected_rows: rows,
            expected_cols: cols,
            rows: data.row_count(),
            cols: data.col_count(),
        }));
    }
    Ok(data)
}

/// Apply a mutating fix action and record it in `history`.
///
/// The steps run in order and stop at the first failure:
///
/// 1. The target is the smallest range covering the action's cells.
/// 2. The target is captured. On failure nothing has been written
///    ([`QualityError::CaptureFailure`]).
/// 3. New values are planned from the capture. If no cell would change the
///    action is rejected with [`QualityError::NothingToApply`]. Otherwise the
///    planned values are written along with the captured formulas
///    ([`QualityError::MutationFailure`] on error).
/// 4. A [`HistoryEntry`] holding the capture is pushed onto `history`.
///
/// No history entry exists for an action that failed at any step.
pub fn apply_fix(
    adapter: &dyn SheetAdapter,
    history: &mut HistoryStore,
    action: &FixAction,
) -> std::result::Result<HistoryEntry, ApplyError> {
    if !action.kind.is_mutating() {
        return Err(QualityError::NotMutating {
            action_id: action.id.clone(),
        });
    }

    let Some(target) = RangeAddress::bounding(action.params.sheet.clone(), &action.params.cells)
    else {
        return Err(QualityError::NothingToApply {
            action_id: action.id.clone(),
        });
    };

    info!("Applying '{}' to {}", action.id, target);

    let captured = capture(adapter, &target).inspect_err(|e| {
        warn!("Capture failed for '{}': {}", action.id, e);
    })?;

    let plan = plan_mutation(action, &target, &captured.values, &captured.formulas);
    if plan.is_noop() {
        debug!("'{}' would not change {}", action.id, target);
        return Err(QualityError::NothingToApply {
            action_id: action.id.clone(),
        });
    }

    adapter
        .write_range(&target, &plan.values, Some(captured.formulas.as_slice()))
        .map_err(|source| {
            warn!("Write failed for '{}': {}", action.id, source);
            QualityError::MutationFailure {
                address: target.to_string(),
                source,
            }
        })?;

    let entry = HistoryEntry {
        id: history.next_id(),
        kind: action.kind,
        action_id: action.id.clone(),
        description: format!("{} ({})", action.label, target),
        target: target.clone(),
        timestamp: Utc::now(),
        cells_changed: plan.cells_changed,
        undo_data: UndoData {
            address: target,
            values: captured.values,
            formulas: captured.formulas,
        },
    };

    if let Some(evicted) = history.push(entry.clone()) {
        debug!("History full, dropped '{}'", evicted.id);
    }
    info!(
        "Applied '{}' as {}: {} cell(s) changed",
        entry.action_id, entry.id, entry.cells_changed
    );
    Ok(entry)
}
