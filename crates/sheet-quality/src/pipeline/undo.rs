//! Undo executor.

use crate::adapter::SheetAdapter;
use crate::error::{QualityError, UndoError};
use crate::history::HistoryStore;
use crate::types::HistoryEntry;
use tracing::{info, warn};

/// Restore the newest history entry and remove it from `history`.
///
/// The captured values and formulas are written back exactly. If the write
/// fails the entry stays in the store so the undo can be retried.
pub fn perform_undo(
    adapter: &dyn SheetAdapter,
    history: &mut HistoryStore,
) -> std::result::Result<HistoryEntry, UndoError> {
    let Some(entry) = history.peek() else {
        return Err(QualityError::EmptyHistory);
    };

    let undo = &entry.undo_data;
    info!("Undoing {} ({})", entry.id, entry.description);

    if let Err(source) =
        adapter.write_range(&undo.address, &undo.values, Some(undo.formulas.as_slice()))
    {
        warn!("Undo of {} failed, entry kept: {}", entry.id, source);
        return Err(QualityError::RestoreFailure {
            entry_id: entry.id.clone(),
            source,
        });
    }

    let entry = history.pop().ok_or(QualityError::EmptyHistory)?;
    info!("Restored {} to its state before {}", entry.target, entry.id);
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemorySheet;
    use crate::history::test_support::entry;
    use crate::snapshot::{CellAddress, CellValue};

    #[test]
    fn test_empty_history() {
        let adapter = MemorySheet::new();
        let mut history = HistoryStore::default();
        assert!(matches!(
            perform_undo(&adapter, &mut history),
            Err(QualityError::EmptyHistory)
        ));
    }

    #[test]
    fn test_restores_and_pops() {
        let adapter = MemorySheet::new();
        let mut history = HistoryStore::default();
        history.push(entry("fix_0001"));
        history.push(entry("fix_0002"));

        let undone = perform_undo(&adapter, &mut history).unwrap();
        assert_eq!(undone.id, "fix_0002");
        assert_eq!(history.len(), 1);
        assert_eq!(
            adapter.value(None, CellAddress::new(1, 0)),
            Some(CellValue::text("fix_0002"))
        );
    }

    #[test]
    fn test_failed_restore_keeps_entry() {
        let adapter = MemorySheet::new();
        adapter.set_protected(None, true).unwrap();
        let mut history = HistoryStore::default();
        history.push(entry("fix_0001"));

        match perform_undo(&adapter, &mut history) {
            Err(QualityError::RestoreFailure { entry_id, .. }) => assert_eq!(entry_id, "fix_0001"),
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(history.len(), 1);
        assert_eq!(history.peek().map(|e| e.id.as_str()), Some("fix_0001"));
    }
}
