//! Bounded, newest-first store of applied fixes.

use crate::types::{HistoryEntry, history_entry_id};
use serde::Serialize;

/// Default number of entries kept.
pub const MAX_HISTORY_ENTRIES: usize = 20;

/// Applied fixes, newest first, holding at most `max_entries`.
///
/// Entries leave the store only through [`pop`](Self::pop) (undo), capacity
/// eviction in [`push`](Self::push), or an explicit [`clear`](Self::clear).
#[derive(Debug, Clone, Serialize)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
    max_entries: usize,
    #[serde(skip)]
    next_sequence: u64,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(MAX_HISTORY_ENTRIES)
    }
}

impl HistoryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: max_entries.max(1),
            next_sequence: 1,
        }
    }

    /// Reserve the id for the next entry (`fix_0001`, `fix_0002`, ...).
    ///
    /// Ids are never reused, even after an undo or a clear.
    pub fn next_id(&mut self) -> String {
        let id = history_entry_id(self.next_sequence);
        self.next_sequence += 1;
        id
    }

    /// Add `entry` as the newest and return the oldest entry if it no longer fits.
    pub fn push(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        self.entries.insert(0, entry);
        if self.entries.len() > self.max_entries {
            return self.entries.pop();
        }
        None
    }

    pub fn peek(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    pub fn pop(&mut self) -> Option<HistoryEntry> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.entries.remove(0))
    }

    /// Entries, newest first.
    pub fn list(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::snapshot::{CellAddress, CellValue, RangeAddress};
    use crate::types::{FixKind, HistoryEntry, UndoData};
    use chrono::Utc;

    pub fn entry(id: &str) -> HistoryEntry {
        let target = RangeAddress::single(None, CellAddress::new(1, 0));
        HistoryEntry {
            id: id.to_string(),
            kind: FixKind::RemoveDuplicates,
            action_id: format!("{}:action", id),
            description: format!("entry {}", id),
            target: target.clone(),
            timestamp: Utc::now(),
            cells_changed: 1,
            undo_data: UndoData {
                address: target,
                values: vec![vec![CellValue::text(id)]],
                formulas: vec![vec![None]],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::entry;
    use super::*;

    #[test]
    fn test_newest_first() {
        let mut store = HistoryStore::default();
        store.push(entry("a"));
        store.push(entry("b"));

        assert_eq!(store.peek().map(|e| e.id.as_str()), Some("b"));
        let ids: Vec<&str> = store.list().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);

        assert_eq!(store.pop().map(|e| e.id), Some("b".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_bounded_at_max_entries() {
        let mut store = HistoryStore::default();
        let mut evicted = Vec::new();
        for i in 1..=21 {
            if let Some(old) = store.push(entry(&format!("e{}", i))) {
                evicted.push(old.id);
            }
        }

        assert_eq!(store.len(), 20);
        assert_eq!(evicted, vec!["e1".to_string()]);
        assert_eq!(store.peek().map(|e| e.id.as_str()), Some("e21"));
        assert_eq!(store.list().last().map(|e| e.id.as_str()), Some("e2"));
    }

    #[test]
    fn test_empty_store() {
        let mut store = HistoryStore::new(3);
        assert!(store.is_empty());
        assert!(store.peek().is_none());
        assert!(store.pop().is_none());
        assert_eq!(store.max_entries(), 3);
    }

    #[test]
    fn test_ids_never_reused() {
        let mut store = HistoryStore::default();
        assert_eq!(store.next_id(), "fix_0001");
        store.clear();
        assert_eq!(store.next_id(), "fix_0002");
    }
}
