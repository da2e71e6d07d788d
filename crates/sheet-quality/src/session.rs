//! Quality session: one sheet adapter, its scans, and its fix history.
//!
//! A [`QualitySession`] is shared across threads through an `Arc`. Scans may
//! be started from any thread; starting a new scan cancels the one in
//! flight. Apply and undo run inside a single critical section, and a second
//! apply or undo attempted while one is active is rejected with
//! [`QualityError::Busy`] rather than queued.
//!
//! ```text
//!            scan                       scan done
//!   Idle ───────────▶ Scanning ──────────────────▶ Reviewing { n }
//!    ▲                                                 │
//!    │  done / failed      apply_fix                   │
//!    ├────────────────── Applying { action } ◀─────────┤
//!    │                                                 │
//!    └────────────────── Undoing ◀─────────────────────┘
//!                                  perform_undo
//! ```

use crate::adapter::SheetAdapter;
use crate::config::QualityConfig;
use crate::error::{QualityError, Result};
use crate::fixes::resolve_fix_actions;
use crate::history::HistoryStore;
use crate::pipeline::progress::{CancellationToken, ProgressReporter};
use crate::pipeline::{self, Scanner, filter_and_sort};
use crate::snapshot::{RangeAddress, read_snapshot};
use crate::types::{
    FixAction, FixKind, FixOutcome, HistoryEntry, Issue, ScanResult, SeverityFilter,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// What the session is doing right now.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Scanning,
    Reviewing {
        issue_count: usize,
    },
    Applying {
        action_id: String,
    },
    Undoing,
}

/// Result of the most recent apply or undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OperationOutcome {
    Applied {
        entry_id: String,
    },
    ApplyFailed {
        action_id: String,
        error_code: String,
    },
    Reverted {
        entry_id: String,
    },
    UndoFailed {
        error_code: String,
    },
}

/// Scans, fixes and undo history for one sheet adapter.
pub struct QualitySession {
    adapter: Arc<dyn SheetAdapter>,
    config: QualityConfig,
    scanner: Scanner,
    history: Mutex<HistoryStore>,
    /// Held for the whole of an apply or undo.
    mutation_lock: Mutex<()>,
    /// Token of the newest scan.
    scan_token: Mutex<CancellationToken>,
    scan_generation: AtomicU64,
    phase: RwLock<SessionPhase>,
    last_outcome: RwLock<Option<OperationOutcome>>,
}

static_assertions::assert_impl_all!(QualitySession: Send, Sync);

impl std::fmt::Debug for QualitySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualitySession")
            .field("config", &self.config)
            .field("phase", &*self.phase.read())
            .field("history_len", &self.history.lock().len())
            .finish()
    }
}

impl QualitySession {
    /// Create a session over `adapter`. Fails if `config` is invalid.
    pub fn new(adapter: Arc<dyn SheetAdapter>, config: QualityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(adapter, config))
    }

    /// Session with the default configuration.
    pub fn with_defaults(adapter: Arc<dyn SheetAdapter>) -> Self {
        Self::build(adapter, QualityConfig::default())
    }

    fn build(adapter: Arc<dyn SheetAdapter>, config: QualityConfig) -> Self {
        Self {
            adapter,
            history: Mutex::new(HistoryStore::new(config.max_history_entries)),
            scanner: Scanner::new(config.clone()),
            config,
            mutation_lock: Mutex::new(()),
            scan_token: Mutex::new(CancellationToken::new()),
            scan_generation: AtomicU64::new(0),
            phase: RwLock::new(SessionPhase::Idle),
            last_outcome: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    pub fn adapter(&self) -> &Arc<dyn SheetAdapter> {
        &self.adapter
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase.read().clone()
    }

    pub fn last_outcome(&self) -> Option<OperationOutcome> {
        self.last_outcome.read().clone()
    }

    // ========================================================================
    // Scanning
    // ========================================================================

    /// Read `range` and scan it.
    ///
    /// Any scan still running on this session is cancelled first. When
    /// `token` is given, cancelling it also cancels this scan; a newer scan
    /// never cancels the caller's token itself. A scan that is cancelled or
    /// superseded returns [`QualityError::Cancelled`].
    pub fn scan(
        &self,
        range: &RangeAddress,
        progress: Option<&dyn ProgressReporter>,
        token: Option<&CancellationToken>,
    ) -> Result<ScanResult> {
        let (token, generation) = {
            let mut current = self.scan_token.lock();
            current.cancel();
            let fresh = token.map_or_else(CancellationToken::new, CancellationToken::child);
            *current = fresh.clone();
            (fresh, self.scan_generation.fetch_add(1, Ordering::SeqCst) + 1)
        };
        self.set_phase_unless_mutating(SessionPhase::Scanning);

        let result = read_snapshot(
            self.adapter.as_ref(),
            range,
            self.config.chunk_rows,
            progress,
            Some(&token),
        )
        .and_then(|snapshot| self.scanner.scan_with(&snapshot, &token, progress))
        // a scan that finished just as a newer one started is still stale
        .and_then(|scan| token.check().map(|_| scan));

        let next = match &result {
            Ok(scan) => SessionPhase::Reviewing {
                issue_count: scan.issues.len(),
            },
            Err(e) if e.is_cancelled() => {
                debug!("Scan of {} cancelled", range);
                SessionPhase::Idle
            }
            Err(e) => {
                warn!("Scan of {} failed: {}", range, e);
                SessionPhase::Idle
            }
        };
        if !self.finish_scan_phase(generation, next) {
            debug!("Scan of {} was superseded, phase left to the newer scan", range);
        }
        result
    }

    /// Cancel the scan in flight, if any.
    pub fn cancel_scan(&self) {
        self.scan_token.lock().cancel();
    }

    pub fn filter_and_sort(&self, issues: &[Issue], filter: SeverityFilter) -> Vec<Issue> {
        filter_and_sort(issues, filter)
    }

    pub fn resolve_fix_actions(&self, issue: &Issue) -> Vec<FixAction> {
        resolve_fix_actions(issue)
    }

    // ========================================================================
    // Apply / undo
    // ========================================================================

    /// Apply a mutating action. See [`pipeline::apply_fix`] for the steps.
    pub fn apply_fix(&self, action: &FixAction) -> Result<HistoryEntry> {
        if !action.kind.is_mutating() {
            return Err(QualityError::NotMutating {
                action_id: action.id.clone(),
            });
        }
        let _guard = self.mutation_lock.try_lock().ok_or_else(|| QualityError::Busy {
            operation: "apply fix".to_string(),
        })?;

        *self.phase.write() = SessionPhase::Applying {
            action_id: action.id.clone(),
        };
        let result = pipeline::apply_fix(self.adapter.as_ref(), &mut self.history.lock(), action);
        *self.phase.write() = SessionPhase::Idle;

        *self.last_outcome.write() = Some(match &result {
            Ok(entry) => OperationOutcome::Applied {
                entry_id: entry.id.clone(),
            },
            Err(e) => OperationOutcome::ApplyFailed {
                action_id: action.id.clone(),
                error_code: e.error_code().to_string(),
            },
        });
        result
    }

    /// Execute any action: mutating actions are applied, highlight selects
    /// the cells, go-to navigates to the first of them.
    pub fn execute_fix(&self, action: &FixAction) -> Result<FixOutcome> {
        let sheet = action.params.sheet.as_deref();
        match action.kind {
            FixKind::RemoveDuplicates | FixKind::StandardizeFormat => {
                self.apply_fix(action).map(|entry| FixOutcome::Applied { entry })
            }
            FixKind::HighlightOnly => {
                self.adapter
                    .select_cells(sheet, &action.params.cells)
                    .map_err(|source| QualityError::NavigationFailure { source })?;
                info!("Highlighted {} cell(s) for '{}'", action.params.cells.len(), action.id);
                Ok(FixOutcome::Highlighted {
                    cells: action.params.cells.len(),
                })
            }
            FixKind::GoToCell => {
                let Some(cell) = action.params.cells.iter().min().copied() else {
                    return Err(QualityError::NothingToApply {
                        action_id: action.id.clone(),
                    });
                };
                self.adapter
                    .navigate_to(sheet, cell)
                    .map_err(|source| QualityError::NavigationFailure { source })?;
                info!("Navigated to {} for '{}'", cell, action.id);
                Ok(FixOutcome::Navigated { cell })
            }
        }
    }

    /// Undo the most recent fix.
    pub fn perform_undo(&self) -> Result<HistoryEntry> {
        let _guard = self.mutation_lock.try_lock().ok_or_else(|| QualityError::Busy {
            operation: "undo".to_string(),
        })?;

        *self.phase.write() = SessionPhase::Undoing;
        let result = pipeline::perform_undo(self.adapter.as_ref(), &mut self.history.lock());
        *self.phase.write() = SessionPhase::Idle;

        *self.last_outcome.write() = Some(match &result {
            Ok(entry) => OperationOutcome::Reverted {
                entry_id: entry.id.clone(),
            },
            Err(e) => OperationOutcome::UndoFailed {
                error_code: e.error_code().to_string(),
            },
        });
        result
    }

    /// History entries, newest first.
    pub fn get_history(&self) -> Vec<HistoryEntry> {
        self.history.lock().list().to_vec()
    }

    pub fn can_undo(&self) -> bool {
        !self.history.lock().is_empty()
    }

    pub fn clear_history(&self) -> Result<()> {
        let _guard = self.mutation_lock.try_lock().ok_or_else(|| QualityError::Busy {
            operation: "clear history".to_string(),
        })?;
        self.history.lock().clear();
        info!("History cleared");
        Ok(())
    }

    /// Move the phase on at the end of scan `generation`, unless a newer scan
    /// has started since. Returns whether the phase was updated.
    fn finish_scan_phase(&self, generation: u64, next: SessionPhase) -> bool {
        let mut phase = self.phase.write();
        // checked under the phase lock so a newer scan's `Scanning` always lands last
        if self.scan_generation.load(Ordering::SeqCst) != generation
            || matches!(*phase, SessionPhase::Applying { .. } | SessionPhase::Undoing)
        {
            return false;
        }
        *phase = next;
        true
    }

    fn set_phase_unless_mutating(&self, next: SessionPhase) {
        let mut phase = self.phase.write();
        if !matches!(*phase, SessionPhase::Applying { .. } | SessionPhase::Undoing) {
            *phase = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemorySheet;
    use crate::snapshot::{CellAddress, CellValue};
    use crate::types::IssueKind;
    use pretty_assertions::assert_eq;

    fn session() -> (Arc<MemorySheet>, QualitySession) {
        let sheet = Arc::new(MemorySheet::with_sheet(
            "Data",
            vec![
                vec![CellValue::text("Code"), CellValue::text("City")],
                vec![CellValue::text("X"), CellValue::text("Oslo")],
                vec![CellValue::text("Y"), CellValue::Empty],
                vec![CellValue::text("X"), CellValue::text("Rome")],
            ],
        ));
        let session = QualitySession::with_defaults(sheet.clone());
        (sheet, session)
    }

    fn range() -> RangeAddress {
        RangeAddress::parse("Data!A1:B4").unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = QualityConfig {
            chunk_rows: 0,
            ..QualityConfig::default()
        };
        let result = QualitySession::new(Arc::new(MemorySheet::new()), config);
        assert!(matches!(result, Err(QualityError::InvalidConfig(_))));
    }

    #[test]
    fn test_scan_moves_to_reviewing() {
        let (_, session) = session();
        assert_eq!(session.phase(), SessionPhase::Idle);
        let scan = session.scan(&range(), None, None).unwrap();
        assert_eq!(
            session.phase(),
            SessionPhase::Reviewing {
                issue_count: scan.issues.len()
            }
        );
        assert_eq!(scan.issues[0].kind, IssueKind::Duplicate);
    }

    #[test]
    fn test_callers_token_cancels_scan() {
        let (_, session) = session();
        let token = CancellationToken::new();
        token.cancel();
        let result = session.scan(&range(), None, Some(&token));
        assert!(matches!(result, Err(QualityError::Cancelled)));
        assert_eq!(session.phase(), SessionPhase::Idle);

        // a later scan is unaffected by the caller's old token
        assert!(session.scan(&range(), None, None).is_ok());
    }

    #[test]
    fn test_stale_scan_leaves_phase_alone() {
        let (_, session) = session();
        session.scan(&range(), None, None).unwrap();
        let finished = session.scan_generation.load(Ordering::SeqCst);

        // a newer scan starts before the older one records its result
        session.scan_generation.fetch_add(1, Ordering::SeqCst);
        *session.phase.write() = SessionPhase::Scanning;

        assert!(!session.finish_scan_phase(finished, SessionPhase::Reviewing { issue_count: 2 }));
        assert_eq!(session.phase(), SessionPhase::Scanning);
        assert!(session.finish_scan_phase(finished + 1, SessionPhase::Idle));
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_apply_then_undo() {
        let (sheet, session) = session();
        let scan = session.scan(&range(), None, None).unwrap();
        let actions = session.resolve_fix_actions(&scan.issues[0]);

        let outcome = session.execute_fix(&actions[0]).unwrap();
        let FixOutcome::Applied { entry } = outcome else {
            panic!("expected an applied fix, got {:?}", outcome);
        };
        assert_eq!(
            sheet.value(Some("Data"), CellAddress::new(3, 0)),
            Some(CellValue::Empty)
        );
        assert!(session.can_undo());
        assert_eq!(
            session.last_outcome(),
            Some(OperationOutcome::Applied {
                entry_id: entry.id.clone()
            })
        );
        assert_eq!(session.phase(), SessionPhase::Idle);

        let undone = session.perform_undo().unwrap();
        assert_eq!(undone.id, entry.id);
        assert_eq!(
            sheet.value(Some("Data"), CellAddress::new(3, 0)),
            Some(CellValue::text("X"))
        );
        assert!(!session.can_undo());
        assert!(matches!(session.perform_undo(), Err(QualityError::EmptyHistory)));
        assert_eq!(
            session.last_outcome(),
            Some(OperationOutcome::UndoFailed {
                error_code: "EMPTY_HISTORY".to_string()
            })
        );
    }

    #[test]
    fn test_busy_while_mutation_active() {
        let (_, session) = session();
        let scan = session.scan(&range(), None, None).unwrap();
        let actions = session.resolve_fix_actions(&scan.issues[0]);

        let held = session.mutation_lock.lock();
        assert!(matches!(
            session.apply_fix(&actions[0]),
            Err(QualityError::Busy { .. })
        ));
        assert!(matches!(session.perform_undo(), Err(QualityError::Busy { .. })));
        drop(held);

        assert!(session.apply_fix(&actions[0]).is_ok());
    }

    #[test]
    fn test_highlight_and_go_to() {
        let (sheet, session) = session();
        let scan = session.scan(&range(), None, None).unwrap();

        let duplicate = session.resolve_fix_actions(&scan.issues[0]);
        let outcome = session.execute_fix(&duplicate[1]).unwrap();
        assert_eq!(outcome, FixOutcome::Highlighted { cells: 2 });
        assert_eq!(
            sheet.last_selection().map(|(_, cells)| cells.len()),
            Some(2)
        );

        let missing = scan
            .issues
            .iter()
            .find(|i| i.kind == IssueKind::MissingValue)
            .unwrap();
        let go_to = session.resolve_fix_actions(missing);
        let outcome = session.execute_fix(&go_to[0]).unwrap();
        assert_eq!(
            outcome,
            FixOutcome::Navigated {
                cell: CellAddress::new(2, 1)
            }
        );
        assert!(!session.can_undo());
    }
}
