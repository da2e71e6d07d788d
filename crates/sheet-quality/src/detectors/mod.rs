//! Quality detectors.
//!
//! Each detector is a pure function of a [`Snapshot`]: it reads row 1 onward
//! (row 0 is the header), emits [`Finding`]s, and never fails on malformed
//! data. The only way a detector returns an error is cancellation, observed
//! through its [`ScanContext`].
//!
//! Detectors:
//! - [`DuplicateDetector`]: repeated values within a column
//! - [`MissingValueDetector`]: empty cells
//! - [`FormatDetector`]: mixed representations and inconsistent casing
//! - [`OutlierDetector`]: numeric values far from the column mean

mod duplicates;
mod format;
mod missing;
mod outliers;

pub use duplicates::DuplicateDetector;
pub(crate) use duplicates::ValueKey;
pub use format::FormatDetector;
pub use missing::MissingValueDetector;
pub use outliers::OutlierDetector;

use crate::error::Result;
use crate::pipeline::progress::{CancellationToken, ScanStage};
use crate::snapshot::Snapshot;
use crate::types::Finding;

/// A single detection pass over a snapshot.
pub trait Detector: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Progress stage reported while this detector runs.
    fn stage(&self) -> ScanStage;

    fn detect(&self, snapshot: &Snapshot, ctx: &mut ScanContext<'_>) -> Result<Vec<Finding>>;
}

/// Cooperative checkpointing for detector loops.
///
/// Detectors call [`tick`](Self::tick) once per visited cell. For snapshots
/// taller than `chunk_rows`, every `chunk_rows`-th tick yields the thread and
/// checks the cancellation token. Smaller snapshots run straight through.
#[derive(Debug)]
pub struct ScanContext<'a> {
    token: Option<&'a CancellationToken>,
    chunk: usize,
    visited: usize,
    chunked: bool,
}

impl<'a> ScanContext<'a> {
    pub fn new(snapshot: &Snapshot, chunk_rows: usize, token: Option<&'a CancellationToken>) -> Self {
        let chunk = chunk_rows.max(1);
        Self {
            token,
            chunk,
            visited: 0,
            chunked: snapshot.row_count() > chunk,
        }
    }

    /// A context that never checkpoints.
    pub fn unbounded() -> Self {
        Self {
            token: None,
            chunk: usize::MAX,
            visited: 0,
            chunked: false,
        }
    }

    /// Record one visited cell, checkpointing at chunk boundaries.
    pub fn tick(&mut self) -> Result<()> {
        self.visited += 1;
        if self.chunked && self.visited % self.chunk == 0 {
            std::thread::yield_now();
            if let Some(token) = self.token {
                token.check()?;
            }
        }
        Ok(())
    }

    /// Check the token regardless of chunking.
    pub fn checkpoint(&self) -> Result<()> {
        match self.token {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }

    /// Cells visited so far.
    pub fn visited(&self) -> usize {
        self.visited
    }
}
