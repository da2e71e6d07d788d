//! Scan and fix pipeline.
//!
//! - [`Scanner`] runs the detectors over a snapshot
//! - [`apply_fix`] captures, mutates and records one fix action
//! - [`perform_undo`] restores the most recent history entry

mod apply;
pub mod progress;
mod scanner;
mod undo;

pub use apply::apply_fix;
pub use progress::{
    CancellationToken, ClosureProgressReporter, ProgressReporter, ProgressUpdate, ScanStage,
};
pub use scanner::{Scanner, filter_and_sort};
pub use undo::perform_undo;
