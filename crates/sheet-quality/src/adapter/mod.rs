//! Spreadsheet access boundary.
//!
//! The engine never touches a workbook directly. Everything it reads or writes
//! goes through a [`SheetAdapter`], so the same detectors and apply/undo
//! pipeline run against a live host application or the in-memory
//! [`MemorySheet`] used by the CLI and the tests.

mod frame;
mod memory;

pub use frame::{dataframe_from_grid, grid_from_dataframe};
pub use memory::{DEFAULT_SHEET, MAX_COLS, MAX_ROWS, MemorySheet};

use crate::snapshot::{CellAddress, CellValue, RangeAddress};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Values and formulas of a range, row-major.
///
/// `formulas[r][c]` is `None` for a cell holding a literal value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RangeData {
    pub values: Vec<Vec<CellValue>>,
    pub formulas: Vec<Vec<Option<String>>>,
}

impl RangeData {
    /// Literal values with no formulas.
    pub fn from_values(values: Vec<Vec<CellValue>>) -> Self {
        let formulas = values.iter().map(|row| vec![None; row.len()]).collect();
        Self { values, formulas }
    }

    pub fn row_count(&self) -> usize {
        self.values.len()
    }

    pub fn col_count(&self) -> usize {
        self.values.first().map_or(0, Vec::len)
    }

    /// True when both grids are `rows x cols`.
    pub fn has_shape(&self, rows: usize, cols: usize) -> bool {
        self.values.len() == rows
            && self.formulas.len() == rows
            && self.values.iter().all(|r| r.len() == cols)
            && self.formulas.iter().all(|r| r.len() == cols)
    }
}

/// Typed failures reported by an adapter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("Sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("Range {0} is out of bounds")]
    OutOfBounds(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Expected a {expected_rows}x{expected_cols} grid, got {rows}x{cols}")]
    ShapeMismatch {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Access to a host spreadsheet.
///
/// Implementations must be `Send + Sync`: a session shares its adapter with
/// whichever thread runs a scan or a fix.
pub trait SheetAdapter: Send + Sync {
    /// Read values and formulas of `address`. The grid must match the range's shape.
    fn read_range(&self, address: &RangeAddress) -> Result<RangeData, AdapterError>;

    /// Write values, and formulas when given, over `address`.
    ///
    /// With `formulas: None` any existing formulas in the range are dropped.
    fn write_range(
        &self,
        address: &RangeAddress,
        values: &[Vec<CellValue>],
        formulas: Option<&[Vec<Option<String>>]>,
    ) -> Result<(), AdapterError>;

    /// Highlight a set of cells.
    fn select_cells(&self, sheet: Option<&str>, cells: &[CellAddress]) -> Result<(), AdapterError>;

    /// Move the user's view to a cell.
    fn navigate_to(&self, sheet: Option<&str>, cell: CellAddress) -> Result<(), AdapterError>;
}

/// Check a write payload against the target range.
pub(crate) fn check_write_shape(
    address: &RangeAddress,
    values: &[Vec<CellValue>],
    formulas: Option<&[Vec<Option<String>>]>,
) -> Result<(), AdapterError> {
    let (rows, cols) = (address.row_count(), address.col_count());
    let mismatch = |r: usize, c: usize| AdapterError::ShapeMismatch {
        expected_rows: rows,
        expected_cols: cols,
        rows: r,
        cols: c,
    };

    let value_cols = values.first().map_or(0, Vec::len);
    if values.len() != rows || values.iter().any(|r| r.len() != cols) {
        return Err(mismatch(values.len(), value_cols));
    }
    if let Some(formulas) = formulas {
        let formula_cols = formulas.first().map_or(0, Vec::len);
        if formulas.len() != rows || formulas.iter().any(|r| r.len() != cols) {
            return Err(mismatch(formulas.len(), formula_cols));
        }
    }
    Ok(())
}
