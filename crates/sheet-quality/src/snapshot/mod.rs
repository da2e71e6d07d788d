//! Snapshot model.
//!
//! A [`Snapshot`] is an immutable read of a range's values and formulas at one
//! point in time. Row 0 of every snapshot is the header row; detectors only
//! look at rows `1..row_count`.

mod address;
pub mod classify;
mod reader;
mod value;

pub use address::{CellAddress, RangeAddress};
pub use classify::{ClassifiedCell, RepresentationClass, classify_column, classify_value};
pub use reader::read_snapshot;
pub use value::CellValue;

use crate::adapter::RangeData;
use crate::error::{QualityError, Result};
use crate::utils::column_letters;

/// Immutable typed read of a rectangular range.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    address: RangeAddress,
    row_count: usize,
    col_count: usize,
    values: Vec<Vec<CellValue>>,
    formulas: Vec<Vec<Option<String>>>,
}

impl Snapshot {
    /// Build a snapshot, checking that the grids are rectangular and match `address`.
    ///
    /// A snapshot with zero rows is valid for any address.
    pub fn new(
        address: RangeAddress,
        values: Vec<Vec<CellValue>>,
        formulas: Vec<Vec<Option<String>>>,
    ) -> Result<Self> {
        let row_count = values.len();
        let col_count = values.first().map_or(0, Vec::len);

        if values.iter().any(|row| row.len() != col_count) {
            return Err(QualityError::InvalidSnapshot(format!(
                "ragged value grid for {}",
                address
            )));
        }
        if formulas.len() != row_count || formulas.iter().any(|row| row.len() != col_count) {
            return Err(QualityError::InvalidSnapshot(format!(
                "formula grid does not match value grid for {}",
                address
            )));
        }
        if row_count > 0 && (row_count != address.row_count() || col_count != address.col_count())
        {
            return Err(QualityError::InvalidSnapshot(format!(
                "{}x{} grid does not fit {} ({}x{})",
                row_count,
                col_count,
                address,
                address.row_count(),
                address.col_count()
            )));
        }

        Ok(Self {
            address,
            row_count,
            col_count,
            values,
            formulas,
        })
    }

    /// Build a snapshot from adapter data.
    pub fn from_range_data(address: RangeAddress, data: RangeData) -> Result<Self> {
        Self::new(address, data.values, data.formulas)
    }

    /// Build a formula-free snapshot whose top-left cell is `origin`.
    pub fn from_grid(
        sheet: Option<String>,
        origin: CellAddress,
        values: Vec<Vec<CellValue>>,
    ) -> Result<Self> {
        let rows = values.len();
        let cols = values.first().map_or(0, Vec::len);
        let end = CellAddress::new(
            origin.row + rows.saturating_sub(1),
            origin.col + cols.saturating_sub(1),
        );
        let formulas = values.iter().map(|row| vec![None; row.len()]).collect();
        Self::new(RangeAddress::new(sheet, origin, end), values, formulas)
    }

    pub fn address(&self) -> &RangeAddress {
        &self.address
    }

    pub fn sheet(&self) -> Option<&str> {
        self.address.sheet.as_deref()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn col_count(&self) -> usize {
        self.col_count
    }

    /// Number of rows below the header.
    pub fn data_row_count(&self) -> usize {
        self.row_count.saturating_sub(1)
    }

    /// True when there is no data to scan (no columns, or only a header row).
    pub fn is_empty(&self) -> bool {
        self.col_count == 0 || self.data_row_count() == 0
    }

    pub fn value(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.values.get(row)?.get(col)
    }

    /// Formula behind a snapshot-relative cell, if any.
    pub fn formula(&self, row: usize, col: usize) -> Option<&str> {
        self.formulas.get(row)?.get(col)?.as_deref()
    }

    /// Absolute sheet address of a snapshot-relative cell.
    pub fn cell_address(&self, row: usize, col: usize) -> CellAddress {
        self.address.cell_at(row, col)
    }

    /// Header text of a column, or its letter when the header is blank.
    pub fn column_name(&self, col: usize) -> String {
        match self.value(0, col) {
            Some(v) if !v.is_empty() => v.display_text().trim().to_string(),
            _ => column_letters(self.address.start.col + col),
        }
    }

    /// Data cells of one column as `(row, value)`, header excluded.
    pub fn column(&self, col: usize) -> impl Iterator<Item = (usize, &CellValue)> + '_ {
        self.values
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(move |(row, cells)| cells.get(col).map(|v| (row, v)))
    }
}
