//! In-memory [`SheetAdapter`] implementation.

use super::{AdapterError, RangeData, SheetAdapter, check_write_shape};
use crate::snapshot::{CellAddress, CellValue, RangeAddress};
use parking_lot::RwLock;

/// Row limit of a worksheet (matches common desktop spreadsheet limits).
pub const MAX_ROWS: usize = 1_048_576;
/// Column limit of a worksheet (`XFD`).
pub const MAX_COLS: usize = 16_384;

pub const DEFAULT_SHEET: &str = "Sheet1";

#[derive(Debug, Clone, Default, PartialEq)]
struct Cell {
    value: CellValue,
    formula: Option<String>,
}

#[derive(Debug, Default)]
struct Sheet {
    rows: Vec<Vec<Cell>>,
    protected: bool,
}

impl Sheet {
    fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row)?.get(col)
    }

    fn cell_mut(&mut self, row: usize, col: usize) -> &mut Cell {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize_with(col + 1, Cell::default);
        }
        &mut cells[col]
    }

    fn used_size(&self) -> (usize, usize) {
        let cols = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        (self.rows.len(), cols)
    }
}

#[derive(Debug)]
struct Workbook {
    sheets: Vec<(String, Sheet)>,
    last_selection: Option<(Option<String>, Vec<CellAddress>)>,
    last_navigation: Option<(Option<String>, CellAddress)>,
}

impl Workbook {
    fn sheet_index(&self, name: Option<&str>) -> Result<usize, AdapterError> {
        match name {
            None if !self.sheets.is_empty() => Ok(0),
            None => Err(AdapterError::SheetNotFound(DEFAULT_SHEET.to_string())),
            Some(name) => self
                .sheets
                .iter()
                .position(|(n, _)| n.eq_ignore_ascii_case(name))
                .ok_or_else(|| AdapterError::SheetNotFound(name.to_string())),
        }
    }

    fn sheet(&self, name: Option<&str>) -> Result<&Sheet, AdapterError> {
        let idx = self.sheet_index(name)?;
        Ok(&self.sheets[idx].1)
    }

    fn sheet_mut(&mut self, name: Option<&str>) -> Result<&mut Sheet, AdapterError> {
        let idx = self.sheet_index(name)?;
        Ok(&mut self.sheets[idx].1)
    }
}

fn check_bounds(address: &RangeAddress) -> Result<(), AdapterError> {
    if address.end.row >= MAX_ROWS || address.end.col >= MAX_COLS {
        return Err(AdapterError::OutOfBounds(address.to_string()));
    }
    Ok(())
}

/// A workbook held entirely in memory.
///
/// Cells outside the stored grid read as empty; writes grow the grid. The
/// first sheet is used for addresses without a sheet name. Sheet lookup is
/// case-insensitive.
#[derive(Debug)]
pub struct MemorySheet {
    book: RwLock<Workbook>,
}

impl Default for MemorySheet {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySheet {
    /// A workbook with one empty sheet named `Sheet1`.
    pub fn new() -> Self {
        Self::with_sheet(DEFAULT_SHEET, Vec::new())
    }

    /// A workbook with a single sheet holding `rows` (row 0 is usually the header).
    pub fn with_sheet(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let book = Self {
            book: RwLock::new(Workbook {
                sheets: Vec::new(),
                last_selection: None,
                last_navigation: None,
            }),
        };
        book.add_sheet(name, rows);
        book
    }

    /// Add (or replace) a sheet.
    pub fn add_sheet(&self, name: impl Into<String>, rows: Vec<Vec<CellValue>>) {
        let name = name.into();
        let sheet = Sheet {
            rows: rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|value| Cell {
                            value,
                            formula: None,
                        })
                        .collect()
                })
                .collect(),
            protected: false,
        };
        let mut book = self.book.write();
        match book
            .sheets
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(idx) => book.sheets[idx].1 = sheet,
            None => book.sheets.push((name, sheet)),
        }
    }

    /// Set a single cell, optionally with the formula that produced it.
    pub fn set_cell(
        &self,
        sheet: Option<&str>,
        cell: CellAddress,
        value: CellValue,
        formula: Option<String>,
    ) -> Result<(), AdapterError> {
        check_bounds(&RangeAddress::single(sheet.map(str::to_string), cell))?;
        let mut book = self.book.write();
        let target = book.sheet_mut(sheet)?.cell_mut(cell.row, cell.col);
        *target = Cell { value, formula };
        Ok(())
    }

    pub fn value(&self, sheet: Option<&str>, cell: CellAddress) -> Option<CellValue> {
        let book = self.book.read();
        let s = book.sheet(sheet).ok()?;
        Some(
            s.cell(cell.row, cell.col)
                .map(|c| c.value.clone())
                .unwrap_or_default(),
        )
    }

    /// Reject writes to a sheet with [`AdapterError::AccessDenied`].
    pub fn set_protected(&self, sheet: Option<&str>, protected: bool) -> Result<(), AdapterError> {
        self.book.write().sheet_mut(sheet)?.protected = protected;
        Ok(())
    }

    /// The smallest range from `A1` that covers every stored cell.
    pub fn used_range(&self, sheet: Option<&str>) -> Result<Option<RangeAddress>, AdapterError> {
        let book = self.book.read();
        let idx = book.sheet_index(sheet)?;
        let (name, s) = &book.sheets[idx];
        let (rows, cols) = s.used_size();
        if rows == 0 || cols == 0 {
            return Ok(None);
        }
        Ok(Some(RangeAddress::new(
            Some(name.clone()),
            CellAddress::new(0, 0),
            CellAddress::new(rows - 1, cols - 1),
        )))
    }

    /// Cells passed to the most recent [`SheetAdapter::select_cells`] call.
    pub fn last_selection(&self) -> Option<(Option<String>, Vec<CellAddress>)> {
        self.book.read().last_selection.clone()
    }

    /// Cell passed to the most recent [`SheetAdapter::navigate_to`] call.
    pub fn last_navigation(&self) -> Option<(Option<String>, CellAddress)> {
        self.book.read().last_navigation.clone()
    }
}

impl SheetAdapter for MemorySheet {
    fn read_range(&self, address: &RangeAddress) -> Result<RangeData, AdapterError> {
        check_bounds(address)?;
        let book = self.book.read();
        let sheet = book.sheet(address.sheet.as_deref())?;

        let mut values = Vec::with_capacity(address.row_count());
        let mut formulas = Vec::with_capacity(address.row_count());
        for row in address.start.row..=address.end.row {
            let mut value_row = Vec::with_capacity(address.col_count());
            let mut formula_row = Vec::with_capacity(address.col_count());
            for col in address.start.col..=address.end.col {
                match sheet.cell(row, col) {
                    Some(cell) => {
                        value_row.push(cell.value.clone());
                        formula_row.push(cell.formula.clone());
                    }
                    None => {
                        value_row.push(CellValue::Empty);
                        formula_row.push(None);
                    }
                }
            }
            values.push(value_row);
            formulas.push(formula_row);
        }
        Ok(RangeData { values, formulas })
    }

    fn write_range(
        &self,
        address: &RangeAddress,
        values: &[Vec<CellValue>],
        formulas: Option<&[Vec<Option<String>>]>,
    ) -> Result<(), AdapterError> {
        check_bounds(address)?;
        check_write_shape(address, values, formulas)?;

        let mut book = self.book.write();
        let sheet = book.sheet_mut(address.sheet.as_deref())?;
        if sheet.protected {
            return Err(AdapterError::AccessDenied(format!(
                "sheet is protected ({})",
                address
            )));
        }

        for (r, row) in values.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let formula = formulas.and_then(|f| f[r][c].clone());
                let cell = sheet.cell_mut(address.start.row + r, address.start.col + c);
                *cell = Cell {
                    value: value.clone(),
                    formula,
                };
            }
        }
        Ok(())
    }

    fn select_cells(&self, sheet: Option<&str>, cells: &[CellAddress]) -> Result<(), AdapterError> {
        let mut book = self.book.write();
        book.sheet_index(sheet)?;
        book.last_selection = Some((sheet.map(str::to_string), cells.to_vec()));
        Ok(())
    }

    fn navigate_to(&self, sheet: Option<&str>, cell: CellAddress) -> Result<(), AdapterError> {
        check_bounds(&RangeAddress::single(None, cell))?;
        let mut book = self.book.write();
        book.sheet_index(sheet)?;
        book.last_navigation = Some((sheet.map(str::to_string), cell));
        Ok(())
    }
}
