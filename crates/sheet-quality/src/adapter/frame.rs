//! Conversion between Polars DataFrames and cell grids.
//!
//! Row 0 of a grid is the header row and carries the DataFrame's column names.

use super::{MemorySheet, SheetAdapter};
use crate::error::{QualityError, Result, ResultExt};
use crate::snapshot::CellValue;
use crate::utils::column_letters;
use polars::prelude::*;
use std::collections::HashSet;

fn cell_from_any(value: AnyValue<'_>) -> CellValue {
    match value {
        AnyValue::Null => CellValue::Empty,
        AnyValue::Boolean(b) => CellValue::Boolean(b),
        AnyValue::String(s) => CellValue::text(s),
        AnyValue::StringOwned(s) => CellValue::text(s.as_str()),
        AnyValue::Float64(n) => CellValue::Number(n),
        AnyValue::Float32(n) => CellValue::Number(n as f64),
        AnyValue::Int8(_)
        | AnyValue::Int16(_)
        | AnyValue::Int32(_)
        | AnyValue::Int64(_)
        | AnyValue::UInt8(_)
        | AnyValue::UInt16(_)
        | AnyValue::UInt32(_)
        | AnyValue::UInt64(_) => value
            .extract::<f64>()
            .map(CellValue::Number)
            .unwrap_or_default(),
        other => CellValue::text(other.to_string()),
    }
}

/// Turn a DataFrame into a grid whose first row holds the column names.
pub fn grid_from_dataframe(df: &DataFrame) -> Result<Vec<Vec<CellValue>>> {
    let columns = df.get_columns();
    let mut rows = Vec::with_capacity(df.height() + 1);
    rows.push(
        columns
            .iter()
            .map(|c| CellValue::text(c.name().as_str()))
            .collect::<Vec<_>>(),
    );

    for i in 0..df.height() {
        let mut row = Vec::with_capacity(columns.len());
        for column in columns {
            let value = column
                .get(i)
                .context(format!("reading row {} of column '{}'", i, column.name()))?;
            row.push(cell_from_any(value));
        }
        rows.push(row);
    }
    Ok(rows)
}

fn unique_header(raw: &str, col: usize, seen: &mut HashSet<String>) -> String {
    let base = if raw.trim().is_empty() {
        column_letters(col)
    } else {
        raw.trim().to_string()
    };
    let mut name = base.clone();
    let mut n = 2;
    while !seen.insert(name.clone()) {
        name = format!("{}_{}", base, n);
        n += 1;
    }
    name
}

fn column_from_cells(name: &str, cells: &[&CellValue]) -> Column {
    let non_empty: Vec<&CellValue> = cells.iter().copied().filter(|v| !v.is_empty()).collect();

    let all_numbers = non_empty.iter().all(|v| v.as_number().is_some());
    let all_bools = non_empty
        .iter()
        .all(|v| matches!(v, CellValue::Boolean(_)));

    if !non_empty.is_empty() && all_numbers {
        let integral = non_empty
            .iter()
            .filter_map(|v| v.as_number())
            .all(|n| n.fract() == 0.0 && n.abs() < 9.0e15);
        if integral {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|v| v.as_number().map(|n| n as i64))
                .collect();
            return Column::new(name.into(), values);
        }
        let values: Vec<Option<f64>> = cells.iter().map(|v| v.as_number()).collect();
        return Column::new(name.into(), values);
    }

    if !non_empty.is_empty() && all_bools {
        let values: Vec<Option<bool>> = cells
            .iter()
            .map(|v| match v {
                CellValue::Boolean(b) => Some(*b),
                _ => None,
            })
            .collect();
        return Column::new(name.into(), values);
    }

    let values: Vec<Option<String>> = cells
        .iter()
        .map(|v| (!v.is_empty()).then(|| v.display_text()))
        .collect();
    Column::new(name.into(), values)
}

/// Turn a grid (row 0 = header) back into a DataFrame.
///
/// Columns holding only numbers become `Int64` or `Float64`, columns holding
/// only booleans become `Boolean`; anything else is exported as text.
pub fn dataframe_from_grid(rows: &[Vec<CellValue>]) -> Result<DataFrame> {
    let Some(header) = rows.first() else {
        return Ok(DataFrame::empty());
    };

    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(header.len());
    for (col, head) in header.iter().enumerate() {
        let name = unique_header(&head.display_text(), col, &mut seen);
        let cells: Vec<&CellValue> = rows[1..]
            .iter()
            .map(|row| row.get(col).unwrap_or(&CellValue::Empty))
            .collect();
        columns.push(column_from_cells(&name, &cells));
    }
    DataFrame::new(columns).context("building DataFrame from sheet grid")
}

impl MemorySheet {
    /// Build a workbook with one sheet holding `df` (column names in row 0).
    pub fn from_dataframe(sheet: impl Into<String>, df: &DataFrame) -> Result<Self> {
        Ok(Self::with_sheet(sheet, grid_from_dataframe(df)?))
    }

    /// Export the used range of a sheet as a DataFrame (row 0 becomes the header).
    pub fn to_dataframe(&self, sheet: Option<&str>) -> Result<DataFrame> {
        let used = self
            .used_range(sheet)
            .map_err(|source| QualityError::ReadFailure {
                address: sheet.unwrap_or_default().to_string(),
                source,
            })?;
        let Some(address) = used else {
            return Ok(DataFrame::empty());
        };
        let data = self.read_range(&address).map_err(|source| {
            QualityError::ReadFailure {
                address: address.to_string(),
                source,
            }
        })?;
        dataframe_from_grid(&data.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_df() -> DataFrame {
        df![
            "name" => [Some("Ann"), None, Some("Cho")],
            "age" => [Some(31i64), Some(42), None],
            "score" => [1.5f64, 2.0, 3.25],
        ]
        .unwrap()
    }

    #[test]
    fn test_grid_from_dataframe() {
        let grid = grid_from_dataframe(&sample_df()).unwrap();
        assert_eq!(grid.len(), 4);
        assert_eq!(grid[0][1], CellValue::text("age"));
        assert_eq!(grid[1][0], CellValue::text("Ann"));
        assert_eq!(grid[1][1], CellValue::Number(31.0));
        assert_eq!(grid[2][0], CellValue::Empty);
        assert_eq!(grid[3][1], CellValue::Empty);
    }

    #[test]
    fn test_dataframe_roundtrip_through_sheet() {
        let df = sample_df();
        let sheet = MemorySheet::from_dataframe("Data", &df).unwrap();
        let exported = sheet.to_dataframe(Some("Data")).unwrap();

        assert_eq!(exported.shape(), df.shape());
        assert_eq!(exported.column("age").unwrap().dtype(), &DataType::Int64);
        assert_eq!(exported.column("score").unwrap().dtype(), &DataType::Float64);
        assert!(exported.equals_missing(&df));
    }

    #[test]
    fn test_duplicate_and_blank_headers() {
        let rows = vec![
            vec![CellValue::text("id"), CellValue::text("id"), CellValue::Empty],
            vec![CellValue::Number(1.0), CellValue::text("x"), CellValue::Boolean(true)],
        ];
        let df = dataframe_from_grid(&rows).unwrap();
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["id", "id_2", "C"]);
        assert_eq!(df.column("C").unwrap().dtype(), &DataType::Boolean);
    }
}
