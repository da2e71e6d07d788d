//! A1-style cell and range addressing.
//!
//! Coordinates are zero-based internally and one-based in A1 text
//! (`CellAddress { row: 0, col: 1 }` displays as `B1`).

use crate::error::{QualityError, Result};
use crate::utils::{column_index, column_letters};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static CELL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]{1,7})$").expect("Invalid regex: cell")
});

static RANGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:'((?:[^']|'')+)'|([^!':]+))!)?(\$?[A-Za-z]{1,3}\$?[0-9]{1,7})(?::(\$?[A-Za-z]{1,3}\$?[0-9]{1,7}))?$",
    )
    .expect("Invalid regex: range")
});

/// A single cell position on a sheet. Ordered row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellAddress {
    pub row: usize,
    pub col: usize,
}

impl CellAddress {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Parse `B7` or `$B$7`.
    pub fn parse(text: &str) -> Result<Self> {
        let caps = CELL_PATTERN
            .captures(text.trim())
            .ok_or_else(|| QualityError::InvalidAddress(text.to_string()))?;
        let col = column_index(&caps[1]).ok_or_else(|| QualityError::InvalidAddress(text.to_string()))?;
        let row: usize = caps[2]
            .parse()
            .map_err(|_| QualityError::InvalidAddress(text.to_string()))?;
        if row == 0 {
            return Err(QualityError::InvalidAddress(text.to_string()));
        }
        Ok(Self::new(row - 1, col))
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row + 1)
    }
}

impl FromStr for CellAddress {
    type Err = QualityError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CellAddress {
    type Error = QualityError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CellAddress> for String {
    fn from(value: CellAddress) -> Self {
        value.to_string()
    }
}

/// An inclusive rectangular range, optionally qualified by a sheet name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RangeAddress {
    pub sheet: Option<String>,
    pub start: CellAddress,
    pub end: CellAddress,
}

impl RangeAddress {
    /// Create a range from two corners in any order.
    pub fn new(sheet: Option<String>, a: CellAddress, b: CellAddress) -> Self {
        Self {
            sheet,
            start: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// A range covering exactly one cell.
    pub fn single(sheet: Option<String>, cell: CellAddress) -> Self {
        Self::new(sheet, cell, cell)
    }

    /// The minimal range covering every cell, or `None` if there are none.
    pub fn bounding<'a>(
        sheet: Option<String>,
        cells: impl IntoIterator<Item = &'a CellAddress>,
    ) -> Option<Self> {
        let mut iter = cells.into_iter();
        let first = *iter.next()?;
        let (mut start, mut end) = (first, first);
        for cell in iter {
            start.row = start.row.min(cell.row);
            start.col = start.col.min(cell.col);
            end.row = end.row.max(cell.row);
            end.col = end.col.max(cell.col);
        }
        Some(Self { sheet, start, end })
    }

    /// Parse `Sheet1!A1:D20`, `'My Sheet'!B2`, `$A$1:$C$3` or `C5`.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || QualityError::InvalidAddress(text.to_string());
        let caps = RANGE_PATTERN.captures(text.trim()).ok_or_else(invalid)?;

        let sheet = caps
            .get(1)
            .map(|m| m.as_str().replace("''", "'"))
            .or_else(|| caps.get(2).map(|m| m.as_str().to_string()));
        let start = CellAddress::parse(&caps[3]).map_err(|_| invalid())?;
        let end = match caps.get(4) {
            Some(m) => CellAddress::parse(m.as_str()).map_err(|_| invalid())?,
            None => start,
        };
        Ok(Self::new(sheet, start, end))
    }

    pub fn row_count(&self) -> usize {
        self.end.row - self.start.row + 1
    }

    pub fn col_count(&self) -> usize {
        self.end.col - self.start.col + 1
    }

    pub fn contains(&self, cell: &CellAddress) -> bool {
        (self.start.row..=self.end.row).contains(&cell.row)
            && (self.start.col..=self.end.col).contains(&cell.col)
    }

    /// Zero-based (row, col) of `cell` inside this range.
    pub fn offset_of(&self, cell: &CellAddress) -> Option<(usize, usize)> {
        self.contains(cell)
            .then(|| (cell.row - self.start.row, cell.col - self.start.col))
    }

    /// Absolute address of the cell at a zero-based offset inside this range.
    pub fn cell_at(&self, row: usize, col: usize) -> CellAddress {
        CellAddress::new(self.start.row + row, self.start.col + col)
    }

    /// A sub-range of `count` rows starting `offset` rows below the top.
    ///
    /// The result is clipped to this range; `None` when `offset` is past the end.
    pub fn row_slice(&self, offset: usize, count: usize) -> Option<Self> {
        if offset >= self.row_count() || count == 0 {
            return None;
        }
        let first = self.start.row + offset;
        let last = (first + count - 1).min(self.end.row);
        Some(Self {
            sheet: self.sheet.clone(),
            start: CellAddress::new(first, self.start.col),
            end: CellAddress::new(last, self.end.col),
        })
    }
}

impl fmt::Display for RangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            let plain = sheet
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
            if plain {
                write!(f, "{}!", sheet)?;
            } else {
                write!(f, "'{}'!", sheet.replace('\'', "''"))?;
            }
        }
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

impl FromStr for RangeAddress {
    type Err = QualityError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RangeAddress {
    type Error = QualityError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<RangeAddress> for String {
    fn from(value: RangeAddress) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_parse_and_display() {
        let cell = CellAddress::parse("B7").unwrap();
        assert_eq!(cell, CellAddress::new(6, 1));
        assert_eq!(cell.to_string(), "B7");
        assert_eq!(CellAddress::parse("$AA$10").unwrap(), CellAddress::new(9, 26));
        assert!(CellAddress::parse("A0").is_err());
        assert!(CellAddress::parse("7B").is_err());
    }

    #[test]
    fn test_cell_ordering_is_row_major() {
        let mut cells = vec![
            CellAddress::new(2, 0),
            CellAddress::new(1, 5),
            CellAddress::new(1, 0),
        ];
        cells.sort();
        assert_eq!(
            cells,
            vec![
                CellAddress::new(1, 0),
                CellAddress::new(1, 5),
                CellAddress::new(2, 0)
            ]
        );
    }

    #[test]
    fn test_range_parse_variants() {
        let r = RangeAddress::parse("Sheet1!A1:D20").unwrap();
        assert_eq!(r.sheet.as_deref(), Some("Sheet1"));
        assert_eq!(r.row_count(), 20);
        assert_eq!(r.col_count(), 4);

        let quoted = RangeAddress::parse("'Q1 ''Sales'''!B2").unwrap();
        assert_eq!(quoted.sheet.as_deref(), Some("Q1 'Sales'"));
        assert_eq!(quoted.start, quoted.end);

        let reversed = RangeAddress::parse("$C$3:$A$1").unwrap();
        assert_eq!(reversed.start, CellAddress::new(0, 0));
        assert_eq!(reversed.end, CellAddress::new(2, 2));

        assert!(RangeAddress::parse("not a range").is_err());
        assert!(RangeAddress::parse("A1:").is_err());
    }

    #[test]
    fn test_range_display_roundtrip() {
        for text in ["Sheet1!A1:D20", "'My Sheet'!B2", "C5", "A1:B2"] {
            let parsed = RangeAddress::parse(text).unwrap();
            assert_eq!(parsed.to_string(), text);
        }
    }

    #[test]
    fn test_bounding_box() {
        let cells = [
            CellAddress::new(5, 2),
            CellAddress::new(1, 2),
            CellAddress::new(3, 4),
        ];
        let bbox = RangeAddress::bounding(None, &cells).unwrap();
        assert_eq!(bbox.start, CellAddress::new(1, 2));
        assert_eq!(bbox.end, CellAddress::new(5, 4));
        assert!(RangeAddress::bounding(None, &[]).is_none());
    }

    #[test]
    fn test_row_slice_clips_to_range() {
        let r = RangeAddress::parse("A1:C2500").unwrap();
        let last = r.row_slice(2000, 1000).unwrap();
        assert_eq!(last.start, CellAddress::new(2000, 0));
        assert_eq!(last.end, CellAddress::new(2499, 2));
        assert!(r.row_slice(2500, 1000).is_none());
    }

    #[test]
    fn test_offset_of() {
        let r = RangeAddress::parse("B2:D4").unwrap();
        assert_eq!(r.offset_of(&CellAddress::new(2, 2)), Some((1, 1)));
        assert_eq!(r.offset_of(&CellAddress::new(0, 0)), None);
        assert_eq!(r.cell_at(1, 1), CellAddress::new(2, 2));
    }

    #[test]
    fn test_serde_as_a1_strings() {
        let r = RangeAddress::parse("Sheet1!A1:B3").unwrap();
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, "\"Sheet1!A1:B3\"");
        let back: RangeAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
