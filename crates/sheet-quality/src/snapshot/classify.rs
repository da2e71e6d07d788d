//! Representation classifier for cell values.
//!
//! Rules, in order:
//!
//! 1. `Boolean(_)` is [`RepresentationClass::Boolean`].
//! 2. `Number(_)` is [`RepresentationClass::PlainNumber`].
//! 3. Trimmed text matching one of [`DATE_PATTERNS`] is
//!    [`RepresentationClass::DateLikeText`].
//! 4. Any other non-blank text is [`RepresentationClass::PlainText`]; text that
//!    parses as a number is additionally reported as numeric text.
//! 5. Empty cells and error values are not classified.
//!
//! Column context: once a column contains at least one `DateLikeText` cell,
//! its numbers inside the serial range (default `1..=80000`) are treated as
//! [`RepresentationClass::NumericDateSerial`]. Outside that context a number
//! is never assumed to be a date.

use crate::snapshot::CellValue;
use crate::utils::is_numeric_text;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Abbreviated or full English month name (`Sept` included).
const MONTH_NAME: &str = r"(jan(uary)?|feb(ruary)?|mar(ch)?|apr(il)?|may|june?|july?|aug(ust)?|sep(t(ember)?)?|oct(ober)?|nov(ember)?|dec(ember)?)";

// Date pattern regexes - compiled once at startup
pub static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}$").expect("Invalid regex: YYYY-MM-DD"),
        Regex::new(r"^\d{1,2}[-/]\d{1,2}[-/]\d{4}$").expect("Invalid regex: MM-DD-YYYY"),
        Regex::new(r"^\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}(:\d{2})?").expect("Invalid regex: datetime"),
        Regex::new(&format!(r"(?i)^\d{{1,2}}-{}-\d{{4}}$", MONTH_NAME))
            .expect("Invalid regex: DD-Mon-YYYY"),
        Regex::new(&format!(r"(?i)^{}\.? \d{{1,2}},? \d{{4}}$", MONTH_NAME))
            .expect("Invalid regex: Mon DD, YYYY"),
    ]
});

/// How a cell's value is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepresentationClass {
    PlainText,
    NumericDateSerial,
    DateLikeText,
    PlainNumber,
    Boolean,
}

impl RepresentationClass {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PlainText => "text",
            Self::NumericDateSerial => "date serial number",
            Self::DateLikeText => "date text",
            Self::PlainNumber => "number",
            Self::Boolean => "boolean",
        }
    }

    /// Native (non-text) classes win ties when choosing a majority.
    pub fn is_native(&self) -> bool {
        matches!(self, Self::NumericDateSerial | Self::PlainNumber | Self::Boolean)
    }
}

/// Check if text looks like a date.
pub fn is_date_like_text(text: &str) -> bool {
    let trimmed = text.trim();
    DATE_PATTERNS.iter().any(|p| p.is_match(trimmed))
}

/// Classify one value without column context. `None` for empty and error cells.
pub fn classify_value(value: &CellValue) -> Option<RepresentationClass> {
    match value {
        CellValue::Empty | CellValue::ErrorValue(_) => None,
        _ if value.is_empty() => None,
        CellValue::Boolean(_) => Some(RepresentationClass::Boolean),
        CellValue::Number(_) => Some(RepresentationClass::PlainNumber),
        CellValue::Text(t) if is_date_like_text(t) => Some(RepresentationClass::DateLikeText),
        CellValue::Text(_) => Some(RepresentationClass::PlainText),
    }
}

/// One classified, non-empty cell of a column.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedCell {
    /// Row offset inside the snapshot.
    pub row: usize,
    pub class: RepresentationClass,
    /// `PlainText` that parses as a number.
    pub numeric_text: bool,
}

/// Classify every non-empty cell of a column, applying the date-serial context rule.
pub fn classify_column<'a>(
    cells: impl IntoIterator<Item = (usize, &'a CellValue)>,
    serial_range: (f64, f64),
) -> Vec<ClassifiedCell> {
    let mut classified: Vec<(ClassifiedCell, Option<f64>)> = cells
        .into_iter()
        .filter_map(|(row, value)| {
            let class = classify_value(value)?;
            let numeric_text = class == RepresentationClass::PlainText
                && value.as_text().is_some_and(is_numeric_text);
            Some((
                ClassifiedCell {
                    row,
                    class,
                    numeric_text,
                },
                value.as_number(),
            ))
        })
        .collect();

    let has_date_text = classified
        .iter()
        .any(|(c, _)| c.class == RepresentationClass::DateLikeText);

    if has_date_text {
        let (min, max) = serial_range;
        for (cell, number) in &mut classified {
            if let Some(n) = number
                && *n >= min
                && *n <= max
            {
                cell.class = RepresentationClass::NumericDateSerial;
            }
        }
    }

    classified.into_iter().map(|(c, _)| c).collect()
}
