//! Conversions between date serials, date text, numbers and numeric text.
//!
//! Serials count days from 1899-12-30, so `1.0` is 1899-12-31 and `45292.0`
//! is 2024-01-01. The fractional part is the time of day.

use crate::snapshot::classify::is_date_like_text;
use crate::snapshot::{CellValue, RepresentationClass};
use crate::utils::{format_number, parse_numeric_text};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;

const SECONDS_PER_DAY: i64 = 86_400;

/// Day number of 1899-12-30 counted from 0001-01-01 (day 1).
const EPOCH_DAYS_FROM_CE: i32 = 693_594;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

// `%b` only takes three-letter months, so full names get their own layouts
const DATE_FORMATS: [&str; 12] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%b %d,%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%B %d,%Y",
];

/// Date and time of a serial, rounded to the second.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let total = (serial * SECONDS_PER_DAY as f64).round() as i64;
    let days = i32::try_from(total / SECONDS_PER_DAY).ok()?;
    let seconds = u32::try_from(total % SECONDS_PER_DAY).ok()?;
    let date = NaiveDate::from_num_days_from_ce_opt(EPOCH_DAYS_FROM_CE.checked_add(days)?)?;
    Some(date.and_time(NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)?))
}

pub fn datetime_to_serial(datetime: NaiveDateTime) -> f64 {
    let days = datetime.date().num_days_from_ce() - EPOCH_DAYS_FROM_CE;
    days as f64 + datetime.time().num_seconds_from_midnight() as f64 / SECONDS_PER_DAY as f64
}

/// ISO text for a serial: `YYYY-MM-DD`, plus ` HH:MM:SS` when it has a time.
pub fn format_serial(serial: f64) -> Option<String> {
    let datetime = serial_to_datetime(serial)?;
    if datetime.num_seconds_from_midnight() == 0 {
        Some(datetime.format("%Y-%m-%d").to_string())
    } else {
        Some(datetime.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

static SEPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bsept\b").expect("Invalid regex: sept"));

/// Parse date text in any of the recognized layouts.
pub fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    let cleaned = text.trim().replace('.', "");
    let cleaned = SEPT.replace(&cleaned, "Sep");
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(&cleaned, format) {
            return Some(datetime);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&cleaned, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Convert `value` to the `target` representation.
///
/// `None` when the value is already in that representation or can't be
/// converted; the caller leaves such cells alone.
pub fn convert_value(value: &CellValue, target: RepresentationClass) -> Option<CellValue> {
    let converted = match (target, value) {
        (RepresentationClass::DateLikeText, CellValue::Number(n)) => {
            CellValue::Text(format_serial(*n)?)
        }
        (RepresentationClass::NumericDateSerial, CellValue::Text(t)) if is_date_like_text(t) => {
            CellValue::Number(datetime_to_serial(parse_date_text(t)?))
        }
        (RepresentationClass::PlainNumber, CellValue::Text(t)) => {
            CellValue::Number(parse_numeric_text(t)?)
        }
        (RepresentationClass::PlainText, CellValue::Number(n)) if n.is_finite() => {
            CellValue::Text(format_number(*n))
        }
        _ => return None,
    };
    (converted != *value).then_some(converted)
}
