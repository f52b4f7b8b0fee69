// Utility helpers for cell parsing, month ordering and formatting.
//
// This module centralizes all the "dirty" spreadsheet cell handling so the
// rest of the code can assume clean, typed values.
use calamine::Data;
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// The report calendar: the twelve month names in chronological order.
///
/// Month aggregates sort by position in this list, never lexicographically.
pub const MONTH_ORDER: [&str; 12] = [
    "Январь",
    "Февраль",
    "Март",
    "Апрель",
    "Май",
    "Июнь",
    "Июль",
    "Август",
    "Сентябрь",
    "Октябрь",
    "Ноябрь",
    "Декабрь",
];

/// Position of a month name in the report calendar. Unknown labels sort
/// after the known twelve.
pub fn month_index(name: &str) -> usize {
    MONTH_ORDER
        .iter()
        .position(|m| *m == name)
        .unwrap_or(MONTH_ORDER.len())
}

/// Extract a trimmed, non-empty text value from a cell.
///
/// Numeric cells render as text (campaign codes are sometimes typed as
/// numbers); blank and error cells yield `None`.
pub fn cell_text(cell: Option<&Data>) -> Option<String> {
    let text = match cell? {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Coerce a cell into a whole amount.
///
/// - Numbers truncate toward zero.
/// - Numeric-looking text is accepted after trimming, stripping space
///   thousands separators, and normalizing a decimal comma.
/// - Anything else (plain text, blanks, dates, errors) becomes 0.
pub fn cell_amount(cell: Option<&Data>) -> i64 {
    match cell {
        Some(Data::Int(i)) => *i,
        Some(Data::Float(f)) => *f as i64,
        Some(Data::Bool(b)) => *b as i64,
        Some(Data::String(s)) => parse_amount_str(s).map(|v| v as i64).unwrap_or(0),
        _ => 0,
    }
}

fn parse_amount_str(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    let s: String = s
        .chars()
        .filter(|c| *c != ' ' && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    s.parse::<f64>().ok()
}

/// Calendar date from a cell.
///
/// Native Excel date cells are taken as-is; text cells accept `YYYY-MM-DD`
/// and `DD.MM.YYYY`. Anything else is "no date", never an error.
pub fn cell_date(cell: Option<&Data>) -> Option<NaiveDate> {
    match cell? {
        Data::DateTime(dt) => dt.as_datetime().map(|ndt| ndt.date()),
        Data::DateTimeIso(s) => parse_date_str(s.get(..10).unwrap_or(s.as_str())),
        Data::String(s) => parse_date_str(s),
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d.%m.%Y"))
        .ok()
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values. This is used
    // for the KPI metrics and row counts in console messages.
    n.to_formatted_string(&Locale::ru)
}

pub fn display_opt_date(date: &Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

pub fn display_opt_text(text: &Option<String>) -> String {
    text.clone().unwrap_or_default()
}

pub fn display_variance(variance: &f64) -> String {
    format!("{:.1}%", variance * 100.0)
}
