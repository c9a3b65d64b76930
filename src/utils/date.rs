//! Loose date parsing for feed and reference dates.

use chrono::{Datelike, NaiveDate};

/// Precision a date string was given with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Year,
    Month,
    Day,
}

/// Parse a date such as `2012-02-11`, `2012-02`, `2012`,
/// `February 2012` or `February 11, 2012`.
///
/// Partial dates resolve to the first day of the period.
pub fn parse_loose(input: &str) -> Option<(NaiveDate, Precision)> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some((date, Precision::Day));
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%B %d, %Y") {
        return Some((date, Precision::Day));
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%b %d, %Y") {
        return Some((date, Precision::Day));
    }
    // ISO timestamps as written by some feed exports
    if let Some(prefix) = input.get(..10) {
        if input.len() > 10 && input[10..].starts_with(['T', ' ']) {
            if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
                return Some((date, Precision::Day));
            }
        }
    }

    let padded = format!("{} 01", input);
    if let Ok(date) = NaiveDate::parse_from_str(&padded, "%Y-%m %d") {
        return Some((date, Precision::Month));
    }
    if let Ok(date) = NaiveDate::parse_from_str(&padded, "%B %Y %d") {
        return Some((date, Precision::Month));
    }
    if let Ok(date) = NaiveDate::parse_from_str(&padded, "%b %Y %d") {
        return Some((date, Precision::Month));
    }

    if input.len() == 4 {
        let year: i32 = input.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1).map(|d| (d, Precision::Year));
    }
    None
}

/// Parse a loose date, dropping the precision
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    parse_loose(input).map(|(date, _)| date)
}

/// Half-open interval check: `date` in `[Jan 1 of year, Jan 1 of year + 1)`
pub fn in_year(date: NaiveDate, year: i32) -> bool {
    let Some(start) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return false;
    };
    match NaiveDate::from_ymd_opt(year + 1, 1, 1) {
        Some(end) => date >= start && date < end,
        None => date.year() == year,
    }
}

/// Render a date at the precision it was given with
pub fn format_with_precision(date: NaiveDate, precision: Precision) -> String {
    match precision {
        Precision::Year => date.format("%Y").to_string(),
        Precision::Month => date.format("%Y-%m").to_string(),
        Precision::Day => date.format("%Y-%m-%d").to_string(),
    }
}
