//! Date format detection and normalization
//!
//! Legacy sources store visit dates as free-form strings. The observed
//! formats are ISO calendar dates (`2025-10-30`), ISO date-times from JSON
//! exports (`2025-10-30T08:15:00.000Z`), zero-padded day/month/year
//! (`30/10/2025`) and unpadded day/month/year (`3/9/2025`).
//!
//! Raw strings are always stored as received. [`to_iso`] produces the
//! canonical `YYYY-MM-DD` form written alongside them; it never reorders
//! day and month, so `MM/DD/YYYY` input that is not a valid day/month/year
//! date yields `None` instead of a guess.

use chrono::NaiveDate;
use serde::Serialize;

/// Recognized raw date string formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// `YYYY-MM-DD`
    Iso,
    /// `YYYY-MM-DDTHH:MM:SS...`
    IsoDateTime,
    /// `DD/MM/YYYY`
    DayMonthYear,
    /// `D/M/YYYY` with at least one unpadded component
    DayMonthYearUnpadded,
}

impl DateFormat {
    pub fn label(self) -> &'static str {
        match self {
            DateFormat::Iso => "YYYY-MM-DD",
            DateFormat::IsoDateTime => "YYYY-MM-DDTHH:MM:SS",
            DateFormat::DayMonthYear => "DD/MM/YYYY",
            DateFormat::DayMonthYearUnpadded => "D/M/YYYY",
        }
    }
}

/// Detect the format of a raw date string, `None` if unrecognized or not a real date
pub fn detect_format(raw: &str) -> Option<DateFormat> {
    parse(raw).map(|(format, _)| format)
}

/// Parse a raw date string into a calendar date
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse(raw).map(|(_, date)| date)
}

/// Canonical `YYYY-MM-DD` form of a raw date string
pub fn to_iso(raw: &str) -> Option<String> {
    parse_date(raw).map(|date| date.format("%Y-%m-%d").to_string())
}

fn parse(raw: &str) -> Option<(DateFormat, NaiveDate)> {
    let raw = raw.trim();

    if raw.contains('/') {
        return parse_day_month_year(raw);
    }

    let (date_part, format) = match raw.split_once('T') {
        Some((date_part, _time)) => (date_part, DateFormat::IsoDateTime),
        None => (raw, DateFormat::Iso),
    };

    if date_part.len() != 10 {
        return None;
    }

    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .map(|date| (format, date))
}

fn parse_day_month_year(raw: &str) -> Option<(DateFormat, NaiveDate)> {
    let mut parts = raw.split('/');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || year.len() != 4 {
        return None;
    }

    let all_digits = |s: &str| !s.is_empty() && s.len() <= 2 && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(day) || !all_digits(month) || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)?;

    let format = if day.len() == 2 && month.len() == 2 {
        DateFormat::DayMonthYear
    } else {
        DateFormat::DayMonthYearUnpadded
    };

    Some((format, date))
}
