// Calendar-date handling: shaping request bounds into each provider's date
// encoding, and coercing provider timestamps back into plain calendar dates.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// How a provider expects a date bound to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DateParamShape {
    /// Fixed-width numeric prefix of `YYYYMMDDhhmmss` (width 4..=14).
    Timestamp { width: u8 },
    /// `YYYYMMDD`
    CompactDate,
    /// `YYYY-MM-DD`
    IsoDate,
    /// `MM/DD/YYYY`
    UsDate,
    /// `M/D/YYYY` (no zero padding)
    LooseUsDate,
    /// `YYYY`
    Year,
}

const END_OF_DAY: &str = "235959";
const START_OF_DAY: &str = "000000";

impl DateParamShape {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            DateParamShape::Timestamp { width } if !(4..=14).contains(width) => {
                Err(format!("timestamp width must be within 4..=14, got {width}"))
            }
            _ => Ok(()),
        }
    }

    /// Encode the lower bound of a range.
    pub fn format_start(&self, date: NaiveDate) -> String {
        self.format(date, START_OF_DAY)
    }

    /// Encode the upper bound of a range. Sub-day digits cover the whole day
    /// so the bound stays inclusive.
    pub fn format_end(&self, date: NaiveDate) -> String {
        self.format(date, END_OF_DAY)
    }

    fn format(&self, date: NaiveDate, time_fill: &str) -> String {
        match self {
            DateParamShape::Timestamp { width } => {
                let width = usize::from(*width).clamp(4, 14);
                let mut digits = date.format("%Y%m%d").to_string();
                digits.push_str(time_fill);
                // Coarser widths truncate; a date is never rounded up.
                digits.truncate(width);
                digits
            }
            DateParamShape::CompactDate => date.format("%Y%m%d").to_string(),
            DateParamShape::IsoDate => date.format("%Y-%m-%d").to_string(),
            DateParamShape::UsDate => date.format("%m/%d/%Y").to_string(),
            DateParamShape::LooseUsDate => date.format("%-m/%-d/%Y").to_string(),
            DateParamShape::Year => date.format("%Y").to_string(),
        }
    }
}

/// Coerce a provider's date or timestamp string into a calendar date.
///
/// Accepts compact numeric timestamps (`YYYY`, `YYYYMM`, `YYYYMMDD[hh[mm[ss]]]`),
/// RFC 3339, ISO dates with or without time, US-style slashed dates and
/// "Mar 3, 2004"-style dates. Returns `None` for anything else.
pub fn coerce_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return coerce_numeric(raw);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%b %d, %Y", "%B %d, %Y", "%d %b %Y", "%d %B %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    None
}

fn coerce_numeric(raw: &str) -> Option<NaiveDate> {
    let year: i32 = raw.get(0..4)?.parse().ok()?;
    match raw.len() {
        4 => NaiveDate::from_ymd_opt(year, 1, 1),
        6 => NaiveDate::from_ymd_opt(year, raw[4..6].parse().ok()?, 1),
        8 | 10 | 12 | 14 => NaiveDate::from_ymd_opt(
            year,
            raw[4..6].parse().ok()?,
            raw[6..8].parse().ok()?,
        ),
        _ => None,
    }
}
