// src/utils/dates.rs

//! Locale-aware date parsing.
//!
//! Every parser normalizes to a [`NaiveDate`]; [`to_iso`] renders the
//! ISO-8601 date string. Dates without a year resolve to the next
//! occurrence relative to `today`, allowing a month of slack for events
//! that have just happened.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::models::DateLocale;

/// A yearless date this far in the past rolls over to next year.
const YEAR_ROLLOVER_DAYS: i64 = 31;

const NB_MONTHS: &[(&str, u32)] = &[
    ("januar", 1),
    ("jan", 1),
    ("februar", 2),
    ("feb", 2),
    ("mars", 3),
    ("mar", 3),
    ("april", 4),
    ("apr", 4),
    ("mai", 5),
    ("juni", 6),
    ("jun", 6),
    ("juli", 7),
    ("jul", 7),
    ("august", 8),
    ("aug", 8),
    ("september", 9),
    ("sept", 9),
    ("sep", 9),
    ("oktober", 10),
    ("okt", 10),
    ("november", 11),
    ("nov", 11),
    ("desember", 12),
    ("des", 12),
];

const EN_MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("jan", 1),
    ("february", 2),
    ("feb", 2),
    ("march", 3),
    ("mar", 3),
    ("april", 4),
    ("apr", 4),
    ("may", 5),
    ("june", 6),
    ("jun", 6),
    ("july", 7),
    ("jul", 7),
    ("august", 8),
    ("aug", 8),
    ("september", 9),
    ("sept", 9),
    ("sep", 9),
    ("october", 10),
    ("oct", 10),
    ("november", 11),
    ("nov", 11),
    ("december", 12),
    ("dec", 12),
];

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("valid regex"));

static NB_NUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})\.(\d{1,2})\.(\d{4}|\d{2})\b").expect("valid regex")
});

static NB_TEXTUAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\.?\s*([a-zæøå]{3,9})\.?(?:\s+(\d{4}))?").expect("valid regex")
});

static EN_MONTH_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?\b,?(?:\s+(\d{4}))?")
        .expect("valid regex")
});

static EN_DAY_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+(?:of\s+)?([a-z]{3,9})\.?,?(?:\s+(\d{4}))?")
        .expect("valid regex")
});

/// Render a date as `YYYY-MM-DD`.
pub fn to_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse free text in the given locale. ISO dates are accepted everywhere.
pub fn parse_date(text: &str, locale: DateLocale, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(date) = parse_iso_prefix(text) {
        return Some(date);
    }
    match locale {
        DateLocale::Nb => parse_norwegian_date(text, today),
        DateLocale::En => parse_english_date(text, today),
    }
}

/// Norwegian dates: `12.03.2026`, `tirsdag 12. mars 2026`, `3. nov.`.
pub fn parse_norwegian_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    for caps in NB_NUMERIC.captures_iter(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year = expand_year(&caps[3])?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    for caps in NB_TEXTUAL.captures_iter(text) {
        let Some(month) = month_number(NB_MONTHS, &caps[2]) else {
            continue;
        };
        let day: u32 = caps[1].parse().ok()?;
        let year = caps.get(3).and_then(|y| y.as_str().parse().ok());
        if let Some(date) = build_date(year, month, day, today) {
            return Some(date);
        }
    }
    None
}

/// English dates: `March 12, 2026`, `Thu, Mar 5`, `5th December 2026`.
pub fn parse_english_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    for caps in EN_MONTH_FIRST.captures_iter(text) {
        let Some(month) = month_number(EN_MONTHS, &caps[1]) else {
            continue;
        };
        let day: u32 = caps[2].parse().ok()?;
        let year = caps.get(3).and_then(|y| y.as_str().parse().ok());
        if let Some(date) = build_date(year, month, day, today) {
            return Some(date);
        }
    }

    for caps in EN_DAY_FIRST.captures_iter(text) {
        let Some(month) = month_number(EN_MONTHS, &caps[2]) else {
            continue;
        };
        let day: u32 = caps[1].parse().ok()?;
        let year = caps.get(3).and_then(|y| y.as_str().parse().ok());
        if let Some(date) = build_date(year, month, day, today) {
            return Some(date);
        }
    }
    None
}

/// Parse an ISO date or date-time (`2026-03-12`, `2026-03-12T09:00:00+01:00`).
///
/// Returns the local calendar date and, when present, the `HH:MM` time.
pub fn parse_iso_datetime(text: &str) -> Option<(NaiveDate, Option<String>)> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some((dt.date_naive(), Some(dt.format("%H:%M").to_string())));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some((dt.date(), Some(dt.format("%H:%M").to_string())));
        }
    }
    parse_iso_prefix(text).map(|date| (date, None))
}

fn parse_iso_prefix(text: &str) -> Option<NaiveDate> {
    let caps = ISO_DATE.captures(text)?;
    NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
}

fn month_number(table: &[(&str, u32)], name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    table
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, month)| *month)
}

fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    Some(if raw.len() == 2 { 2000 + year } else { year })
}

fn build_date(year: Option<i32>, month: u32, day: u32, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(year) = year {
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    let candidate = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if candidate < today - Duration::days(YEAR_ROLLOVER_DAYS) {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2026, 10, 18)
    }

    #[test]
    fn test_norwegian_textual() {
        assert_eq!(
            parse_norwegian_date("tirsdag 12. mars 2027", today()),
            Some(date(2027, 3, 12))
        );
        assert_eq!(
            parse_norwegian_date("3. nov. kl. 10:00", today()),
            Some(date(2026, 11, 3))
        );
    }

    #[test]
    fn test_norwegian_numeric() {
        assert_eq!(
            parse_norwegian_date("Dato: 05.12.2026", today()),
            Some(date(2026, 12, 5))
        );
        assert_eq!(
            parse_norwegian_date("05.12.26", today()),
            Some(date(2026, 12, 5))
        );
    }

    #[test]
    fn test_yearless_date_rolls_over() {
        assert_eq!(
            parse_norwegian_date("15. januar", today()),
            Some(date(2027, 1, 15))
        );
        // Recent past stays in the current year
        assert_eq!(
            parse_english_date("October 10", today()),
            Some(date(2026, 10, 10))
        );
    }

    #[test]
    fn test_english_formats() {
        assert_eq!(
            parse_english_date("March 12, 2027", today()),
            Some(date(2027, 3, 12))
        );
        assert_eq!(
            parse_english_date("Thu, Nov 5", today()),
            Some(date(2026, 11, 5))
        );
        assert_eq!(
            parse_english_date("5th December 2026", today()),
            Some(date(2026, 12, 5))
        );
    }

    #[test]
    fn test_invalid_dates() {
        assert_eq!(parse_norwegian_date("32. mars 2027", today()), None);
        assert_eq!(parse_norwegian_date("12 studenter", today()), None);
        assert_eq!(parse_english_date("no date here", today()), None);
    }

    #[test]
    fn test_parse_date_prefers_iso() {
        assert_eq!(
            parse_date("2026-11-02", DateLocale::Nb, today()),
            Some(date(2026, 11, 2))
        );
        assert_eq!(to_iso(date(2026, 1, 2)), "2026-01-02");
    }

    #[test]
    fn test_parse_iso_datetime() {
        assert_eq!(
            parse_iso_datetime("2026-11-02T09:30:00+01:00"),
            Some((date(2026, 11, 2), Some("09:30".to_string())))
        );
        assert_eq!(
            parse_iso_datetime("2026-11-02"),
            Some((date(2026, 11, 2), None))
        );
        assert_eq!(parse_iso_datetime("soon"), None);
    }
}
