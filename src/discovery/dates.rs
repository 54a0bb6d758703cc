//! Best-effort date inference from text around a document link.
//!
//! The portal renders meeting dates inline next to document links in a
//! handful of formats. Patterns are tried in order and the first parse
//! wins; absence of a date is not an error.

use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Textual patterns tried in order against the surrounding text.
static DATE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        // Month D, YYYY: "January 15, 2024" (comma optional)
        (
            Regex::new(
                r"(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{1,2}),?\s+(\d{4})",
            )
            .unwrap(),
            "month_name",
        ),
        // US numeric: 1/15/2024
        (Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap(), "mdy"),
        // ISO: 2024-01-15
        (Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap(), "ymd"),
    ]
});

/// Try each date pattern against the text and return the first parsed date.
pub fn infer_date(text: &str) -> Option<NaiveDate> {
    for (pattern, format) in DATE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            if let Some(date) = parse_captured_date(&caps, format) {
                // Sanity check: ignore years outside a plausible range
                let year = date.year();
                if year >= 1990 && year <= Utc::now().year() + 1 {
                    return Some(date);
                }
            }
        }
    }
    None
}

/// Parse captured date groups based on format.
fn parse_captured_date(caps: &regex::Captures, format: &str) -> Option<NaiveDate> {
    match format {
        "month_name" => {
            let month = month_number(caps.get(1)?.as_str())?;
            let day: u32 = caps.get(2)?.as_str().parse().ok()?;
            let year: i32 = caps.get(3)?.as_str().parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        }
        "mdy" => {
            let month: u32 = caps.get(1)?.as_str().parse().ok()?;
            let day: u32 = caps.get(2)?.as_str().parse().ok()?;
            let year: i32 = caps.get(3)?.as_str().parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        }
        "ymd" => {
            let year: i32 = caps.get(1)?.as_str().parse().ok()?;
            let month: u32 = caps.get(2)?.as_str().parse().ok()?;
            let day: u32 = caps.get(3)?.as_str().parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        }
        _ => None,
    }
}

fn month_number(name: &str) -> Option<u32> {
    match name {
        "January" => Some(1),
        "February" => Some(2),
        "March" => Some(3),
        "April" => Some(4),
        "May" => Some(5),
        "June" => Some(6),
        "July" => Some(7),
        "August" => Some(8),
        "September" => Some(9),
        "October" => Some(10),
        "November" => Some(11),
        "December" => Some(12),
        _ => None,
    }
}
