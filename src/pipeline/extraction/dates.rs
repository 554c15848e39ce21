//! Flexible parsing for the date shapes scanned documents actually carry.

use chrono::NaiveDate;

use crate::pipeline::rules::Ruleset;

/// Try every known date shape in order and return the first match that forms
/// a real calendar date. A match that fails the calendar check falls through
/// to the next shape.
pub fn parse_flexible_date(text: &str, rules: &Ruleset) -> Option<NaiveDate> {
    for pattern in &rules.date_formats {
        let Some(captures) = pattern.captures(text) else {
            continue;
        };
        if let Some(date) = date_from_groups(&captures[1], &captures[2], &captures[3]) {
            return Some(date);
        }
    }
    None
}

fn date_from_groups(first: &str, second: &str, third: &str) -> Option<NaiveDate> {
    let year = expand_year(third.parse().ok()?);

    let (month, day) = if let Some(month) = month_number(second) {
        // "15 Jan 2024"
        (month, first.parse().ok()?)
    } else if let Some(month) = month_number(first) {
        // "Jan 15, 2024"
        (month, second.parse().ok()?)
    } else {
        let a: u32 = first.parse().ok()?;
        let b: u32 = second.parse().ok()?;
        // Day-first only when the leading number cannot be a month.
        if a > 12 {
            (b, a)
        } else {
            (a, b)
        }
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

fn expand_year(year: i32) -> i32 {
    if year >= 100 {
        year
    } else if year < 50 {
        year + 2000
    } else {
        year + 1900
    }
}

fn month_number(token: &str) -> Option<u32> {
    match token.to_ascii_lowercase().as_str() {
        "jan" => Some(1),
        "feb" => Some(2),
        "mar" => Some(3),
        "apr" => Some(4),
        "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" => Some(8),
        "sep" => Some(9),
        "oct" => Some(10),
        "nov" => Some(11),
        "dec" => Some(12),
        _ => None,
    }
}
