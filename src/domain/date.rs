//! PHP-style `date()` formatting, as used by `date("j") == 17` conditions.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike};

/// Format `dt` with PHP date format codes.
///
/// Supported: `d D j l N w z W F m M n t L Y y a A g G h H i s U`.
/// A backslash escapes the following character; unknown characters are
/// copied verbatim.
pub fn php_date(format: &str, dt: &DateTime<FixedOffset>) -> String {
    let mut out = String::new();
    let mut chars = format.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            'd' => out.push_str(&format!("{:02}", dt.day())),
            'D' => out.push_str(&dt.format("%a").to_string()),
            'j' => out.push_str(&dt.day().to_string()),
            'l' => out.push_str(&dt.format("%A").to_string()),
            'N' => out.push_str(&dt.weekday().number_from_monday().to_string()),
            'w' => out.push_str(&dt.weekday().num_days_from_sunday().to_string()),
            'z' => out.push_str(&dt.ordinal0().to_string()),
            'W' => out.push_str(&format!("{:02}", dt.iso_week().week())),
            'F' => out.push_str(&dt.format("%B").to_string()),
            'm' => out.push_str(&format!("{:02}", dt.month())),
            'M' => out.push_str(&dt.format("%b").to_string()),
            'n' => out.push_str(&dt.month().to_string()),
            't' => out.push_str(&days_in_month(dt.year(), dt.month()).to_string()),
            'L' => out.push(if is_leap_year(dt.year()) { '1' } else { '0' }),
            'Y' => out.push_str(&dt.year().to_string()),
            'y' => out.push_str(&format!("{:02}", dt.year().rem_euclid(100))),
            'a' => out.push_str(if dt.hour() < 12 { "am" } else { "pm" }),
            'A' => out.push_str(if dt.hour() < 12 { "AM" } else { "PM" }),
            'g' => out.push_str(&dt.hour12().1.to_string()),
            'G' => out.push_str(&dt.hour().to_string()),
            'h' => out.push_str(&format!("{:02}", dt.hour12().1)),
            'H' => out.push_str(&format!("{:02}", dt.hour())),
            'i' => out.push_str(&format!("{:02}", dt.minute())),
            's' => out.push_str(&format!("{:02}", dt.second())),
            'U' => out.push_str(&dt.timestamp().to_string()),
            other => out.push(other),
        }
    }
    out
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(31)
}
