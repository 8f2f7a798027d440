//! Timestamps from long-format listings.
//!
//! `ls -l` prints either `Mon DD HH:MM` (recent entries, no year) or
//! `Mon DD YYYY` (older entries, no time). The year of a recent entry is a
//! guess: the current year, or the previous one when the listed month lies
//! after the current month. This is a heuristic and will be wrong for
//! entries with timestamps in the future.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Month number (1-12) for a three letter English month abbreviation.
pub fn month_number(month: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(month))
        .map(|i| i as u32 + 1)
}

/// Rebuild the instant for a listing's `month day time-or-year` fields,
/// relative to `today`.
///
/// Returns `None` when the fields do not form a valid date.
pub fn listing_timestamp(
    month: &str,
    day: &str,
    time_or_year: &str,
    today: NaiveDate,
) -> Option<DateTime<Utc>> {
    let month = month_number(month)?;
    let day: u32 = day.parse().ok()?;

    let (year, time) = if time_or_year.contains(':') {
        let time = NaiveTime::parse_from_str(time_or_year, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(time_or_year, "%H:%M:%S"))
            .ok()?;
        let year = if month > today.month() {
            today.year() - 1
        } else {
            today.year()
        };
        (year, time)
    } else {
        (time_or_year.parse().ok()?, NaiveTime::default())
    };

    NaiveDate::from_ymd_opt(year, month, day).map(|date| date.and_time(time).and_utc())
}
