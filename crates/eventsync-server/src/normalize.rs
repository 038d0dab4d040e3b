//! Date/time normalization for listing text.
//!
//! Listings carry dates like `"Sat, Jun 14"` and times like `"7:00 PM"`.
//! Neither has a year or a timezone: the year is supplied by the caller
//! (the current year, see [`current_year`]) and every instant is built in
//! [`EVENT_TIMEZONE`].
//!
//! Known limitation: a January listing scraped in December resolves to
//! January of the *current* year, i.e. in the past. No nearest-future-year
//! heuristic is applied.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// The single audience timezone every event is interpreted in.
pub const EVENT_TIMEZONE: Tz = chrono_tz::America::Los_Angeles;

/// Assumed length of an event when the source has no end time.
pub const DEFAULT_DURATION_HOURS: i64 = 2;

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Why a date/time fragment could not be turned into an instant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotParseable {
    #[error("date {0:?} does not match \"<Day>, <Mon> <D>\"")]
    DateShape(String),

    #[error("unknown month {0:?}")]
    Month(String),

    #[error("day {day:?} does not exist in month {month} of {year}")]
    Day { year: i32, month: u32, day: String },

    #[error("time {0:?} does not match \"<H>:<MM> <AM|PM>\"")]
    Time(String),

    #[error("local time {0} does not exist in the event timezone")]
    LocalTime(NaiveDateTime),

    #[error("end time must be after start time")]
    EndNotAfterStart,
}

/// Absolute start and end of an event, expressed in [`EVENT_TIMEZONE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTimes {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl EventTimes {
    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end.with_timezone(&Utc)
    }
}

/// Normalize listing date and time text into absolute instants.
///
/// Empty `time_text` means midnight. The end is always start + 2 hours.
pub fn normalize(
    date_text: &str,
    time_text: &str,
    reference_year: i32,
) -> Result<EventTimes, NotParseable> {
    let date = parse_listing_date(date_text, reference_year)?;
    let time = parse_listing_time(time_text)?;
    let start = localize(date.and_time(time))?;

    Ok(EventTimes {
        start,
        end: start + Duration::hours(DEFAULT_DURATION_HOURS),
    })
}

/// Normalize a form submission: `YYYY-MM-DD` date and 24-hour `HH:MM` times.
pub fn normalize_submission(
    date_text: &str,
    start_text: &str,
    end_text: Option<&str>,
) -> Result<EventTimes, NotParseable> {
    let date = NaiveDate::parse_from_str(date_text.trim(), "%Y-%m-%d")
        .map_err(|_| NotParseable::DateShape(date_text.to_string()))?;
    let start_time = parse_clock_24h(start_text)?;
    let start = localize(date.and_time(start_time))?;

    let end = match end_text.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => localize(date.and_time(parse_clock_24h(text)?))?,
        None => start + Duration::hours(DEFAULT_DURATION_HOURS),
    };

    if end <= start {
        return Err(NotParseable::EndNotAfterStart);
    }

    Ok(EventTimes { start, end })
}

/// The year listings are assumed to fall in.
pub fn current_year() -> i32 {
    Utc::now().with_timezone(&EVENT_TIMEZONE).year()
}

fn parse_listing_date(text: &str, year: i32) -> Result<NaiveDate, NotParseable> {
    let shape_err = || NotParseable::DateShape(text.to_string());

    let (_weekday, rest) = text.trim().split_once(',').ok_or_else(shape_err)?;
    let mut parts = rest.split_whitespace();
    let (month_text, day_text) = match (parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(d), None) => (m, d),
        _ => return Err(shape_err()),
    };

    let month = month_number(month_text).ok_or_else(|| NotParseable::Month(month_text.to_string()))?;
    let day_err = || NotParseable::Day {
        year,
        month,
        day: day_text.to_string(),
    };
    let day: u32 = day_text.parse().map_err(|_| day_err())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(day_err)
}

fn month_number(text: &str) -> Option<u32> {
    let key = text.trim_end_matches('.').to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == key)
        .map(|idx| idx as u32 + 1)
}

#[derive(Debug, Clone, Copy)]
enum Meridiem {
    Am,
    Pm,
}

fn parse_listing_time(text: &str) -> Result<NaiveTime, NotParseable> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(NaiveTime::MIN);
    }

    let time_err = || NotParseable::Time(text.to_string());
    let upper = trimmed.to_ascii_uppercase();
    let (clock, meridiem) = if let Some(clock) = upper.strip_suffix("AM") {
        (clock, Meridiem::Am)
    } else if let Some(clock) = upper.strip_suffix("PM") {
        (clock, Meridiem::Pm)
    } else {
        return Err(time_err());
    };

    let (hour, minute) = split_clock(clock.trim()).ok_or_else(time_err)?;
    if !(1..=12).contains(&hour) {
        return Err(time_err());
    }

    let hour = match (hour, meridiem) {
        (12, Meridiem::Am) => 0,
        (12, Meridiem::Pm) => 12,
        (h, Meridiem::Am) => h,
        (h, Meridiem::Pm) => h + 12,
    };

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(time_err)
}

fn parse_clock_24h(text: &str) -> Result<NaiveTime, NotParseable> {
    let time_err = || NotParseable::Time(text.to_string());
    let (hour, minute) = split_clock(text.trim()).ok_or_else(time_err)?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(time_err)
}

/// Split `"H:MM"` into hour and minute. Minutes must be two digits.
fn split_clock(clock: &str) -> Option<(u32, u32)> {
    let (hour, minute) = clock.split_once(':')?;
    if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
        return None;
    }
    let hour = hour.parse().ok()?;
    let minute = minute.parse().ok()?;
    if minute > 59 {
        return None;
    }
    Some((hour, minute))
}

// Ambiguous fall-back times resolve to the earlier instant; spring-forward
// gaps have no instant at all.
fn localize(naive: NaiveDateTime) -> Result<DateTime<Tz>, NotParseable> {
    EVENT_TIMEZONE
        .from_local_datetime(&naive)
        .earliest()
        .ok_or(NotParseable::LocalTime(naive))
}
