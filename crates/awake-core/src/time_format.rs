//! Display helpers for wall-clock times and countdowns.
//!
//! All functions are pure; `now` is always passed in.

use chrono::{Duration, NaiveDateTime, NaiveTime};

use crate::alarm::validate_time;
use crate::error::ValidationError;

/// `HH:MM` in 24-hour mode, `h:MM AM|PM` otherwise.
///
/// ```
/// use awake_core::time_format::format_time;
/// assert_eq!(format_time(13, 5, false), "1:05 PM");
/// assert_eq!(format_time(0, 0, false), "12:00 AM");
/// assert_eq!(format_time(7, 30, true), "07:30");
/// ```
pub fn format_time(hour: u8, minute: u8, use_24_hour: bool) -> String {
    if use_24_hour {
        return format!("{hour:02}:{minute:02}");
    }
    let period = if hour >= 12 { "PM" } else { "AM" };
    let display_hour = match hour {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    format!("{display_hour}:{minute:02} {period}")
}

/// Countdown to the next occurrence of `hour:minute`, e.g. `"in 7h 5m"`.
///
/// A time equal to `now` (to the minute) counts as passed and rolls over to
/// tomorrow. Partial minutes are truncated.
pub fn time_until(hour: u8, minute: u8, now: NaiveDateTime) -> String {
    let Some(time) = NaiveTime::from_hms_opt(hour as u32, minute as u32, 0) else {
        return String::new();
    };
    let mut target = now.date().and_time(time);
    if target <= now {
        target += Duration::days(1);
    }
    format_countdown(target - now)
}

/// `"in Xh Ym"`, or `"in Ym"` under an hour. Hours are not folded into days.
pub fn format_countdown(span: Duration) -> String {
    let total_minutes = span.num_minutes().max(0);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!("in {hours}h {minutes}m")
    } else {
        format!("in {minutes}m")
    }
}

/// `m:ss` for the ringing screen's elapsed counter.
pub fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Convert a 12-hour picker value (1..=12) and AM/PM flag to 24-hour.
pub fn to_24_hour(hour12: u8, pm: bool) -> Result<u8, ValidationError> {
    if !(1..=12).contains(&hour12) {
        return Err(ValidationError::OutOfRange {
            field: "hour",
            value: hour12 as u32,
            min: 1,
            max: 12,
        });
    }
    Ok(match (hour12, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    })
}

/// Parse `HH:MM`, `H:MM`, or `h:MM AM|PM` (case-insensitive) into 24-hour
/// `(hour, minute)`.
pub fn parse_time(input: &str) -> Result<(u8, u8), ValidationError> {
    let invalid = || ValidationError::InvalidValue {
        field: "time".into(),
        message: format!("expected HH:MM or h:MM AM/PM, got '{input}'"),
    };

    let trimmed = input.trim();
    let upper = trimmed.to_ascii_uppercase();
    let (clock, pm) = if let Some(rest) = upper.strip_suffix("AM") {
        (rest.trim_end(), Some(false))
    } else if let Some(rest) = upper.strip_suffix("PM") {
        (rest.trim_end(), Some(true))
    } else {
        (upper.as_str(), None)
    };

    let (h, m) = clock.split_once(':').ok_or_else(invalid)?;
    if m.len() != 2 || h.is_empty() || h.len() > 2 {
        return Err(invalid());
    }
    let hour: u8 = h.parse().map_err(|_| invalid())?;
    let minute: u8 = m.parse().map_err(|_| invalid())?;

    let hour = match pm {
        Some(pm) => to_24_hour(hour, pm)?,
        None => hour,
    };
    validate_time(hour, minute)?;
    Ok((hour, minute))
}
