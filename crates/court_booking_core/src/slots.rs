//! crates/court_booking_core/src/slots.rs
//!
//! The fixed daily slot grid and the clock-string arithmetic used by
//! admission and recurrence expansion.

use chrono::{Datelike, NaiveDate, NaiveTime};

/// First bookable hour of the day (inclusive).
pub const OPENING_HOUR: u32 = 17;
/// Hour bookings stop; the last slot starts one hour before this.
pub const CLOSING_HOUR: u32 = 23;

/// All slot start times for one day, in order: "17:00" through "22:00".
pub fn slot_times() -> Vec<String> {
    (OPENING_HOUR..CLOSING_HOUR)
        .map(|hour| format!("{hour:02}:00"))
        .collect()
}

/// Truncate a stored clock string to hour:minute precision. Stored
/// values may carry seconds ("18:00:00"); slot comparison ignores them.
pub fn to_hhmm(time: &str) -> &str {
    if time.len() > 5 { &time[..5] } else { time }
}

/// End of the one-hour slot starting at `start`. The booking window
/// never crosses midnight, so no wrap handling is needed. `None` if
/// `start` is not a parseable clock string.
pub fn slot_end(start: &str) -> Option<String> {
    let mut parts = start.split(':');
    let hour: u32 = parts.next()?.parse().ok()?;
    let minute = parts.next().unwrap_or("00");
    Some(format!("{:02}:{}", hour + 1, minute))
}

/// Weekday index (0 = Sunday .. 6 = Saturday) for a calendar date.
///
/// The date is anchored at noon before the arithmetic. Midnight
/// timestamps can shift a day when serialized across a timezone
/// boundary; noon absorbs the skew.
pub fn weekday_index(date: NaiveDate) -> u8 {
    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
    date.and_time(noon).weekday().num_days_from_sunday() as u8
}
