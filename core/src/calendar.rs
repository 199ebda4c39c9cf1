//! Calendar week-window computation
//!
//! The mailbox view shows a short peek at this week's events. The window
//! opens on the Sunday of the current week in the mailbox time zone, at
//! the current wall-clock time, and spans two days.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Utc};

/// Days covered by the events peek
pub const WINDOW_DAYS: i64 = 2;

/// Half-open UTC time window for a calendar view query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarWindow {
    /// Window start
    pub start: DateTime<Utc>,
    /// Window end
    pub end: DateTime<Utc>,
}

/// Compute the events-peek window for `now`.
///
/// `now` is shifted into the mailbox offset, walked back to the Sunday of
/// that week (keeping the wall-clock time), and converted back to UTC.
pub fn week_window(now: DateTime<Utc>, mailbox_offset: FixedOffset) -> CalendarWindow {
    let local = now.with_timezone(&mailbox_offset);
    let days_back = i64::from(local.weekday().num_days_from_sunday());
    let start = (local - Duration::days(days_back)).with_timezone(&Utc);
    CalendarWindow {
        start,
        end: start + Duration::days(WINDOW_DAYS),
    }
}
