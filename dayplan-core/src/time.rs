//! Clock helpers. Scheduler time is whole minutes after midnight.

use chrono::{NaiveTime, Timelike};

pub const MINUTES_PER_HOUR: u32 = 60;

pub fn hour_to_minutes(hour: u8) -> u32 {
    u32::from(hour) * MINUTES_PER_HOUR
}

/// Format a clock reading like `8h05`. Readings past midnight keep counting hours.
pub fn format_clock(minutes: u32) -> String {
    format!("{}h{:02}", minutes / 60, minutes % 60)
}

/// Parse "HH:MM" (24h) into minutes after midnight.
pub fn parse_clock(s: &str) -> Option<u32> {
    let t = NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()?;
    Some(t.hour() * 60 + t.minute())
}

/// `None` once the reading spills past the end of the day.
pub fn minutes_to_naive_time(minutes: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}
