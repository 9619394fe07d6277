//! Calendar windows the health queries run over.

use chrono::{Days, NaiveDateTime};

use crate::error::HealthError;

use super::types::DateRange;

/// `[now - days, now)`.
pub fn trailing_days(now: NaiveDateTime, days: u32) -> Result<DateRange, HealthError> {
    let start = now
        .checked_sub_days(Days::new(u64::from(days)))
        .ok_or_else(|| HealthError::InvalidDate(format!("{days} days before {now}")))?;
    Ok(DateRange::new(start, now))
}

/// `[midnight, midnight + 1 day)` of the calendar day containing `now`.
pub fn day_window(now: NaiveDateTime) -> Result<DateRange, HealthError> {
    let start = now
        .date()
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| HealthError::InvalidDate(format!("start of day for {now}")))?;
    let end = start
        .checked_add_days(Days::new(1))
        .ok_or_else(|| HealthError::InvalidDate(format!("end of day for {now}")))?;
    Ok(DateRange::new(start, end))
}
