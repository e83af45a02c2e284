use chrono::{Datelike, Days, NaiveDate, Utc};

use crate::error::AttendanceError;

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// The `n` consecutive days ending at `reference` (inclusive), oldest first.
pub fn last_n_dates(n: usize, reference: NaiveDate) -> Result<Vec<NaiveDate>, AttendanceError> {
    if n == 0 {
        return Err(AttendanceError::EmptyWindow);
    }

    let start = reference
        .checked_sub_days(Days::new((n - 1) as u64))
        .ok_or(AttendanceError::WindowOutOfRange { days: n, reference })?;
    Ok(start.iter_days().take(n).collect())
}

pub fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, AttendanceError> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(AttendanceError::InvalidMonth { year, month })
}

pub fn days_in_month(year: i32, month: u32) -> Result<u32, AttendanceError> {
    let first = first_of_month(year, month)?;
    let (next_year, next_month) = shift_month(year, month, 1);
    let next = first_of_month(next_year, next_month)?;
    Ok((next - first).num_days() as u32)
}

/// Weekday of the given date, Sunday = 0.
pub fn day_of_week(year: i32, month: u32, day: u32) -> Result<u32, AttendanceError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .map(|date| date.weekday().num_days_from_sunday())
        .ok_or(AttendanceError::InvalidMonth { year, month })
}

/// Moves `delta` months from (year, month), rolling over year boundaries.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let total = year * 12 + (month as i32 - 1) + delta;
    (total.div_euclid(12), total.rem_euclid(12) as u32 + 1)
}
