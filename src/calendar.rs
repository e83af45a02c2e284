use chrono::{Datelike, NaiveDate};

use crate::error::AttendanceError;
use crate::index;
use crate::models::{AttendanceRecord, CalendarCell, MonthGrid};
use crate::window;

/// Expects one student's records. When several share a day the last wins.
pub fn build_month_grid(
    records: &[AttendanceRecord],
    year: i32,
    month: u32,
) -> Result<MonthGrid, AttendanceError> {
    let leading = window::day_of_week(year, month, 1)?;
    let days = window::days_in_month(year, month)?;
    let by_date = index::index_by_date(records);

    let mut cells = Vec::with_capacity((leading + days) as usize);
    cells.extend((0..leading).map(|_| CalendarCell::Blank));

    for day in 1..=days {
        let status = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| by_date.get(&date))
            .and_then(|bucket| bucket.last())
            .map(|record| record.status);
        cells.push(CalendarCell::Day { day, status });
    }

    Ok(MonthGrid { year, month, cells })
}

// Opens on the month of the last record in input order.
pub fn default_month(records: &[AttendanceRecord], today: NaiveDate) -> (i32, u32) {
    let anchor = records.last().map(|record| record.date).unwrap_or(today);
    (anchor.year(), anchor.month())
}

impl MonthGrid {
    pub fn weeks(&self) -> Vec<&[CalendarCell]> {
        self.cells.chunks(7).collect()
    }

    pub fn previous(&self) -> (i32, u32) {
        window::shift_month(self.year, self.month, -1)
    }

    pub fn next(&self) -> (i32, u32) {
        window::shift_month(self.year, self.month, 1)
    }
}
