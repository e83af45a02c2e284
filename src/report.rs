use std::fmt::Write;

use chrono::NaiveDate;

use crate::calendar;
use crate::error::AttendanceError;
use crate::models::{
    AttendanceRecord, AttendanceStatus, AttendanceSummary, CalendarCell, DayTally, MonthGrid,
    RollupStatus, SeriesPoint,
};
use crate::rollup;
use crate::series::{self, RosterRow};
use crate::stats;
use crate::window;

const BAR_WIDTH: f64 = 10.0;

/// Bar height for the attendance chart. Days without a decided status get
/// no bar at all.
pub fn chart_value(status: RollupStatus) -> Option<f64> {
    match status {
        RollupStatus::Present => Some(1.0),
        RollupStatus::Absent => Some(0.0),
        RollupStatus::Holiday => Some(0.5),
        RollupStatus::NoData => None,
    }
}

fn rollup_label(status: RollupStatus) -> &'static str {
    match status {
        RollupStatus::Present => "Present",
        RollupStatus::Absent => "Absent",
        RollupStatus::Holiday => "Holiday",
        RollupStatus::NoData => "No data",
    }
}

fn day_marker(status: Option<AttendanceStatus>) -> &'static str {
    match status {
        Some(AttendanceStatus::Present) => "P",
        Some(AttendanceStatus::Absent) => "A",
        Some(AttendanceStatus::Holiday) => "H",
        Some(AttendanceStatus::Unknown) => "?",
        None => "",
    }
}

pub fn render_summary(summary: &AttendanceSummary) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "- Present: {}", summary.present_count);
    let _ = writeln!(output, "- Absent: {}", summary.absent_count);
    let _ = writeln!(output, "- Holidays: {}", summary.holiday_count);
    let _ = writeln!(output, "- Working days: {}", summary.working_days);
    let _ = writeln!(output, "- Attendance rate: {}%", summary.attendance_rate);
    output
}

pub fn render_series(points: &[SeriesPoint]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "| Date | Status | Count | Chart |");
    let _ = writeln!(output, "|------|--------|-------|-------|");

    for point in points {
        let bar = match chart_value(point.status) {
            Some(value) => "#".repeat((value * BAR_WIDTH).round() as usize),
            None => "-".to_string(),
        };
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} |",
            point.date.format("%b %-d"),
            rollup_label(point.status),
            point.count,
            bar
        );
    }
    output
}

pub fn render_roster(rows: &[RosterRow], days: &[NaiveDate]) -> String {
    let mut output = String::new();
    let mut header = String::from("| Roll No | Name |");
    let mut divider = String::from("|---------|------|");
    for date in days {
        let _ = write!(header, " {} |", date.format("%b %-d"));
        divider.push_str("----|");
    }
    let _ = writeln!(output, "{header}");
    let _ = writeln!(output, "{divider}");

    for row in rows {
        let mut line = format!(
            "| {} | {} |",
            row.student_id,
            row.student_name.as_deref().unwrap_or("")
        );
        for status in &row.statuses {
            let _ = write!(line, " {} |", day_marker(*status));
        }
        let _ = writeln!(output, "{line}");
    }
    output
}

pub fn render_calendar(grid: &MonthGrid) -> String {
    let mut output = String::new();
    if let Ok(first) = window::first_of_month(grid.year, grid.month) {
        let _ = writeln!(output, "**{}**", first.format("%B %Y"));
        let _ = writeln!(output);
    }
    let _ = writeln!(output, "| Sun | Mon | Tue | Wed | Thu | Fri | Sat |");
    let _ = writeln!(output, "|-----|-----|-----|-----|-----|-----|-----|");

    for week in grid.weeks() {
        let mut line = String::from("|");
        for cell in week {
            match cell {
                CalendarCell::Blank => line.push_str("     |"),
                CalendarCell::Day { day, status } => {
                    let _ = write!(line, " {:>2}{:<1} |", day, day_marker(*status));
                }
            }
        }
        for _ in week.len()..7 {
            line.push_str("     |");
        }
        let _ = writeln!(output, "{line}");
    }

    let (prev_year, prev_month) = grid.previous();
    let (next_year, next_month) = grid.next();
    let _ = writeln!(output);
    let _ = writeln!(output, "P = present, A = absent, H = holiday, ? = unrecognized");
    let _ = writeln!(
        output,
        "Previous: {prev_year}-{prev_month:02}, next: {next_year}-{next_month:02}"
    );
    output
}

pub fn render_tally(tally: &DayTally) -> String {
    let total = tally.present + tally.absent;
    let share = |count: usize| stats::attendance_rate(count, total);
    let mut output = String::new();
    let _ = writeln!(output, "Attendance on {}", tally.date);
    let _ = writeln!(output, "- Present: {} ({}%)", tally.present, share(tally.present));
    let _ = writeln!(output, "- Absent: {} ({}%)", tally.absent, share(tally.absent));
    output
}

/// The calendar section only appears for a single student (`scope` set).
pub fn build_report(
    scope: Option<&str>,
    records: &[AttendanceRecord],
    days: &[NaiveDate],
    month: (i32, u32),
    today: NaiveDate,
) -> Result<String, AttendanceError> {
    let summary = stats::summarize(records);
    let points = series::build_series(records, days);
    let grid = match scope {
        Some(_) => Some(calendar::build_month_grid(records, month.0, month.1)?),
        None => None,
    };
    let tally = rollup::tally_day(records, today);

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all students");

    let _ = writeln!(output, "# Attendance Report");
    let _ = writeln!(output, "Generated for {} on {}", scope_label, today);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");

    if records.is_empty() {
        let _ = writeln!(output, "No attendance recorded.");
    } else {
        let _ = write!(output, "{}", render_summary(&summary));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Last {} Days", days.len());
    let _ = write!(output, "{}", render_series(&points));

    if let Some(grid) = &grid {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Calendar");
        let _ = write!(output, "{}", render_calendar(grid));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Today");
    let _ = write!(output, "{}", render_tally(&tally));

    Ok(output)
}
