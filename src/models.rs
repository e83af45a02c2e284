use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Holiday,
    /// Any status string the record source sent that we do not recognize.
    Unknown,
}

impl AttendanceStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "present" => AttendanceStatus::Present,
            "absent" => AttendanceStatus::Absent,
            "holiday" => AttendanceStatus::Holiday,
            _ => AttendanceStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Holiday => "holiday",
            AttendanceStatus::Unknown => "unknown",
        }
    }
}

impl From<bool> for AttendanceStatus {
    fn from(is_present: bool) -> Self {
        if is_present {
            AttendanceStatus::Present
        } else {
            AttendanceStatus::Absent
        }
    }
}

/// Canonical attendance event, produced by the ingestion adapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceRecord {
    pub student_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub student_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RollupStatus {
    Present,
    Absent,
    Holiday,
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayRollup {
    pub status: RollupStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalendarCell {
    Blank,
    Day {
        day: u32,
        /// `None` when the student has no record for the day.
        status: Option<AttendanceStatus>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub cells: Vec<CalendarCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub status: RollupStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayTally {
    pub date: NaiveDate,
    pub present: usize,
    pub absent: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    pub present_count: usize,
    pub absent_count: usize,
    pub holiday_count: usize,
    pub working_days: usize,
    pub attendance_rate: u32,
}
