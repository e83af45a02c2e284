use chrono::NaiveDate;
use serde::Serialize;

use crate::index;
use crate::models::{AttendanceRecord, AttendanceStatus, DayRollup, SeriesPoint};
use crate::rollup;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterRow {
    pub student_id: String,
    pub student_name: Option<String>,
    pub statuses: Vec<Option<AttendanceStatus>>,
}

pub fn build_series(records: &[AttendanceRecord], days: &[NaiveDate]) -> Vec<SeriesPoint> {
    let by_date = index::index_by_date(records);

    days.iter()
        .map(|date| {
            let rollup = by_date
                .get(date)
                .map(|bucket| rollup::roll_up(bucket))
                .unwrap_or_else(|| rollup::roll_up(&[]));
            SeriesPoint {
                date: *date,
                status: rollup.status,
                count: rollup.count,
            }
        })
        .collect()
}

pub fn conflate_no_data(points: Vec<SeriesPoint>) -> Vec<SeriesPoint> {
    points
        .into_iter()
        .map(|point| {
            let rollup = DayRollup {
                status: point.status,
                count: point.count,
            }
            .conflated();
            SeriesPoint {
                date: point.date,
                status: rollup.status,
                count: rollup.count,
            }
        })
        .collect()
}

// Shorter ids first so numeric roll numbers sort naturally.
pub fn build_roster(records: &[AttendanceRecord], days: &[NaiveDate]) -> Vec<RosterRow> {
    let by_student = index::index_by_student_and_date(records);
    let mut students: Vec<&str> = by_student.keys().copied().collect();
    students.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

    students
        .into_iter()
        .map(|student| {
            let by_day = &by_student[student];
            let student_name = by_day
                .values()
                .find_map(|record| record.student_name.clone());
            RosterRow {
                student_id: student.to_string(),
                student_name,
                statuses: days
                    .iter()
                    .map(|date| by_day.get(date).map(|record| record.status))
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceStatus, RollupStatus};
    use crate::window;

    fn record(student: &str, day: u32, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            student_id: student.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            status,
            student_name: None,
        }
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()
    }

    #[test]
    fn single_student_week() {
        let records = vec![
            record("1", 15, AttendanceStatus::Present),
            record("1", 16, AttendanceStatus::Absent),
        ];
        let days = window::last_n_dates(7, reference()).unwrap();
        let series = build_series(&records, &days);

        assert_eq!(series.len(), 7);
        let dates: Vec<NaiveDate> = series.iter().map(|point| point.date).collect();
        assert_eq!(dates, days);
        assert_eq!(
            series.iter().filter(|point| point.status == RollupStatus::NoData).count(),
            5
        );
        assert_eq!(series[5].status, RollupStatus::Present);
        assert_eq!(series[5].count, 1);
        assert_eq!(series[6].status, RollupStatus::Absent);
        assert_eq!(series[6].count, 1);
    }

    #[test]
    fn class_series_rolls_up_each_day() {
        let records = vec![
            record("1", 15, AttendanceStatus::Present),
            record("2", 15, AttendanceStatus::Absent),
            record("3", 15, AttendanceStatus::Absent),
            record("1", 16, AttendanceStatus::Holiday),
            record("2", 16, AttendanceStatus::Holiday),
        ];
        let days = window::last_n_dates(2, reference()).unwrap();
        let series = build_series(&records, &days);
        assert_eq!((series[0].status, series[0].count), (RollupStatus::Absent, 2));
        assert_eq!((series[1].status, series[1].count), (RollupStatus::Holiday, 1));
    }

    #[test]
    fn empty_input_fills_the_window_with_no_data() {
        let days = window::last_n_dates(7, reference()).unwrap();
        let series = build_series(&[], &days);
        assert_eq!(series.len(), 7);
        assert!(series
            .iter()
            .all(|point| point.status == RollupStatus::NoData && point.count == 0));
    }

    #[test]
    fn conflation_turns_gaps_into_holidays() {
        let records = vec![record("1", 16, AttendanceStatus::Absent)];
        let days = window::last_n_dates(2, reference()).unwrap();
        let series = conflate_no_data(build_series(&records, &days));
        assert_eq!((series[0].status, series[0].count), (RollupStatus::Holiday, 1));
        assert_eq!((series[1].status, series[1].count), (RollupStatus::Absent, 1));
    }

    #[test]
    fn roster_has_a_cell_per_student_and_day() {
        let mut named = record("10", 15, AttendanceStatus::Present);
        named.student_name = Some("Avery Lee".to_string());
        let records = vec![
            named,
            record("2", 16, AttendanceStatus::Absent),
            record("10", 16, AttendanceStatus::Holiday),
            record("2", 16, AttendanceStatus::Present),
        ];
        let days = window::last_n_dates(2, reference()).unwrap();
        let roster = build_roster(&records, &days);

        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].student_id, "2");
        assert_eq!(roster[0].statuses, vec![None, Some(AttendanceStatus::Present)]);
        assert_eq!(roster[1].student_id, "10");
        assert_eq!(roster[1].student_name.as_deref(), Some("Avery Lee"));
        assert_eq!(
            roster[1].statuses,
            vec![Some(AttendanceStatus::Present), Some(AttendanceStatus::Holiday)]
        );
    }

    #[test]
    fn rebuilding_gives_the_same_series() {
        let records = vec![record("1", 15, AttendanceStatus::Present)];
        let days = window::last_n_dates(3, reference()).unwrap();
        assert_eq!(build_series(&records, &days), build_series(&records, &days));
    }
}
