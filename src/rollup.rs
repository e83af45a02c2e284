use chrono::NaiveDate;

use crate::models::{AttendanceRecord, AttendanceStatus, DayRollup, DayTally, RollupStatus};

/// An all-holiday bucket is `(Holiday, 1)` however many records it holds.
/// Otherwise ties go to present (`present >= absent`), and holiday or unknown
/// records in a mixed bucket are not counted. A bucket with nothing
/// countable is `(NoData, 0)`, not a holiday.
pub fn roll_up(bucket: &[&AttendanceRecord]) -> DayRollup {
    let relevant: Vec<AttendanceStatus> = bucket
        .iter()
        .map(|record| record.status)
        .filter(|status| *status != AttendanceStatus::Unknown)
        .collect();

    if relevant.is_empty() {
        return DayRollup {
            status: RollupStatus::NoData,
            count: 0,
        };
    }

    if relevant.iter().all(|status| *status == AttendanceStatus::Holiday) {
        return DayRollup {
            status: RollupStatus::Holiday,
            count: 1,
        };
    }

    let present = count(&relevant, AttendanceStatus::Present);
    let absent = count(&relevant, AttendanceStatus::Absent);

    if present >= absent {
        DayRollup {
            status: RollupStatus::Present,
            count: present,
        }
    } else {
        DayRollup {
            status: RollupStatus::Absent,
            count: absent,
        }
    }
}

impl DayRollup {
    /// Empty days drawn as holidays, the older dashboard view.
    pub fn conflated(self) -> DayRollup {
        match self.status {
            RollupStatus::NoData => DayRollup {
                status: RollupStatus::Holiday,
                count: 1,
            },
            _ => self,
        }
    }
}

pub fn tally_day(records: &[AttendanceRecord], date: NaiveDate) -> DayTally {
    let on_day: Vec<AttendanceStatus> = records
        .iter()
        .filter(|record| record.date == date)
        .map(|record| record.status)
        .collect();

    DayTally {
        date,
        present: count(&on_day, AttendanceStatus::Present),
        absent: count(&on_day, AttendanceStatus::Absent),
    }
}

fn count(statuses: &[AttendanceStatus], wanted: AttendanceStatus) -> usize {
    statuses.iter().filter(|status| **status == wanted).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceStatus::{Absent, Holiday, Present, Unknown};

    fn bucket(statuses: &[AttendanceStatus]) -> Vec<AttendanceRecord> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, status)| AttendanceRecord {
                student_id: (i + 1).to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                status: *status,
                student_name: None,
            })
            .collect()
    }

    fn rollup_of(statuses: &[AttendanceStatus]) -> DayRollup {
        let records = bucket(statuses);
        let refs: Vec<&AttendanceRecord> = records.iter().collect();
        roll_up(&refs)
    }

    #[test]
    fn tie_goes_to_present() {
        let rollup = rollup_of(&[Present, Absent, Absent, Present]);
        assert_eq!(rollup, DayRollup { status: RollupStatus::Present, count: 2 });
    }

    #[test]
    fn majority_absent_reports_absent_count() {
        let rollup = rollup_of(&[Present, Absent, Absent]);
        assert_eq!(rollup, DayRollup { status: RollupStatus::Absent, count: 2 });
    }

    #[test]
    fn all_holiday_bucket_counts_once() {
        let rollup = rollup_of(&[Holiday, Holiday, Holiday]);
        assert_eq!(rollup, DayRollup { status: RollupStatus::Holiday, count: 1 });
    }

    #[test]
    fn holidays_in_a_mixed_bucket_are_ignored() {
        let rollup = rollup_of(&[Holiday, Absent, Holiday]);
        assert_eq!(rollup, DayRollup { status: RollupStatus::Absent, count: 1 });
    }

    #[test]
    fn unknown_statuses_do_not_count() {
        assert_eq!(
            rollup_of(&[Unknown, Holiday]),
            DayRollup { status: RollupStatus::Holiday, count: 1 }
        );
        assert_eq!(rollup_of(&[Unknown]), DayRollup { status: RollupStatus::NoData, count: 0 });
    }

    #[test]
    fn empty_bucket_is_no_data_unless_conflated() {
        let rollup = roll_up(&[]);
        assert_eq!(rollup, DayRollup { status: RollupStatus::NoData, count: 0 });
        assert_eq!(rollup.conflated(), DayRollup { status: RollupStatus::Holiday, count: 1 });
        let present = rollup_of(&[Present]);
        assert_eq!(present.conflated(), present);
    }

    #[test]
    fn tally_counts_only_the_requested_day() {
        let mut records = bucket(&[Present, Present, Absent, Holiday]);
        records.push(AttendanceRecord {
            student_id: "9".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
            status: Absent,
            student_name: None,
        });
        let tally = tally_day(&records, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(tally.present, 2);
        assert_eq!(tally.absent, 1);
    }
}
