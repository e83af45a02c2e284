use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::models::AttendanceRecord;

pub type StudentDateIndex<'a> = HashMap<&'a str, HashMap<NaiveDate, &'a AttendanceRecord>>;
pub type DateIndex<'a> = BTreeMap<NaiveDate, Vec<&'a AttendanceRecord>>;

/// student id -> day -> record. A later duplicate for the same student and
/// day replaces the earlier one.
pub fn index_by_student_and_date(records: &[AttendanceRecord]) -> StudentDateIndex<'_> {
    let mut index: StudentDateIndex<'_> = HashMap::new();
    for record in records {
        index
            .entry(record.student_id.as_str())
            .or_default()
            .insert(record.date, record);
    }
    index
}

/// day -> every record on that day, in input order.
pub fn index_by_date(records: &[AttendanceRecord]) -> DateIndex<'_> {
    let mut index: DateIndex<'_> = BTreeMap::new();
    for record in records {
        index.entry(record.date).or_default().push(record);
    }
    index
}
