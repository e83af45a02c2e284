use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::error::InvalidRecordError;
use crate::models::{AttendanceRecord, AttendanceStatus};

/// A record as the record source sends it. Both observed shapes land here:
/// `{rollNo, attendanceDate, status, student}` and `{rollNumber, date, isPresent, name}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAttendanceRecord {
    #[serde(alias = "rollNo", alias = "rollNumber")]
    pub student_id: Option<StudentKey>,
    #[serde(alias = "attendanceDate")]
    pub date: Option<String>,
    pub status: Option<String>,
    pub is_present: Option<bool>,
    pub name: Option<String>,
    pub student: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StudentKey {
    Number(i64),
    Text(String),
}

impl StudentKey {
    fn normalized(&self) -> Option<String> {
        let value = match self {
            StudentKey::Number(n) => n.to_string(),
            StudentKey::Text(s) => s.trim().to_string(),
        };
        (!value.is_empty()).then_some(value)
    }
}

#[derive(Debug, Default)]
pub struct Ingested {
    pub records: Vec<AttendanceRecord>,
    pub skipped: usize,
    /// Input position and reason for every skipped record.
    pub errors: Vec<(usize, InvalidRecordError)>,
}

pub fn normalize(raw: RawAttendanceRecord) -> Result<AttendanceRecord, InvalidRecordError> {
    let student_id = raw
        .student_id
        .as_ref()
        .and_then(StudentKey::normalized)
        .ok_or(InvalidRecordError::MissingStudentId)?;

    let date_raw = raw.date.as_deref().unwrap_or_default();
    let date = parse_day(date_raw)?;

    let status = match (raw.status.as_deref(), raw.is_present) {
        (Some(status), _) => AttendanceStatus::parse(status),
        (None, Some(is_present)) => AttendanceStatus::from(is_present),
        (None, None) => return Err(InvalidRecordError::UnrecognizedShape),
    };

    let student_name = raw.name.or_else(|| {
        raw.student
            .as_ref()
            .and_then(|student| student.get("name"))
            .and_then(|name| name.as_str())
            .map(str::to_string)
    });

    Ok(AttendanceRecord {
        student_id,
        date,
        status,
        student_name,
    })
}

/// Truncates a date or timestamp to its calendar day.
pub fn parse_day(raw: &str) -> Result<NaiveDate, InvalidRecordError> {
    let value = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"] {
        if let Ok(timestamp) = DateTime::parse_from_str(value, format) {
            return Ok(timestamp.date_naive());
        }
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(timestamp.date());
        }
    }
    Err(InvalidRecordError::InvalidDate {
        raw: raw.to_string(),
    })
}

pub fn ingest(raws: Vec<RawAttendanceRecord>) -> Ingested {
    collect(raws.into_iter().map(Ok))
}

/// Ingests untyped JSON values; a value that does not even fit the raw
/// shape is skipped like any other invalid record.
pub fn ingest_values(values: Vec<serde_json::Value>) -> Ingested {
    collect(values.into_iter().map(|value| {
        serde_json::from_value::<RawAttendanceRecord>(value)
            .map_err(|err| InvalidRecordError::Malformed(err.to_string()))
    }))
}

fn collect<I>(raws: I) -> Ingested
where
    I: Iterator<Item = Result<RawAttendanceRecord, InvalidRecordError>>,
{
    let mut ingested = Ingested::default();

    for (position, raw) in raws.enumerate() {
        match raw.and_then(normalize) {
            Ok(record) => ingested.records.push(record),
            Err(err) => {
                tracing::warn!(position, error = %err, "skipping attendance record");
                ingested.skipped += 1;
                ingested.errors.push((position, err));
            }
        }
    }

    tracing::info!(
        accepted = ingested.records.len(),
        skipped = ingested.skipped,
        "ingested attendance records"
    );
    ingested
}

/// Reads a JSON array of attendance records in either source shape.
pub fn load_json(path: &Path) -> anyhow::Result<Ingested> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let values: Vec<serde_json::Value> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array", path.display()))?;
    Ok(ingest_values(values))
}

/// Narrows the snapshot to one student. An empty query keeps everything.
pub fn filter_by_student(records: &[AttendanceRecord], query: &str) -> Vec<AttendanceRecord> {
    let query = query.trim();
    if query.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|record| record.student_id == query)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn accepts_status_shape() {
        let ingested = ingest_values(vec![json!({
            "attendanceID": 4,
            "rollNo": 12,
            "attendanceDate": "2024-01-15T09:30:00",
            "status": "Present",
            "student": {"name": "Avery Lee"}
        })]);
        assert_eq!(ingested.skipped, 0);
        let record = &ingested.records[0];
        assert_eq!(record.student_id, "12");
        assert_eq!(record.date, date(2024, 1, 15));
        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(record.student_name.as_deref(), Some("Avery Lee"));
    }

    #[test]
    fn accepts_legacy_boolean_shape() {
        let ingested = ingest_values(vec![
            json!({"name": "John Doe", "rollNumber": "2021001", "date": "2024-01-16", "isPresent": false}),
            json!({"name": "John Doe", "rollNumber": "2021001", "date": "2024-01-17", "isPresent": true}),
        ]);
        assert_eq!(ingested.records.len(), 2);
        assert_eq!(ingested.records[0].status, AttendanceStatus::Absent);
        assert_eq!(ingested.records[1].status, AttendanceStatus::Present);
        assert_eq!(ingested.records[0].student_id, "2021001");
    }

    #[test]
    fn unrecognized_status_string_is_kept_as_unknown() {
        let ingested = ingest_values(vec![json!({"studentId": 1, "date": "2024-01-15", "status": "late"})]);
        assert_eq!(ingested.skipped, 0);
        assert_eq!(ingested.records[0].status, AttendanceStatus::Unknown);
    }

    #[test]
    fn bad_records_are_skipped_without_blocking_the_rest() {
        let ingested = ingest_values(vec![
            json!({"rollNo": 1, "attendanceDate": "not a date", "status": "present"}),
            json!({"rollNo": 1, "attendanceDate": "2024-01-15"}),
            json!({"attendanceDate": "2024-01-15", "status": "absent"}),
            json!("garbage"),
            json!({"rollNo": 2, "attendanceDate": "2024-01-15", "status": "absent"}),
        ]);
        assert_eq!(ingested.records.len(), 1);
        assert_eq!(ingested.skipped, 4);
        assert_eq!(
            ingested.errors[0],
            (0, InvalidRecordError::InvalidDate { raw: "not a date".to_string() })
        );
        assert_eq!(ingested.errors[1], (1, InvalidRecordError::UnrecognizedShape));
        assert_eq!(ingested.errors[2], (2, InvalidRecordError::MissingStudentId));
        assert!(matches!(ingested.errors[3], (3, InvalidRecordError::Malformed(_))));
    }

    #[test]
    fn timestamps_truncate_to_their_written_day() {
        assert_eq!(parse_day("2024-01-15T23:45:00+05:30").unwrap(), date(2024, 1, 15));
        assert_eq!(parse_day("2024-01-15T23:45:00.123Z").unwrap(), date(2024, 1, 15));
        assert_eq!(parse_day(" 2024-02-29 ").unwrap(), date(2024, 2, 29));
        assert!(parse_day("2023-02-29").is_err());
    }

    #[test]
    fn timestamps_without_seconds_or_offset_colon_are_accepted() {
        assert_eq!(parse_day("2024-01-15T09:30").unwrap(), date(2024, 1, 15));
        assert_eq!(parse_day("2024-01-15T23:45:00+0530").unwrap(), date(2024, 1, 15));
        assert_eq!(parse_day("2024-01-15T23:45:00.250-0800").unwrap(), date(2024, 1, 15));
        assert_eq!(parse_day("2024-01-15T09:30+0100").unwrap(), date(2024, 1, 15));
    }

    #[test]
    fn empty_filter_keeps_the_full_snapshot() {
        let ingested = ingest_values(vec![
            json!({"rollNo": 1, "attendanceDate": "2024-01-15", "status": "present"}),
            json!({"rollNo": 2, "attendanceDate": "2024-01-15", "status": "absent"}),
        ]);
        assert_eq!(filter_by_student(&ingested.records, "  ").len(), 2);
        let only_two = filter_by_student(&ingested.records, " 2 ");
        assert_eq!(only_two.len(), 1);
        assert_eq!(only_two[0].status, AttendanceStatus::Absent);
    }
}
