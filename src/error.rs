use thiserror::Error;

/// Why a single raw record was left out of the snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidRecordError {
    #[error("record has no student id (rollNo, rollNumber or studentId)")]
    MissingStudentId,

    #[error("record date {raw:?} is not a calendar date")]
    InvalidDate { raw: String },

    #[error("record has neither a status nor an isPresent flag")]
    UnrecognizedShape,

    #[error("record is malformed: {0}")]
    Malformed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttendanceError {
    #[error("invalid month {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("a date window needs at least one day")]
    EmptyWindow,

    #[error("a {days}-day window ending {reference} runs past the supported calendar")]
    WindowOutOfRange {
        days: usize,
        reference: chrono::NaiveDate,
    },
}
