use crate::models::{AttendanceRecord, AttendanceStatus, AttendanceSummary};

// Unknown statuses count as neither holidays nor working days.
pub fn summarize(records: &[AttendanceRecord]) -> AttendanceSummary {
    let mut summary = AttendanceSummary::default();

    for record in records {
        match record.status {
            AttendanceStatus::Present => summary.present_count += 1,
            AttendanceStatus::Absent => summary.absent_count += 1,
            AttendanceStatus::Holiday => summary.holiday_count += 1,
            AttendanceStatus::Unknown => {}
        }
    }

    summary.working_days = summary.present_count + summary.absent_count;
    summary.attendance_rate = attendance_rate(summary.present_count, summary.working_days);
    summary
}

pub fn attendance_rate(present: usize, working_days: usize) -> u32 {
    if working_days == 0 {
        return 0;
    }
    // Integer half-up; float division misses exact halves such as 23/40.
    ((present * 200 + working_days) / (2 * working_days)) as u32
}
