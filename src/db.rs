use anyhow::Context;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::ingest::{self, RawAttendanceRecord, StudentKey};
use crate::models::AttendanceStatus;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool, today: NaiveDate) -> anyhow::Result<usize> {
    let students = vec![
        ("2021001", "Avery Lee"),
        ("2021002", "Jules Moreno"),
        ("2021003", "Kiara Patel"),
    ];

    for (roll_no, name) in students.iter() {
        upsert_student(pool, roll_no, Some(*name)).await?;
    }

    // A week ending today: weekends are holidays, weekdays rotate absences.
    let mut inserted = 0usize;
    for offset in 0..7i64 {
        let day = today - Duration::days(6 - offset);
        let weekend = matches!(day.weekday(), Weekday::Sat | Weekday::Sun);

        for (position, (roll_no, _)) in students.iter().enumerate() {
            let status = if weekend {
                AttendanceStatus::Holiday
            } else if (offset as usize + position) % 4 == 0 {
                AttendanceStatus::Absent
            } else {
                AttendanceStatus::Present
            };
            let source_key = format!("seed-{roll_no}-{day}");
            if insert_attendance(pool, roll_no, start_of_day(day), status, &source_key).await? {
                inserted += 1;
            }
        }
    }

    Ok(inserted)
}

/// Loads raw records, optionally narrowed to one roll number. Rows go through
/// the same ingestion adapter as any other record source.
pub async fn fetch_records(
    pool: &PgPool,
    roll_no: Option<&str>,
) -> anyhow::Result<Vec<RawAttendanceRecord>> {
    let mut query = String::from(
        "SELECT a.roll_no, s.full_name, a.attended_at, a.status \
         FROM attendance_dashboard.attendance a \
         LEFT JOIN attendance_dashboard.students s ON s.roll_no = a.roll_no",
    );

    if roll_no.is_some() {
        query.push_str(" WHERE a.roll_no = $1");
    }
    query.push_str(" ORDER BY a.attended_at, a.created_at");

    let mut rows = sqlx::query(&query);
    if let Some(value) = roll_no {
        rows = rows.bind(value);
    }

    let records = rows
        .fetch_all(pool)
        .await
        .context("failed to load attendance records")?;
    let mut raws = Vec::with_capacity(records.len());

    for row in records {
        let attended_at: DateTime<Utc> = row.get("attended_at");
        raws.push(RawAttendanceRecord {
            student_id: Some(StudentKey::Text(row.get("roll_no"))),
            date: Some(attended_at.to_rfc3339()),
            status: Some(row.get("status")),
            name: row.get("full_name"),
            ..RawAttendanceRecord::default()
        });
    }

    tracing::debug!(rows = raws.len(), roll_no, "fetched attendance rows");
    Ok(raws)
}

pub async fn mark_attendance(
    pool: &PgPool,
    roll_no: &str,
    status: AttendanceStatus,
    at: DateTime<Utc>,
) -> anyhow::Result<()> {
    upsert_student(pool, roll_no, None).await?;
    let source_key = format!("mark-{}", Uuid::new_v4());
    insert_attendance(pool, roll_no, at, status, &source_key).await?;
    tracing::info!(roll_no, status = status.as_str(), %at, "attendance marked");
    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        roll_no: String,
        full_name: Option<String>,
        date: String,
        status: String,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let day = ingest::parse_day(&row.date)
            .with_context(|| format!("row {} has a bad date", line + 1))?;
        let status = AttendanceStatus::parse(&row.status);
        if status == AttendanceStatus::Unknown {
            tracing::warn!(row = line + 1, status = %row.status, "importing unrecognized status");
        }

        upsert_student(pool, &row.roll_no, row.full_name.as_deref()).await?;
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}-{}", row.roll_no, day));

        if insert_attendance(pool, &row.roll_no, start_of_day(day), status, &source_key).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

async fn upsert_student(pool: &PgPool, roll_no: &str, name: Option<&str>) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO attendance_dashboard.students (roll_no, full_name)
        VALUES ($1, $2)
        ON CONFLICT (roll_no) DO UPDATE
        SET full_name = COALESCE(EXCLUDED.full_name, attendance_dashboard.students.full_name)
        "#,
    )
    .bind(roll_no)
    .bind(name)
    .execute(pool)
    .await?;
    Ok(())
}

async fn insert_attendance(
    pool: &PgPool,
    roll_no: &str,
    at: DateTime<Utc>,
    status: AttendanceStatus,
    source_key: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendance_dashboard.attendance
        (id, roll_no, attended_at, status, source_key)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(roll_no)
    .bind(at)
    .bind(status.as_str())
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}
