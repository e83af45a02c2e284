use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

mod calendar;
mod db;
mod error;
mod index;
mod ingest;
mod models;
mod observability;
mod report;
mod rollup;
mod series;
mod stats;
mod window;

use crate::ingest::Ingested;
use crate::models::AttendanceStatus;

#[derive(Parser)]
#[command(name = "attendance-dashboard")]
#[command(about = "Student attendance views: calendar, daily series, tallies and totals", long_about = None)]
struct Cli {
    /// Postgres database holding attendance records
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,
    /// Read records from a JSON array instead of the database
    #[arg(long, global = true)]
    input: Option<PathBuf>,
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum MarkStatus {
    Present,
    Absent,
}

impl From<MarkStatus> for AttendanceStatus {
    fn from(status: MarkStatus) -> Self {
        match status {
            MarkStatus::Present => AttendanceStatus::Present,
            MarkStatus::Absent => AttendanceStatus::Absent,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo week of attendance
    Seed,
    /// Import attendance rows from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Record a student as present or absent
    Mark {
        roll_no: String,
        #[arg(value_enum)]
        status: MarkStatus,
        /// Day to record instead of now
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Month calendar for one student
    Calendar {
        #[arg(long)]
        roll_no: String,
        /// YYYY-MM; defaults to the month of the last record
        #[arg(long)]
        month: Option<String>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Per-day rollup over the last N days
    Series {
        #[arg(long, default_value = "")]
        roll_no: String,
        #[arg(long, default_value_t = 7)]
        days: usize,
        #[arg(long)]
        until: Option<NaiveDate>,
        /// Show days without records as holidays
        #[arg(long)]
        no_data_as_holiday: bool,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Student-by-day status table over the last N days
    Table {
        #[arg(long, default_value = "")]
        roll_no: String,
        #[arg(long, default_value_t = 7)]
        days: usize,
        #[arg(long)]
        until: Option<NaiveDate>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Present and absent counts for one day
    Tally {
        #[arg(long, default_value = "")]
        roll_no: String,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Present, absent and holiday totals with the attendance rate
    Summary {
        #[arg(long, default_value = "")]
        roll_no: String,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Write a markdown report
    Report {
        #[arg(long, default_value = "")]
        roll_no: String,
        #[arg(long, default_value_t = 7)]
        days: usize,
        #[arg(long, default_value = "attendance-report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    observability::init_logging(&cli.log_level, cli.log_json)?;
    let today = window::today();

    match cli.command {
        Commands::InitDb => {
            let pool = connect(cli.database_url.as_deref()).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(cli.database_url.as_deref()).await?;
            let inserted = db::seed(&pool, today).await?;
            println!("Seed data inserted ({inserted} records).");
        }
        Commands::Import { csv } => {
            let pool = connect(cli.database_url.as_deref()).await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} records from {}.", csv.display());
        }
        Commands::Mark {
            roll_no,
            status,
            date,
        } => {
            let roll_no = roll_no.trim();
            anyhow::ensure!(!roll_no.is_empty(), "Please enter a roll number");
            let pool = connect(cli.database_url.as_deref()).await?;
            let at = date
                .map(|day| day.and_time(chrono::NaiveTime::MIN).and_utc())
                .unwrap_or_else(Utc::now);
            let status = AttendanceStatus::from(status);
            db::mark_attendance(&pool, roll_no, status, at).await?;
            println!("Roll No {roll_no} marked {}.", status.as_str());
        }
        Commands::Calendar {
            roll_no,
            month,
            format,
        } => {
            anyhow::ensure!(
                !roll_no.trim().is_empty(),
                "The calendar shows one student; pass --roll-no"
            );
            let records =
                load_records(cli.input.as_deref(), cli.database_url.as_deref(), &roll_no).await?;
            let (year, month) = match month {
                Some(value) => parse_month(&value)?,
                None => calendar::default_month(&records, today),
            };
            let grid = calendar::build_month_grid(&records, year, month)?;
            emit(format, &grid, || report::render_calendar(&grid))?;
        }
        Commands::Series {
            roll_no,
            days,
            until,
            no_data_as_holiday,
            format,
        } => {
            let records =
                load_records(cli.input.as_deref(), cli.database_url.as_deref(), &roll_no).await?;
            let dates = window::last_n_dates(days, until.unwrap_or(today))?;
            let mut points = series::build_series(&records, &dates);
            if no_data_as_holiday {
                points = series::conflate_no_data(points);
            }
            emit(format, &points, || report::render_series(&points))?;
        }
        Commands::Table {
            roll_no,
            days,
            until,
            format,
        } => {
            let records =
                load_records(cli.input.as_deref(), cli.database_url.as_deref(), &roll_no).await?;
            let dates = window::last_n_dates(days, until.unwrap_or(today))?;
            let rows = series::build_roster(&records, &dates);
            emit(format, &rows, || report::render_roster(&rows, &dates))?;
        }
        Commands::Tally {
            roll_no,
            date,
            format,
        } => {
            let records =
                load_records(cli.input.as_deref(), cli.database_url.as_deref(), &roll_no).await?;
            let tally = rollup::tally_day(&records, date.unwrap_or(today));
            emit(format, &tally, || report::render_tally(&tally))?;
        }
        Commands::Summary { roll_no, format } => {
            let records =
                load_records(cli.input.as_deref(), cli.database_url.as_deref(), &roll_no).await?;
            let summary = stats::summarize(&records);
            emit(format, &summary, || report::render_summary(&summary))?;
        }
        Commands::Report {
            roll_no,
            days,
            out,
        } => {
            let records =
                load_records(cli.input.as_deref(), cli.database_url.as_deref(), &roll_no).await?;
            let dates = window::last_n_dates(days, today)?;
            let month = calendar::default_month(&records, today);
            let scope = Some(roll_no.trim()).filter(|value| !value.is_empty());
            let markdown = report::build_report(scope, &records, &dates, month, today)?;
            std::fs::write(&out, markdown)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn connect(database_url: Option<&str>) -> anyhow::Result<PgPool> {
    let database_url =
        database_url.context("DATABASE_URL must be set (or pass --database-url)")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

/// Loads the snapshot from `--input` when given, the database otherwise,
/// then applies the roll number filter.
async fn load_records(
    input: Option<&Path>,
    database_url: Option<&str>,
    roll_no: &str,
) -> anyhow::Result<Vec<models::AttendanceRecord>> {
    let ingested: Ingested = match input {
        Some(path) => ingest::load_json(path)?,
        None => {
            let pool = connect(database_url).await?;
            let filter = Some(roll_no.trim()).filter(|value| !value.is_empty());
            ingest::ingest(db::fetch_records(&pool, filter).await?)
        }
    };

    if let Some((position, err)) = ingested.errors.first() {
        eprintln!(
            "Skipped {} malformed records (first at position {position}: {err}).",
            ingested.skipped
        );
    }

    Ok(ingest::filter_by_student(&ingested.records, roll_no))
}

fn parse_month(value: &str) -> anyhow::Result<(i32, u32)> {
    let (year, month) = value
        .trim()
        .split_once('-')
        .context("month must be YYYY-MM")?;
    let year = year.parse::<i32>().context("month year must be numeric")?;
    let month = month.parse::<u32>().context("month must be numeric")?;
    window::first_of_month(year, month)?;
    Ok((year, month))
}

fn emit<T: Serialize>(
    format: Format,
    value: &T,
    text: impl FnOnce() -> String,
) -> anyhow::Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(value)?),
        Format::Text => print!("{}", text()),
    }
    Ok(())
}
