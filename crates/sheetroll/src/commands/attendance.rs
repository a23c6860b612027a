//! Attendance mutations: date columns, single marks and whole sessions.

use anyhow::{Context as _, Result};
use chrono::{Local, NaiveDate};
use clap::Args;
use console::style;
use sheetroll_core::{AttendanceMark, BatchReport, BatchStatus, column_index};

use super::{OutputFormat, add::non_blank, outcome_line, print_json, print_outcome};
use crate::context::Context;

#[derive(Debug, Args)]
pub struct AddDateArgs {
    /// Date header, `YYYY-MM-DD`; today when omitted
    #[arg(value_parser = parse_date)]
    pub date: Option<String>,

    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct MarkArgs {
    pub student_id: String,

    /// Column letter of the date, as printed by `add-date`
    #[arg(value_parser = parse_column)]
    pub column: String,

    /// Usually "Present" or "Absent"
    #[arg(value_parser = non_blank)]
    pub status: String,

    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Date of the session, `YYYY-MM-DD`
    #[arg(value_parser = parse_date)]
    pub date: String,

    /// Marks as `ID=STATUS`, e.g. `12=Present`
    #[arg(required = true, num_args = 1.., value_parser = parse_mark)]
    pub marks: Vec<AttendanceMark>,

    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

fn parse_date(value: &str) -> Result<String, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(|date| date.format("%Y-%m-%d").to_string())
        .map_err(|_| format!("`{value}` is not a YYYY-MM-DD date"))
}

fn parse_column(value: &str) -> Result<String, String> {
    let letter = value.trim().to_ascii_uppercase();
    column_index(&letter)
        .map(|_| letter)
        .ok_or_else(|| format!("`{value}` is not a column letter"))
}

fn parse_mark(value: &str) -> Result<AttendanceMark, String> {
    let (id, status) = value
        .split_once('=')
        .ok_or_else(|| format!("`{value}` is not ID=STATUS"))?;
    let (id, status) = (id.trim(), status.trim());
    if id.is_empty() || status.is_empty() {
        return Err(format!("`{value}` needs both an id and a status"));
    }
    Ok(AttendanceMark::new(id, status))
}

fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

pub async fn add_date(ctx: &Context, args: &AddDateArgs) -> Result<()> {
    let date = args.date.clone().unwrap_or_else(today);
    let outcome = ctx
        .service
        .add_date_column(&ctx.sheet, &date)
        .await
        .with_context(|| format!("failed to add the {date} column"))?;

    if args.format == OutputFormat::Json {
        return print_json(&outcome);
    }

    let column = outcome.detail();
    let what = if column.is_existing {
        format!("{date} (existing column {})", style(&column.column_letter).cyan())
    } else {
        format!("{date} in column {}", style(&column.column_letter).cyan())
    };
    print_outcome(&outcome, &what);
    Ok(())
}

pub async fn mark(ctx: &Context, args: &MarkArgs) -> Result<()> {
    let outcome = ctx
        .service
        .update_attendance_by_student_id(&ctx.sheet, &args.student_id, &args.column, &args.status)
        .await
        .with_context(|| format!("failed to mark student {}", args.student_id))?;

    if args.format == OutputFormat::Json {
        return print_json(&outcome);
    }
    print_outcome(
        &outcome,
        &format!("{} for student {} at {}", args.status, args.student_id, outcome.detail().range),
    );
    Ok(())
}

pub async fn record(ctx: &Context, args: &RecordArgs) -> Result<()> {
    let report = ctx
        .service
        .record_attendance(&ctx.sheet, &args.date, &args.marks)
        .await
        .with_context(|| format!("failed to record attendance for {}", args.date))?;

    if args.format == OutputFormat::Json {
        return print_json(&report);
    }
    print_batch(&args.date, &report);
    Ok(())
}

fn print_batch(date: &str, report: &BatchReport) {
    let headline = match report.status {
        BatchStatus::Complete => style("saved").green().bold(),
        BatchStatus::Partial => style("PARTIAL").yellow().bold(),
        BatchStatus::Simulated => style("SIMULATED").yellow().bold(),
    };
    println!(
        "{headline} attendance for {date}: {} present, {} absent of {} ({}%)",
        report.summary.present,
        report.summary.absent,
        report.summary.marked,
        report.summary.present_percent()
    );

    if let Some(reason) = report.column.reason() {
        println!("  {} {reason}", style("not written:").dim());
        return;
    }

    for mark in &report.marks {
        let line = match &mark.outcome {
            Ok(outcome) => outcome_line(outcome, &format!("student {}", mark.student_id)),
            Err(err) => format!(
                "{} student {}: {err}",
                style("failed").red().bold(),
                mark.student_id
            ),
        };
        println!("  {line}");
    }
}
