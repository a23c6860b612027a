//! Attendance aggregates over the roster sheet.

use anyhow::{Context as _, Result};
use clap::Args;
use console::style;
use sheetroll_core::{AttendanceReport, AttendanceTally, FilterOptions, Filters, Selection};

use super::{OutputFormat, print_json, truncate};
use crate::context::Context;

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Only rows of this school ("All" for every school)
    #[arg(long)]
    pub school: Option<String>,

    /// Only rows of this class ("All" for every class)
    #[arg(long)]
    pub class: Option<String>,

    /// Only this date column, `YYYY-MM-DD`
    #[arg(long)]
    pub date: Option<String>,

    /// List the values the filters accept instead of reporting
    #[arg(long)]
    pub options: bool,

    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

impl ReportArgs {
    fn filters(&self) -> Filters {
        Filters {
            school: Selection::from(self.school.clone()),
            class: Selection::from(self.class.clone()),
            date: Selection::from(self.date.clone()),
        }
    }
}

pub async fn run(ctx: &Context, args: &ReportArgs) -> Result<()> {
    if args.options {
        let options = ctx
            .service
            .filter_options(&ctx.sheet, &ctx.data_range)
            .await
            .context("failed to read filter options")?;
        return match args.format {
            OutputFormat::Json => print_json(&options),
            OutputFormat::Table => {
                print_options(&options);
                Ok(())
            }
        };
    }

    let report = ctx
        .service
        .attendance_report(&ctx.sheet, &ctx.data_range, &args.filters())
        .await
        .context("failed to compute attendance")?;

    match args.format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => {
            print_report(&report);
            Ok(())
        }
    }
}

fn print_options(options: &FilterOptions) {
    println!("{} {}", style("Schools:").bold(), options.schools.join(", "));
    println!("{} {}", style("Classes:").bold(), options.classes.join(", "));
    println!("{} {}", style("Dates:").bold(), options.dates.join(", "));
}

fn print_report(report: &AttendanceReport) {
    if report.overall.total == 0 {
        println!("{}", style("No attendance recorded for this selection").dim());
        return;
    }

    println!(
        "{} {} (present {}, absent {}, {} entries)",
        style("Attendance:").bold(),
        style(percent(&report.overall)).cyan().bold(),
        report.overall.present,
        report.overall.absent,
        report.overall.total
    );

    println!("\n{}", style("By school").bold());
    for school in &report.by_school {
        println!(
            "  {:<28} {:>7}  ({} entries)",
            truncate(&school.school, 28),
            percent(&school.tally),
            school.tally.total
        );
    }

    if !report.lowest_students.is_empty() {
        println!("\n{}", style("Lowest attendance").bold());
        for student in &report.lowest_students {
            println!(
                "  {:<8} {:<24} {:<10} {:>7}",
                student.id,
                truncate(&student.name, 24),
                truncate(&student.class, 10),
                style(percent(&student.tally)).red()
            );
        }
    }

    println!("\n{}", style("Trend").bold());
    for point in &report.trend {
        println!(
            "  {:<12} {:>7}  {}",
            point.date,
            percent(&point.tally),
            bar(point.tally.rate())
        );
    }
}

fn percent(tally: &AttendanceTally) -> String {
    format!("{:.1}%", tally.rate())
}

/// Twenty-cell bar for a 0 to 100 rate.
fn bar(rate: f64) -> String {
    let filled = (rate.clamp(0.0, 100.0) / 5.0).round();
    let mut out = String::with_capacity(20);
    for cell in 0..20u8 {
        out.push(if f64::from(cell) < filled { '█' } else { '·' });
    }
    out
}
