//! Command-line access to a sheet-backed student roster.
//!
//! Usage:
//! ```bash
//! sheetroll students                       # List students
//! sheetroll fetch --filter School=North    # Raw rows of one school
//! sheetroll report --school North          # Attendance summary
//! sheetroll add --name Asha --class 6th --school North
//! sheetroll record 2024-05-06 1=Present 2=Absent
//! ```
//!
//! Settings come from `sheetroll.toml`, credentials from
//! `~/.config/sheetroll/credentials.toml`. Without an access token every
//! write is simulated and reported as such.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;

#[derive(Debug, Parser)]
#[command(name = "sheetroll", author, version, about)]
struct Cli {
    #[command(flatten)]
    global: context::GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a raw range of the sheet
    Fetch(commands::fetch::FetchArgs),

    /// List students
    Students(commands::students::StudentsArgs),

    /// Print the next free student id
    NextId,

    /// Check that the spreadsheet can be read
    Check,

    /// Summarize attendance
    Report(commands::report::ReportArgs),

    /// Append a student
    Add(commands::add::AddArgs),

    /// Update a student's details
    Edit(commands::edit::EditArgs),

    /// Delete a student's row
    Delete(commands::delete::DeleteArgs),

    /// Add (or find) the column for a date
    AddDate(commands::attendance::AddDateArgs),

    /// Set one student's attendance cell
    Mark(commands::attendance::MarkArgs),

    /// Record a whole day's attendance
    Record(commands::attendance::RecordArgs),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(_) => f.debug_tuple("Fetch").finish(),
            Self::Students(_) => f.debug_tuple("Students").finish(),
            Self::NextId => f.write_str("NextId"),
            Self::Check => f.write_str("Check"),
            Self::Report(_) => f.debug_tuple("Report").finish(),
            Self::Add(_) => f.debug_tuple("Add").finish(),
            Self::Edit(_) => f.debug_tuple("Edit").finish(),
            Self::Delete(_) => f.debug_tuple("Delete").finish(),
            Self::AddDate(_) => f.debug_tuple("AddDate").finish(),
            Self::Mark(_) => f.debug_tuple("Mark").finish(),
            Self::Record(_) => f.debug_tuple("Record").finish(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse().context("failed to parse log directive")?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = context::Context::load(&cli.global)?;

    match &cli.command {
        Command::Fetch(args) => commands::fetch::run(&ctx, args).await,
        Command::Students(args) => commands::students::run(&ctx, args).await,
        Command::NextId => {
            commands::students::next_id(&ctx).await;
            Ok(())
        }
        Command::Check => commands::check::run(&ctx).await,
        Command::Report(args) => commands::report::run(&ctx, args).await,
        Command::Add(args) => commands::add::run(&ctx, args).await,
        Command::Edit(args) => commands::edit::run(&ctx, args).await,
        Command::Delete(args) => commands::delete::run(&ctx, args).await,
        Command::AddDate(args) => commands::attendance::add_date(&ctx, args).await,
        Command::Mark(args) => commands::attendance::mark(&ctx, args).await,
        Command::Record(args) => commands::attendance::record(&ctx, args).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    fn parse(argv: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(argv.iter().copied())
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let err = parse(&["sheetroll"]).expect_err("expected clap parse error");
        assert!(
            matches!(
                err.kind(),
                ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand | ErrorKind::MissingSubcommand
            ),
            "unexpected error kind: {:?}",
            err.kind()
        );
    }

    #[test]
    fn test_cli_rejects_unknown_subcommand() {
        let err = parse(&["sheetroll", "not-a-command"]).expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_cli_global_overrides_after_subcommand() -> Result<(), clap::Error> {
        let cli = parse(&[
            "sheetroll",
            "students",
            "--sheet",
            "Roster",
            "--spreadsheet",
            "abc",
        ])?;
        assert_eq!(cli.global.sheet.as_deref(), Some("Roster"));
        assert_eq!(cli.global.spreadsheet.as_deref(), Some("abc"));
        assert!(cli.global.endpoint.is_none());
        Ok(())
    }

    #[test]
    fn test_cli_add_requires_name() {
        let err = parse(&["sheetroll", "add", "--class", "6th", "--school", "North"])
            .expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_parses_add() -> Result<(), clap::Error> {
        let cli = parse(&[
            "sheetroll", "add", "--name", "Asha", "--class", "6th", "--school", "North",
            "--mobile", "98765",
        ])?;
        let Command::Add(args) = cli.command else {
            panic!("expected Command::Add");
        };
        assert_eq!(args.name, "Asha");
        assert_eq!(args.mobile.as_deref(), Some("98765"));
        assert!(args.id.is_none());
        Ok(())
    }

    #[test]
    fn test_cli_parses_mark() -> Result<(), clap::Error> {
        let cli = parse(&["sheetroll", "mark", "7", "E", "Present"])?;
        let Command::Mark(args) = cli.command else {
            panic!("expected Command::Mark");
        };
        assert_eq!(args.student_id, "7");
        assert_eq!(args.column, "E");
        assert_eq!(args.status, "Present");
        Ok(())
    }

    #[test]
    fn test_cli_record_parses_marks() -> Result<(), clap::Error> {
        let cli = parse(&["sheetroll", "record", "2024-05-06", "1=Present", "2=Absent"])?;
        let Command::Record(args) = cli.command else {
            panic!("expected Command::Record");
        };
        assert_eq!(args.date, "2024-05-06");
        assert_eq!(args.marks.len(), 2);
        assert_eq!(args.marks[1].student_id, "2");
        assert_eq!(args.marks[1].status, "Absent");
        Ok(())
    }

    #[test]
    fn test_cli_record_rejects_malformed_mark() {
        let err = parse(&["sheetroll", "record", "2024-05-06", "1-Present"])
            .expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_add_date_rejects_bad_date() {
        let err = parse(&["sheetroll", "add-date", "06/05/2024"])
            .expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_add_date_defaults_to_today() -> Result<(), clap::Error> {
        let cli = parse(&["sheetroll", "add-date", "--format", "json"])?;
        let Command::AddDate(args) = cli.command else {
            panic!("expected Command::AddDate");
        };
        assert!(args.date.is_none());
        assert_eq!(args.format, commands::OutputFormat::Json);
        Ok(())
    }

    #[test]
    fn test_cli_fetch_collects_filters() -> Result<(), clap::Error> {
        let cli = parse(&[
            "sheetroll", "fetch", "--filter", "School=North", "--filter", "C=6th",
        ])?;
        let Command::Fetch(args) = cli.command else {
            panic!("expected Command::Fetch");
        };
        assert_eq!(
            args.filters,
            [
                ("School".to_string(), "North".to_string()),
                ("C".to_string(), "6th".to_string())
            ]
        );
        assert!(args.values.is_none());
        Ok(())
    }

    #[test]
    fn test_cli_fetch_values_conflicts_with_filter() {
        let err = parse(&["sheetroll", "fetch", "--values", "School", "--filter", "C=6th"])
            .expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cli_report_defaults()-> Result<(), clap::Error> {
        let cli = parse(&["sheetroll", "report"])?;
        let Command::Report(args) = cli.command else {
            panic!("expected Command::Report");
        };
        assert!(args.school.is_none());
        assert!(!args.options);
        assert_eq!(args.format, commands::OutputFormat::Table);
        Ok(())
    }
}
