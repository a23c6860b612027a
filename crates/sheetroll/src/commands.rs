//! Subcommand implementations for `sheetroll`.
//!
//! - **`fetch`**: print a raw range
//! - **`students`** / **`next-id`**: list the roster, suggest the next id
//! - **`check`**: confirm the spreadsheet is readable
//! - **`report`**: attendance aggregates with school, class and date filters
//! - **`add`**, **`edit`**, **`delete`**: roster mutations
//! - **`add-date`**, **`mark`**, **`record`**: attendance mutations
//!
//! Each module exports an `*Args` struct and a `run` function taking the
//! shared [`Context`](crate::context::Context). Mutations print either
//! `saved` or `SIMULATED`; a simulated write never reached the sheet.

use anyhow::{Context as _, Result};
use clap::ValueEnum;
use console::style;
use serde::Serialize;
use sheetroll_core::WriteOutcome;

pub mod add;
pub mod attendance;
pub mod check;
pub mod delete;
pub mod edit;
pub mod fetch;
pub mod report;
pub mod students;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

/// Prints the one-line verdict for a mutation.
pub(crate) fn print_outcome<T>(outcome: &WriteOutcome<T>, what: &str) {
    println!("{}", outcome_line(outcome, what));
}

pub(crate) fn outcome_line<T>(outcome: &WriteOutcome<T>, what: &str) -> String {
    match outcome.reason() {
        None => format!("{} {what}", style("saved").green().bold()),
        Some(reason) => format!(
            "{} {what} (not written: {reason})",
            style("SIMULATED").yellow().bold()
        ),
    }
}

/// Cuts `text` to `max` characters, ending with "..." when shortened.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    const ELLIPSIS: &str = "...";

    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_none() {
        return head;
    }

    let prefix: String = head.chars().take(max.saturating_sub(ELLIPSIS.len())).collect();
    format!("{prefix}{ELLIPSIS}")
}
