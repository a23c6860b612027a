//! Append a student to the roster.

use anyhow::{Context as _, Result};
use clap::Args;
use console::style;
use sheetroll_core::{StudentRecord, format_phone_number};

use super::{OutputFormat, print_json, print_outcome};
use crate::context::Context;

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long, value_parser = non_blank)]
    pub name: String,

    #[arg(long, value_parser = non_blank)]
    pub class: String,

    #[arg(long, value_parser = non_blank)]
    pub school: String,

    /// Digits are kept, other characters dropped
    #[arg(long)]
    pub mobile: Option<String>,

    /// Explicit id; the next free id is used otherwise
    #[arg(long)]
    pub id: Option<String>,

    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

impl AddArgs {
    fn record(&self, id: String) -> StudentRecord {
        StudentRecord {
            id,
            name: self.name.trim().to_string(),
            class: self.class.trim().to_string(),
            school: self.school.trim().to_string(),
            mobile_number: self
                .mobile
                .as_deref()
                .map(format_phone_number)
                .filter(|m| !m.is_empty()),
        }
    }
}

pub(crate) fn non_blank(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        Err("must not be blank".to_string())
    } else {
        Ok(value.to_string())
    }
}

pub async fn run(ctx: &Context, args: &AddArgs) -> Result<()> {
    let id = match &args.id {
        Some(id) => id.trim().to_string(),
        None => ctx.service.next_student_id(&ctx.sheet).await,
    };
    let record = args.record(id);

    let outcome = ctx
        .service
        .append_student(&ctx.sheet, &record)
        .await
        .with_context(|| format!("failed to add student {}", record.id))?;

    if args.format == OutputFormat::Json {
        return print_json(&outcome);
    }

    print_outcome(
        &outcome,
        &format!("student {} ({})", style(&record.id).cyan(), record.name),
    );
    if let Some(range) = &outcome.detail().updated_range {
        println!("  {} {range}", style("range:").dim());
    }
    Ok(())
}
