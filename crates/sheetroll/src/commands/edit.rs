//! Update a student's details in place.

use anyhow::{Context as _, Result};
use clap::Args;
use console::style;
use sheetroll_core::{StudentRecord, format_phone_number};

use super::{OutputFormat, add::non_blank, print_json, print_outcome};
use crate::context::Context;

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Id of the student to edit
    pub id: String,

    #[arg(long, value_parser = non_blank)]
    pub name: Option<String>,

    #[arg(long, value_parser = non_blank)]
    pub class: Option<String>,

    #[arg(long, value_parser = non_blank)]
    pub school: Option<String>,

    /// New mobile number; an empty value clears it
    #[arg(long)]
    pub mobile: Option<String>,

    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

impl EditArgs {
    fn is_noop(&self) -> bool {
        self.name.is_none() && self.class.is_none() && self.school.is_none() && self.mobile.is_none()
    }

    /// `current` with the given fields replaced. The id never changes.
    fn apply(&self, mut current: StudentRecord) -> StudentRecord {
        if let Some(name) = &self.name {
            current.name = name.trim().to_string();
        }
        if let Some(class) = &self.class {
            current.class = class.trim().to_string();
        }
        if let Some(school) = &self.school {
            current.school = school.trim().to_string();
        }
        if let Some(mobile) = &self.mobile {
            current.mobile_number = Some(format_phone_number(mobile)).filter(|m| !m.is_empty());
        }
        current
    }
}

pub async fn run(ctx: &Context, args: &EditArgs) -> Result<()> {
    if args.is_noop() {
        println!("{}", style("Nothing to change").dim());
        return Ok(());
    }

    let row = ctx
        .service
        .find_student_row(&ctx.sheet, &args.id)
        .await
        .with_context(|| format!("failed to look up student {}", args.id))?;
    let record = args.apply(row.to_record());

    let outcome = ctx
        .service
        .update_student_by_id(&ctx.sheet, &args.id, &record)
        .await
        .with_context(|| format!("failed to update student {}", args.id))?;

    if args.format == OutputFormat::Json {
        return print_json(&outcome);
    }
    print_outcome(
        &outcome,
        &format!(
            "student {} in {}",
            style(&record.id).cyan(),
            outcome.detail().range
        ),
    );
    Ok(())
}
