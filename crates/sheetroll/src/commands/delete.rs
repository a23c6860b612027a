//! Delete a student's row.

use anyhow::{Context as _, Result};
use clap::Args;
use console::style;

use super::{OutputFormat, print_json, print_outcome};
use crate::context::Context;

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Id of the student to delete
    pub id: String,

    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

pub async fn run(ctx: &Context, args: &DeleteArgs) -> Result<()> {
    let outcome = ctx
        .service
        .delete_student_by_id(&ctx.sheet, &args.id)
        .await
        .with_context(|| format!("failed to delete student {}", args.id))?;

    if args.format == OutputFormat::Json {
        return print_json(&outcome);
    }
    print_outcome(
        &outcome,
        &format!(
            "deletion of student {} (row {})",
            style(&args.id).cyan(),
            outcome.detail().row_number
        ),
    );
    Ok(())
}
