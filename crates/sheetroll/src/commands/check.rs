//! Confirm the spreadsheet is reachable with the configured key.

use anyhow::{Result, bail};
use console::style;

use crate::context::Context;

pub async fn run(ctx: &Context) -> Result<()> {
    let id = ctx.service.client().spreadsheet_id();
    if !ctx.service.check_access().await {
        bail!("spreadsheet {id} is not accessible; check its sharing settings and the API key");
    }

    println!(
        "{} spreadsheet {} is accessible ({})",
        style("✓").green().bold(),
        style(id).cyan(),
        ctx.session_label()
    );
    Ok(())
}
