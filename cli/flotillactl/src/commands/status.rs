//! Status command (pure read).

use anyhow::Result;

use crate::output::print_statuses;

use super::CommandContext;

pub async fn run(ctx: CommandContext) -> Result<()> {
    let statuses = ctx.project.status(&ctx.selector).await?;
    print_statuses(&statuses, ctx.format);
    Ok(())
}
