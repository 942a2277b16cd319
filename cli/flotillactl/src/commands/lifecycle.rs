//! Lifecycle commands: create, start, stop, reboot, terminate, revert.

use anyhow::Result;

use crate::output::print_statuses;

use super::CommandContext;

pub async fn create(ctx: CommandContext, wait_for_ssh: bool) -> Result<()> {
    let statuses = ctx.project.create(wait_for_ssh).await?;
    print_statuses(&statuses, ctx.format);
    Ok(())
}

pub async fn start(ctx: CommandContext, wait_for_ssh: bool) -> Result<()> {
    let statuses = ctx.project.start(&ctx.selector, wait_for_ssh).await?;
    print_statuses(&statuses, ctx.format);
    Ok(())
}

pub async fn stop(ctx: CommandContext) -> Result<()> {
    let statuses = ctx.project.stop(&ctx.selector).await?;
    print_statuses(&statuses, ctx.format);
    Ok(())
}

pub async fn reboot(ctx: CommandContext, wait_for_ssh: bool) -> Result<()> {
    let statuses = ctx.project.reboot(&ctx.selector, wait_for_ssh).await?;
    print_statuses(&statuses, ctx.format);
    Ok(())
}

pub async fn terminate(ctx: CommandContext) -> Result<()> {
    let statuses = ctx.project.terminate(&ctx.selector).await?;
    print_statuses(&statuses, ctx.format);
    Ok(())
}

pub async fn revert(ctx: CommandContext, sequential: bool) -> Result<()> {
    let statuses = ctx.project.revert(&ctx.selector, sequential).await?;
    print_statuses(&statuses, ctx.format);
    Ok(())
}
