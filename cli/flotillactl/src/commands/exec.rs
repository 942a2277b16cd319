//! Exec command: run a command over the selected running instances.

use anyhow::Result;
use clap::Args;

use crate::output::print_exec_outcomes;

use super::CommandContext;

#[derive(Debug, Args)]
pub struct ExecArgs {
    /// The command to run, passed to the remote shell as-is.
    #[arg(trailing_var_arg = true, required = true)]
    pub command: Vec<String>,
}

pub async fn run(ctx: CommandContext, args: ExecArgs) -> Result<()> {
    let command = args.command.join(" ");
    let outcomes = ctx.project.run_command(&ctx.selector, &command).await?;

    let failed = outcomes.iter().filter(|o| !o.success).count();
    print_exec_outcomes(&outcomes, ctx.format);
    if failed > 0 {
        anyhow::bail!("command failed on {failed} of {} instance(s)", outcomes.len());
    }
    Ok(())
}
