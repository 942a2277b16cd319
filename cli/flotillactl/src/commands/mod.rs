//! CLI commands.

mod exec;
mod lifecycle;
mod status;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use flotilla_fleet::{FleetProject, ProjectConfig, Selector};
use flotilla_provider::{ComputeProvider, MockProvider, RemoteExecutor, SshExecutor};

use crate::output::OutputFormat;

/// flotilla CLI - Manage a project's fleet of cloud compute instances.
#[derive(Debug, Parser)]
#[command(name = "flo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the project configuration file.
    #[arg(
        short,
        long,
        global = true,
        env = "FLOTILLA_CONFIG",
        default_value = "flotilla.toml"
    )]
    config: PathBuf,

    /// Operate only on these instance numbers (repeatable). No numbers
    /// means the whole project.
    #[arg(short = 'i', long = "instance", global = true)]
    instances: Vec<u32>,

    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Converge the project to its configured replica range.
    Create(SshWaitArgs),

    /// Start instances.
    Start(SshWaitArgs),

    /// Stop instances.
    Stop,

    /// Stop, then start, instances.
    Reboot(SshWaitArgs),

    /// Terminate instances, retiring their identity numbers.
    Terminate,

    /// Replace instances with fresh ones keeping the same identity numbers.
    Revert(RevertArgs),

    /// Show instance status.
    Status,

    /// Run a command on the selected running instances.
    Exec(exec::ExecArgs),
}

#[derive(Debug, Args)]
pub struct SshWaitArgs {
    /// Do not wait for instances to become ssh-ready.
    #[arg(long)]
    no_wait_ssh: bool,
}

#[derive(Debug, Args)]
pub struct RevertArgs {
    /// Revert one instance at a time instead of the whole batch at once.
    /// Use this when relinquishing many instances in bulk risks losing
    /// provider capacity to other tenants.
    #[arg(short, long)]
    sequential: bool,
}

/// Everything a command needs: the project handle, the selector narrowing
/// its target set, and the chosen output format.
pub struct CommandContext {
    pub project: FleetProject,
    pub selector: Selector,
    pub format: OutputFormat,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let format = OutputFormat::parse(&self.format)?;
        let config = ProjectConfig::load(&self.config)?;
        info!(
            project = %config.project,
            provider = %config.provider,
            "Configuration loaded"
        );
        let selector = if self.instances.is_empty() {
            Selector::All
        } else {
            Selector::Numbers(self.instances.clone())
        };

        let provider = provider_backend(&config)?;
        let executor: Arc<dyn RemoteExecutor> = Arc::new(SshExecutor::new());
        let project = FleetProject::new(config, provider, executor)?;

        let ctx = CommandContext {
            project,
            selector,
            format,
        };

        match self.command {
            Commands::Create(args) => lifecycle::create(ctx, !args.no_wait_ssh).await,
            Commands::Start(args) => lifecycle::start(ctx, !args.no_wait_ssh).await,
            Commands::Stop => lifecycle::stop(ctx).await,
            Commands::Reboot(args) => lifecycle::reboot(ctx, !args.no_wait_ssh).await,
            Commands::Terminate => lifecycle::terminate(ctx).await,
            Commands::Revert(args) => lifecycle::revert(ctx, args.sequential).await,
            Commands::Status => status::run(ctx).await,
            Commands::Exec(args) => exec::run(ctx, args).await,
        }
    }
}

/// Resolve the configured provider backend.
///
/// Real cloud backends implement [`ComputeProvider`] out of tree; the `mock`
/// backend ships for local development and dry runs.
fn provider_backend(config: &ProjectConfig) -> Result<Arc<dyn ComputeProvider>> {
    match config.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider::new())),
        other => anyhow::bail!(
            "unsupported provider backend '{other}' (only 'mock' is built in)"
        ),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn instance_numbers_parse_repeatably() {
        let cli = Cli::parse_from(["flo", "stop", "-i", "2", "-i", "5"]);
        assert_eq!(cli.instances, vec![2, 5]);
    }

    #[test]
    fn exec_takes_a_trailing_command() {
        let cli = Cli::parse_from(["flo", "exec", "--", "uptime", "-p"]);
        match cli.command {
            Commands::Exec(args) => assert_eq!(args.command, vec!["uptime", "-p"]),
            _ => panic!("expected exec"),
        }
    }
}
