//! Error display for the CLI.

use colored::Colorize;

use flotilla_fleet::FleetError;
use flotilla_provider::ProviderError;

/// Print an error in a user-friendly format, with a hint where one helps.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    if let Some(fleet_err) = err.downcast_ref::<FleetError>() {
        match fleet_err {
            FleetError::InvalidConfig(_) => {
                eprintln!(
                    "\n{}",
                    "Hint: Check the project configuration file (see --config).".yellow()
                );
            }
            FleetError::Provider(ProviderError::CapacityExceeded { .. }) => {
                eprintln!(
                    "\n{}",
                    "Hint: The provider is out of capacity. Lower max_instance_count or retire other fleets."
                        .yellow()
                );
            }
            FleetError::SshReadinessTimeout { .. } => {
                eprintln!(
                    "\n{}",
                    "Hint: Instances may still be booting. Re-run with --no-wait-ssh to skip the readiness gate."
                        .yellow()
                );
            }
            FleetError::NoHealthyInstances { .. } => {
                eprintln!("\n{}", "Hint: Run `flo create` to bring up the project.".yellow());
            }
            _ => {}
        }
    }
}
