//! SSH readiness gate and remote sessions.
//!
//! The gate shares the transition waiter's bounded-retry shape, but probes
//! reachability through the [`RemoteExecutor`](flotilla_provider::RemoteExecutor)
//! instead of provider state, and exhausting the budget here *is* fatal:
//! provisioning and other downstream automation depend on reachable hosts.

use serde::Serialize;
use tracing::{debug, error, info};

use flotilla_provider::{Instance, InstanceState, SshCredentials};

use crate::error::FleetError;
use crate::project::FleetProject;
use crate::selector::Selector;

/// A ready-to-use SSH target for one running instance.
#[derive(Debug, Clone)]
pub struct RemoteSession {
    pub instance_id: String,
    pub address: String,
    pub credentials: SshCredentials,
}

/// Result of running a command on one instance.
#[derive(Debug, Clone, Serialize)]
pub struct ExecOutcome {
    pub instance_id: String,
    pub address: String,
    pub success: bool,
}

impl FleetProject {
    /// Block until every given instance accepts a trivial SSH command.
    ///
    /// Fails with [`FleetError::SshReadinessTimeout`] when the retry budget
    /// runs out with instances still unreachable.
    pub(crate) async fn wait_for_ssh_ready(
        &self,
        mut instances: Vec<Instance>,
    ) -> Result<(), FleetError> {
        if instances.is_empty() {
            return Ok(());
        }
        let credentials = self.config.credentials();

        for attempt in 1..=self.config.max_wait_tries {
            debug!(
                count = instances.len(),
                attempt,
                max_tries = self.config.max_wait_tries,
                "Waiting for instances to be ssh-ready"
            );

            let mut pending = 0usize;
            for instance in instances.iter_mut() {
                *instance = self.provider.refresh(&instance.id).await?;
                if !self.probe_ssh(instance, &credentials).await {
                    pending += 1;
                }
            }

            if pending == 0 {
                return Ok(());
            }

            if attempt < self.config.max_wait_tries {
                tokio::time::sleep(self.config.poll_interval()).await;
            } else {
                error!(
                    pending,
                    project = %self.config.project,
                    "Timed out waiting for instances to be ssh-ready"
                );
                return Err(FleetError::SshReadinessTimeout {
                    project: self.config.project.clone(),
                    pending,
                });
            }
        }

        Ok(())
    }

    async fn probe_ssh(&self, instance: &Instance, credentials: &SshCredentials) -> bool {
        // An instance with no address yet is definitely not reachable.
        let Some(address) = instance.network.public_ip_address.as_deref() else {
            return false;
        };
        self.executor.run(address, credentials, "hostname").await
    }

    /// SSH session targets for the selected running instances.
    ///
    /// Zero eligible instances is a distinct, recoverable condition
    /// ([`FleetError::NoHealthyInstances`]), not a crash.
    pub async fn remote_sessions(
        &self,
        selector: &Selector,
    ) -> Result<Vec<RemoteSession>, FleetError> {
        let credentials = self.config.credentials();
        let healthy = self.directory.healthy(selector).await?;

        let sessions: Vec<RemoteSession> = healthy
            .iter()
            .filter(|instance| instance.state == InstanceState::Running)
            .filter_map(|instance| {
                instance
                    .network
                    .public_ip_address
                    .clone()
                    .map(|address| RemoteSession {
                        instance_id: instance.id.clone(),
                        address,
                        credentials: credentials.clone(),
                    })
            })
            .collect();

        if sessions.is_empty() {
            return Err(FleetError::NoHealthyInstances {
                project: self.config.project.clone(),
            });
        }
        Ok(sessions)
    }

    /// Run a command on every selected running instance.
    pub async fn run_command(
        &self,
        selector: &Selector,
        command: &str,
    ) -> Result<Vec<ExecOutcome>, FleetError> {
        let sessions = self.remote_sessions(selector).await?;
        let mut outcomes = Vec::with_capacity(sessions.len());
        for session in sessions {
            let success = self
                .executor
                .run(&session.address, &session.credentials, command)
                .await;
            info!(
                instance = %session.instance_id,
                address = %session.address,
                success,
                "Remote command finished"
            );
            outcomes.push(ExecOutcome {
                instance_id: session.instance_id,
                address: session.address,
                success,
            });
        }
        Ok(outcomes)
    }
}
