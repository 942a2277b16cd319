//! Project lifecycle operations.
//!
//! [`FleetProject`] is the operational surface of the crate: create, start,
//! stop, reboot, terminate, revert, status. Each operation narrows its
//! target set through a [`Selector`], waits out any blocking transition,
//! issues the provider action, then waits again for the target state. The
//! provider is re-queried at every step; no instance state survives between
//! operations.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use flotilla_identity::{NAME_TAG, OWNER_EMAIL_TAG, PROJECT_TAG};
use flotilla_provider::{
    ComputeProvider, Instance, InstanceState, RemoteExecutor, Reservation, ReservationRequest,
};

use crate::config::ProjectConfig;
use crate::directory::InstanceDirectory;
use crate::error::FleetError;
use crate::selector::Selector;
use crate::status::InstanceStatus;
use crate::waiter::TransitionWaiter;

/// A named pool of compute instances managed as one fleet.
pub struct FleetProject {
    pub(crate) config: ProjectConfig,
    pub(crate) provider: Arc<dyn ComputeProvider>,
    pub(crate) executor: Arc<dyn RemoteExecutor>,
    pub(crate) directory: InstanceDirectory,
    pub(crate) waiter: TransitionWaiter,
}

impl FleetProject {
    /// Build a project from a validated configuration and its collaborators.
    pub fn new(
        config: ProjectConfig,
        provider: Arc<dyn ComputeProvider>,
        executor: Arc<dyn RemoteExecutor>,
    ) -> Result<Self, FleetError> {
        config.validate()?;
        let directory = InstanceDirectory::new(Arc::clone(&provider), &config.project);
        let waiter = TransitionWaiter::new(
            Arc::clone(&provider),
            config.max_wait_tries,
            config.poll_interval(),
        );
        Ok(Self {
            config,
            provider,
            executor,
            directory,
            waiter,
        })
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Converge the pool to the configured replica range.
    ///
    /// Reuses healthy instances, retires extras, reserves what is missing,
    /// and waits for the resulting set to reach `running`.
    pub async fn create(&self, wait_for_ssh: bool) -> Result<Vec<InstanceStatus>, FleetError> {
        info!(project = %self.config.project, "Finding existing reusable instances");

        self.wait_for_shutting_down(&Selector::All).await?;
        self.wait_for_stopping(&Selector::All).await?;

        let healthy = self.directory.healthy(&Selector::All).await?;
        let mut healthy = self.converge_replicas(healthy).await?;

        info!(count = healthy.len(), "Waiting for all instances to start");
        self.waiter
            .wait(&mut healthy, None, Some(InstanceState::Running))
            .await?;

        if wait_for_ssh {
            self.wait_for_ssh_ready(healthy).await?;
        }

        let running = self
            .directory
            .in_states(&[InstanceState::Running], &Selector::All, false)
            .await?;
        info!(
            ready = running.len(),
            project = %self.config.project,
            "Finished creating"
        );
        self.status(&Selector::All).await
    }

    /// Start the selected instances.
    pub async fn start(
        &self,
        selector: &Selector,
        wait_for_ssh: bool,
    ) -> Result<Vec<InstanceStatus>, FleetError> {
        // A stopping instance cannot be started mid-transition.
        self.wait_for_stopping(selector).await?;

        let mut instances = self
            .directory
            .in_states(
                &[
                    InstanceState::ShuttingDown,
                    InstanceState::Terminated,
                    InstanceState::Stopping,
                    InstanceState::Pending,
                    InstanceState::Running,
                ],
                selector,
                true,
            )
            .await?;
        info!(count = instances.len(), "Starting instances");
        for instance in &instances {
            self.provider.start_instance(&instance.id).await?;
        }

        self.waiter
            .wait(
                &mut instances,
                Some(InstanceState::Pending),
                Some(InstanceState::Running),
            )
            .await?;

        if wait_for_ssh {
            let running = self
                .directory
                .in_states(&[InstanceState::Running], selector, false)
                .await?;
            self.wait_for_ssh_ready(running).await?;
        }

        info!("Finished starting");
        self.status(selector).await
    }

    /// Stop the selected instances.
    pub async fn stop(&self, selector: &Selector) -> Result<Vec<InstanceStatus>, FleetError> {
        // A starting instance cannot be stopped mid-transition.
        self.wait_for_starting(selector).await?;

        let mut instances = self
            .directory
            .in_states(
                &[
                    InstanceState::ShuttingDown,
                    InstanceState::Terminated,
                    InstanceState::Pending,
                    InstanceState::Stopping,
                    InstanceState::Stopped,
                ],
                selector,
                true,
            )
            .await?;
        info!(count = instances.len(), "Stopping instances");
        for instance in &instances {
            self.provider.stop_instance(&instance.id).await?;
        }

        self.waiter
            .wait(
                &mut instances,
                Some(InstanceState::Stopping),
                Some(InstanceState::Stopped),
            )
            .await?;

        info!("Finished stopping");
        self.status(selector).await
    }

    /// Stop, then start, the selected instances.
    ///
    /// A full reboot goes through the stop/start cycle; the provider-native
    /// reboot call is only used by the create path's narrower restart step.
    pub async fn reboot(
        &self,
        selector: &Selector,
        wait_for_ssh: bool,
    ) -> Result<Vec<InstanceStatus>, FleetError> {
        self.stop(selector).await?;
        self.start(selector, wait_for_ssh).await?;
        info!("Finished rebooting");
        self.status(selector).await
    }

    /// Terminate the selected healthy instances.
    pub async fn terminate(&self, selector: &Selector) -> Result<Vec<InstanceStatus>, FleetError> {
        let instances = self.directory.healthy(selector).await?;
        info!(count = instances.len(), "Terminating instances");
        self.terminate_instances(instances).await?;
        info!("Finished terminating");
        self.status(selector).await
    }

    /// Replace the selected healthy instances with fresh ones carrying the
    /// same identity numbers.
    ///
    /// Batch mode terminates everything first and replaces in one
    /// reservation; sequential mode fully processes one instance before
    /// touching the next, for providers that cannot absorb a bulk
    /// relinquish-and-reserve.
    pub async fn revert(
        &self,
        selector: &Selector,
        sequential: bool,
    ) -> Result<Vec<InstanceStatus>, FleetError> {
        let instances = self.directory.healthy(selector).await?;
        info!(count = instances.len(), sequential, "Starting revert");

        if sequential {
            for instance in instances {
                self.revert_batch(vec![instance]).await?;
            }
        } else if !instances.is_empty() {
            self.revert_batch(instances).await?;
        }

        info!("Finished reverting");
        self.status(selector).await
    }

    /// Status snapshot of the selected instances. Pure read.
    pub async fn status(&self, selector: &Selector) -> Result<Vec<InstanceStatus>, FleetError> {
        let instances = self.directory.select(selector).await?;
        Ok(instances.iter().map(InstanceStatus::of).collect())
    }

    async fn revert_batch(&self, instances: Vec<Instance>) -> Result<(), FleetError> {
        let mut numbers = Vec::with_capacity(instances.len());
        for instance in &instances {
            match instance.identity_number()? {
                Some(number) => numbers.push(number),
                None => warn!(
                    id = %instance.id,
                    "Instance has no identity tag, terminating without replacement"
                ),
            }
        }

        self.terminate_instances(instances).await?;
        if numbers.is_empty() {
            return Ok(());
        }

        debug!(count = numbers.len(), "Requesting replacement reservation");
        let reservation = self
            .reserve(numbers.len() as u32, numbers.len() as u32)
            .await?;
        let mut replacements = reservation.instances;
        debug!(granted = replacements.len(), "Replacements received");

        // Replacements inherit the numbers their predecessors held.
        for (instance, number) in replacements.iter().zip(&numbers) {
            self.tag_live(&instance.id, *number).await?;
        }

        self.waiter
            .wait(
                &mut replacements,
                Some(InstanceState::Pending),
                Some(InstanceState::Running),
            )
            .await?;
        Ok(())
    }

    /// Retire and terminate a set of instances, waiting for their shutdown.
    ///
    /// The `Name` tag is rewritten to the retired form *before* termination
    /// is requested, so an identity lookup never observes a live-looking tag
    /// on a dying instance. Instances already retired are left alone.
    pub(crate) async fn terminate_instances(
        &self,
        mut instances: Vec<Instance>,
    ) -> Result<Vec<Instance>, FleetError> {
        for instance in &instances {
            if instance.is_retired() {
                continue;
            }
            if let Some(number) = instance.identity_number()? {
                self.tag_retired(&instance.id, number).await?;
            }
            self.provider.terminate_instance(&instance.id).await?;
        }

        self.waiter
            .wait(
                &mut instances,
                Some(InstanceState::ShuttingDown),
                Some(InstanceState::Terminated),
            )
            .await?;
        Ok(instances)
    }

    /// Reserve new instances with this project's shape.
    pub(crate) async fn reserve(
        &self,
        min_count: u32,
        max_count: u32,
    ) -> Result<Reservation, FleetError> {
        let request = ReservationRequest {
            image_id: self.config.image_id.clone(),
            min_count,
            max_count,
            key_name: self.config.key_pair.clone(),
            security_groups: vec![self.config.security_group.clone()],
            instance_type: self.config.instance_type.clone(),
            placement: self.config.availability_zone.clone(),
        };
        Ok(self.provider.create_instances(&request).await?)
    }

    pub(crate) async fn tag_live(&self, id: &str, number: u32) -> Result<(), FleetError> {
        self.write_name_tag(id, flotilla_identity::name_tag(&self.config.project, number))
            .await
    }

    pub(crate) async fn tag_retired(&self, id: &str, number: u32) -> Result<(), FleetError> {
        self.write_name_tag(
            id,
            flotilla_identity::retired_name_tag(&self.config.project, number),
        )
        .await
    }

    async fn write_name_tag(&self, id: &str, name: String) -> Result<(), FleetError> {
        let mut tags = BTreeMap::new();
        tags.insert(NAME_TAG.to_string(), name);
        tags.insert(PROJECT_TAG.to_string(), self.config.project.clone());
        tags.insert(OWNER_EMAIL_TAG.to_string(), self.config.email.clone());
        self.provider.tag_instance(id, &tags).await?;
        Ok(())
    }

    pub(crate) async fn wait_for_starting(&self, selector: &Selector) -> Result<bool, FleetError> {
        info!("Waiting for pending instances to start");
        let mut pending = self
            .directory
            .in_states(&[InstanceState::Pending], selector, false)
            .await?;
        self.waiter
            .wait(
                &mut pending,
                Some(InstanceState::Pending),
                Some(InstanceState::Running),
            )
            .await
    }

    pub(crate) async fn wait_for_stopping(&self, selector: &Selector) -> Result<bool, FleetError> {
        info!("Waiting for stopping instances to stop");
        let mut stopping = self
            .directory
            .in_states(&[InstanceState::Stopping], selector, false)
            .await?;
        self.waiter
            .wait(
                &mut stopping,
                Some(InstanceState::Stopping),
                Some(InstanceState::Stopped),
            )
            .await
    }

    pub(crate) async fn wait_for_shutting_down(
        &self,
        selector: &Selector,
    ) -> Result<bool, FleetError> {
        info!("Waiting for shutting-down instances to terminate");
        let mut shutting_down = self
            .directory
            .in_states(&[InstanceState::ShuttingDown], selector, false)
            .await?;
        self.waiter
            .wait(
                &mut shutting_down,
                Some(InstanceState::ShuttingDown),
                Some(InstanceState::Terminated),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use flotilla_provider::{MockExecutor, MockProvider};

    use super::*;

    #[test]
    fn new_rejects_invalid_config() {
        let config = ProjectConfig {
            project: "alpha".to_string(),
            email: "owner@example.com".to_string(),
            region: "region-1".to_string(),
            image_id: "img-base".to_string(),
            instance_type: "m.small".to_string(),
            availability_zone: "region-1a".to_string(),
            user: "ubuntu".to_string(),
            security_group: "default".to_string(),
            min_instance_count: 3,
            max_instance_count: 2,
            key_pair: "devkey".to_string(),
            key_file: PathBuf::from("/home/dev/.ssh/devkey.pem"),
            max_wait_tries: 12,
            poll_interval_secs: 10,
            provider: "mock".to_string(),
        };

        let result = FleetProject::new(
            config,
            Arc::new(MockProvider::new()),
            Arc::new(MockExecutor::new()),
        );
        assert!(matches!(result, Err(FleetError::InvalidConfig(_))));
    }
}
