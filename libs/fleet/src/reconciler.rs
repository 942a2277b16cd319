//! Replica-range convergence.
//!
//! The reconciler drives the create operation: given the current healthy
//! pool and the configured `[min, max]` range, it decides how many instances
//! to retire or reserve, restarts the survivors, and assigns identity
//! numbers to the newcomers. The decision itself is a pure function
//! ([`ReplicaPlan::compute`]); the driver applies it through the provider.

use tracing::{debug, info, warn};

use flotilla_provider::Instance;

use crate::error::FleetError;
use crate::project::FleetProject;

/// How the healthy pool must change to land inside `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaPlan {
    /// Healthy instances beyond `max` that must be retired.
    pub excess: usize,

    /// Reservation lower bound; 0 in the pure top-up case.
    pub lower_bound: u32,

    /// Reservation upper bound; 0 means no reservation at all.
    pub upper_bound: u32,
}

impl ReplicaPlan {
    /// Decide how to move `healthy` instances into `[min, max]`.
    ///
    /// Counts are compared as plain integers; `0 < min <= max` is enforced
    /// by configuration validation upstream.
    pub fn compute(healthy: usize, min: u32, max: u32) -> Self {
        if healthy > max as usize {
            Self {
                excess: healthy - max as usize,
                lower_bound: 0,
                upper_bound: 0,
            }
        } else {
            let healthy = healthy as u32;
            Self {
                excess: 0,
                lower_bound: min.saturating_sub(healthy),
                upper_bound: max - healthy,
            }
        }
    }

    pub fn needs_reservation(&self) -> bool {
        self.upper_bound > 0
    }

    /// Bounds actually sent to the provider.
    ///
    /// The provider requires a strictly positive minimum, even when the true
    /// lower bound is zero (pure top-up).
    pub fn request_bounds(&self) -> (u32, u32) {
        (self.lower_bound.max(1), self.upper_bound)
    }
}

impl FleetProject {
    /// Converge the healthy pool to the configured replica range.
    ///
    /// Returns the new healthy set: survivors plus any freshly reserved and
    /// tagged instances, all with a provider action issued toward `running`.
    pub(crate) async fn converge_replicas(
        &self,
        mut healthy: Vec<Instance>,
    ) -> Result<Vec<Instance>, FleetError> {
        let plan = ReplicaPlan::compute(
            healthy.len(),
            self.config.min_instance_count,
            self.config.max_instance_count,
        );

        if plan.excess > 0 {
            // No ordering guarantee; the tail of the listing goes first.
            let excess = healthy.split_off(healthy.len() - plan.excess);
            info!(count = excess.len(), "Terminating excess instances");
            self.terminate_instances(excess).await?;
        }

        for instance in &healthy {
            if let Err(e) = self.restart_instance(instance).await {
                warn!(id = %instance.id, error = %e, "Failed to restart instance, continuing");
            }
        }

        if plan.needs_reservation() {
            let (min_count, max_count) = plan.request_bounds();
            info!(
                min = min_count,
                max = max_count,
                "Requesting additional instances"
            );
            let newcomers = self.reserve_and_tag(min_count, max_count).await?;
            healthy.extend(newcomers);
        }

        Ok(healthy)
    }

    /// Restart one healthy instance: native reboot, falling back to start
    /// when the instance is not currently running.
    async fn restart_instance(&self, instance: &Instance) -> Result<(), FleetError> {
        match self.provider.reboot_instance(&instance.id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_incompatible_state() => {
                debug!(id = %instance.id, "Reboot refused, starting instead");
                self.provider.start_instance(&instance.id).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The highest identity number ever allocated in this project.
    ///
    /// Scans all project-tagged instances including terminated ones, so
    /// retired numbers are never reissued. Instances reserved but not yet
    /// tagged are skipped.
    pub(crate) async fn max_allocated_number(&self) -> Result<u32, FleetError> {
        let instances = self.directory.list_project().await?;
        let mut max = 0;
        for instance in &instances {
            if let Some(number) = instance.identity_number()? {
                max = max.max(number);
            }
        }
        Ok(max)
    }

    /// Reserve new instances and assign them consecutive identity numbers.
    async fn reserve_and_tag(
        &self,
        min_count: u32,
        max_count: u32,
    ) -> Result<Vec<Instance>, FleetError> {
        // The high-water mark must be read before the reservation so tagging
        // can begin the moment the batch comes back.
        let next = self.max_allocated_number().await? + 1;

        let reservation = self.reserve(min_count, max_count).await?;
        debug!(granted = reservation.instances.len(), "Instances provided");

        let mut tagged = Vec::with_capacity(reservation.instances.len());
        for (number, instance) in (next..).zip(reservation.instances) {
            self.tag_live(&instance.id, number).await?;
            tagged.push(instance);
        }
        Ok(tagged)
    }
}
