//! Bounded-retry state-transition waiting.
//!
//! The waiter underlies every lifecycle operation: after issuing a provider
//! action, callers block here until the affected instances have moved on, or
//! until the retry budget runs out. Exhaustion is *not* an error: the
//! provider is eventually consistent and indefinite blocking is worse than
//! proceeding, so the waiter reports non-convergence and the caller
//! re-derives true state from the provider afterward.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use flotilla_provider::{ComputeProvider, Instance, InstanceState};

use crate::error::FleetError;

/// Polls a set of instances until a state transition completes.
pub struct TransitionWaiter {
    provider: Arc<dyn ComputeProvider>,
    max_tries: u32,
    poll_interval: Duration,
}

impl TransitionWaiter {
    pub fn new(provider: Arc<dyn ComputeProvider>, max_tries: u32, poll_interval: Duration) -> Self {
        Self {
            provider,
            max_tries,
            poll_interval,
        }
    }

    /// Wait for `instances` to leave `from` and/or reach `to`.
    ///
    /// An instance still blocks the wait if its refreshed state equals
    /// `from` (when given), or differs from `to` (when given). Each attempt
    /// refreshes every instance in place, so the slice holds live state when
    /// this returns. Returns whether all instances cleared within the
    /// budget; an empty set clears trivially.
    pub async fn wait(
        &self,
        instances: &mut [Instance],
        from: Option<InstanceState>,
        to: Option<InstanceState>,
    ) -> Result<bool, FleetError> {
        if instances.is_empty() {
            return Ok(true);
        }

        for attempt in 1..=self.max_tries {
            debug!(
                count = instances.len(),
                from = from.map(|s| s.as_str()),
                to = to.map(|s| s.as_str()),
                attempt,
                max_tries = self.max_tries,
                "Waiting for state transition"
            );

            let mut blocked = 0usize;
            for instance in instances.iter_mut() {
                *instance = self.provider.refresh(&instance.id).await?;
                let state = instance.state;
                let still_blocks = from.is_some_and(|f| state == f)
                    || to.is_some_and(|t| state != t);
                if still_blocks {
                    blocked += 1;
                }
            }

            if blocked == 0 {
                return Ok(true);
            }

            // No sleep after the final attempt.
            if attempt < self.max_tries {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        warn!(
            count = instances.len(),
            from = from.map(|s| s.as_str()),
            to = to.map(|s| s.as_str()),
            "Timed out waiting for state transition, continuing with current states"
        );
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use flotilla_provider::{MockProvider, ReservationRequest};

    use super::*;

    fn request(count: u32) -> ReservationRequest {
        ReservationRequest {
            image_id: "img-base".to_string(),
            min_count: count,
            max_count: count,
            key_name: "devkey".to_string(),
            security_groups: vec!["default".to_string()],
            instance_type: "m.small".to_string(),
            placement: "zone-a".to_string(),
        }
    }

    fn waiter(provider: &Arc<MockProvider>, max_tries: u32) -> TransitionWaiter {
        TransitionWaiter::new(provider.clone(), max_tries, Duration::ZERO)
    }

    #[tokio::test]
    async fn empty_set_clears_immediately() {
        let provider = Arc::new(MockProvider::new());
        let converged = waiter(&provider, 3)
            .wait(&mut [], Some(InstanceState::Pending), None)
            .await
            .unwrap();
        assert!(converged);
        assert_eq!(provider.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn pending_instances_converge_to_running() {
        let provider = Arc::new(MockProvider::new());
        let mut instances = provider
            .create_instances(&request(3))
            .await
            .unwrap()
            .instances;

        let converged = waiter(&provider, 5)
            .wait(
                &mut instances,
                Some(InstanceState::Pending),
                Some(InstanceState::Running),
            )
            .await
            .unwrap();

        assert!(converged);
        assert!(instances
            .iter()
            .all(|i| i.state == InstanceState::Running));
    }

    #[tokio::test]
    async fn exhaustion_polls_exactly_max_tries_and_is_not_an_error() {
        let provider = Arc::new(MockProvider::new());
        let mut instances = provider
            .create_instances(&request(1))
            .await
            .unwrap()
            .instances;
        provider.freeze(&instances[0].id);

        let converged = waiter(&provider, 4)
            .wait(&mut instances, None, Some(InstanceState::Running))
            .await
            .unwrap();

        assert!(!converged);
        // One refresh per attempt for the single instance.
        assert_eq!(provider.refresh_calls(), 4);
    }

    #[tokio::test]
    async fn from_only_wait_clears_when_state_leaves() {
        let provider = Arc::new(MockProvider::new());
        let mut instances = provider
            .create_instances(&request(1))
            .await
            .unwrap()
            .instances;

        // Blocks only while still pending; one refresh settles it.
        let converged = waiter(&provider, 2)
            .wait(&mut instances, Some(InstanceState::Pending), None)
            .await
            .unwrap();

        assert!(converged);
        assert_eq!(instances[0].state, InstanceState::Running);
    }
}
