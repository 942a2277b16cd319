//! The single read-path for a project's instances.
//!
//! Every other component goes through the directory to see the fleet. The
//! provider is the sole source of truth, so each listing re-fetches every
//! instance's live state; nothing is cached between calls.

use std::sync::Arc;

use flotilla_provider::{ComputeProvider, Instance, InstanceFilter, InstanceState};

use crate::error::FleetError;
use crate::selector::Selector;

/// Tag-filtered, always-fresh instance lookups for one project.
#[derive(Clone)]
pub struct InstanceDirectory {
    provider: Arc<dyn ComputeProvider>,
    project: String,
}

impl InstanceDirectory {
    pub fn new(provider: Arc<dyn ComputeProvider>, project: impl Into<String>) -> Self {
        Self {
            provider,
            project: project.into(),
        }
    }

    /// All instances tagged for this project, terminated ones included.
    pub async fn list_project(&self) -> Result<Vec<Instance>, FleetError> {
        let filter = InstanceFilter::ProjectTag(self.project.clone());
        let instances = self.provider.list_instances(&filter).await?;
        self.refresh_all(instances).await
    }

    /// Instances whose `Name` tag is exactly the live tag for `number`.
    pub async fn list_by_number(&self, number: u32) -> Result<Vec<Instance>, FleetError> {
        let name = flotilla_identity::name_tag(&self.project, number);
        let instances = self
            .provider
            .list_instances(&InstanceFilter::NameTag(name))
            .await?;
        self.refresh_all(instances).await
    }

    /// The selector-narrowed instance set.
    ///
    /// A number-based selector turns into per-number lookups; anything else
    /// is a whole-project listing.
    pub async fn select(&self, selector: &Selector) -> Result<Vec<Instance>, FleetError> {
        match selector.numbers() {
            Some(numbers) => {
                let mut instances = Vec::new();
                for number in numbers {
                    instances.extend(self.list_by_number(*number).await?);
                }
                Ok(instances)
            }
            None => self.list_project().await,
        }
    }

    /// Selected instances that are not terminated and not shutting down.
    pub async fn healthy(&self, selector: &Selector) -> Result<Vec<Instance>, FleetError> {
        let instances = self.select(selector).await?;
        Ok(instances.into_iter().filter(Instance::is_healthy).collect())
    }

    /// Selected instances filtered by state membership.
    ///
    /// With `invert` set, returns instances whose state is *not* in
    /// `states`.
    pub async fn in_states(
        &self,
        states: &[InstanceState],
        selector: &Selector,
        invert: bool,
    ) -> Result<Vec<Instance>, FleetError> {
        let instances = self.select(selector).await?;
        Ok(instances
            .into_iter()
            .filter(|instance| states.contains(&instance.state) != invert)
            .collect())
    }

    async fn refresh_all(&self, instances: Vec<Instance>) -> Result<Vec<Instance>, FleetError> {
        let mut refreshed = Vec::with_capacity(instances.len());
        for instance in instances {
            refreshed.push(self.provider.refresh(&instance.id).await?);
        }
        Ok(refreshed)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

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

    async fn seeded_directory(count: u32) -> (Arc<MockProvider>, InstanceDirectory) {
        let provider = Arc::new(MockProvider::new());
        let reservation = provider.create_instances(&request(count)).await.unwrap();
        for (index, instance) in reservation.instances.iter().enumerate() {
            let mut tags = BTreeMap::new();
            let number = index as u32 + 1;
            tags.insert(
                "Name".to_string(),
                flotilla_identity::name_tag("alpha", number),
            );
            tags.insert("ProjectName".to_string(), "alpha".to_string());
            provider.tag_instance(&instance.id, &tags).await.unwrap();
        }
        let directory = InstanceDirectory::new(provider.clone(), "alpha");
        (provider, directory)
    }

    #[tokio::test]
    async fn list_project_returns_refreshed_state() {
        let (_, directory) = seeded_directory(3).await;
        let instances = directory.list_project().await.unwrap();
        assert_eq!(instances.len(), 3);
        // The listing itself refreshed each instance, settling pending.
        assert!(instances
            .iter()
            .all(|i| i.state == InstanceState::Running));
    }

    #[tokio::test]
    async fn list_by_number_is_an_exact_match() {
        let (_, directory) = seeded_directory(3).await;
        let instances = directory.list_by_number(2).await.unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].identity_number().unwrap(), Some(2));

        assert!(directory.list_by_number(9).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn select_with_numbers_does_per_number_lookups() {
        let (_, directory) = seeded_directory(3).await;
        let instances = directory
            .select(&Selector::Numbers(vec![1, 3]))
            .await
            .unwrap();
        let numbers: Vec<_> = instances
            .iter()
            .map(|i| i.identity_number().unwrap().unwrap())
            .collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[tokio::test]
    async fn healthy_excludes_dying_instances() {
        let (provider, directory) = seeded_directory(3).await;
        let instances = directory.list_project().await.unwrap();
        provider.set_state(&instances[0].id, InstanceState::ShuttingDown);
        provider.freeze(&instances[0].id);

        let healthy = directory.healthy(&Selector::All).await.unwrap();
        assert_eq!(healthy.len(), 2);
    }

    #[tokio::test]
    async fn in_states_inverted_filters_membership_out() {
        let (provider, directory) = seeded_directory(3).await;
        let instances = directory.list_project().await.unwrap();
        provider.set_state(&instances[0].id, InstanceState::Stopped);

        let stopped = directory
            .in_states(&[InstanceState::Stopped], &Selector::All, false)
            .await
            .unwrap();
        assert_eq!(stopped.len(), 1);

        let not_stopped = directory
            .in_states(&[InstanceState::Stopped], &Selector::All, true)
            .await
            .unwrap();
        assert_eq!(not_stopped.len(), 2);
    }
}
