//! The compute provider contract.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::instance::Instance;

/// Tag filter for listing instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceFilter {
    /// Instances whose `ProjectName` tag equals the given value.
    ProjectTag(String),

    /// Instances whose `Name` tag equals the given value exactly.
    NameTag(String),
}

/// Parameters for one create-instances call.
#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub image_id: String,

    /// The provider rejects a reservation it cannot fill to at least this
    /// count. Must be at least 1.
    pub min_count: u32,

    pub max_count: u32,

    pub key_name: String,
    pub security_groups: Vec<String>,
    pub instance_type: String,

    /// Availability zone.
    pub placement: String,
}

/// An ordered batch of newly created instances from one provider call.
///
/// The provider's return order is the order in which identity numbers are
/// assigned to the batch.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: String,
    pub instances: Vec<Instance>,
}

/// The contract the fleet core requires from a compute provider.
///
/// All calls are fallible round-trips to the provider's API; nothing is
/// cached on this side. Lifecycle actions may be refused with
/// [`ProviderError::IncompatibleState`] when the instance's current state
/// cannot accept them.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// List instances matching a tag filter.
    async fn list_instances(&self, filter: &InstanceFilter)
        -> Result<Vec<Instance>, ProviderError>;

    /// Reserve between `min_count` and `max_count` new instances.
    ///
    /// Fails with [`ProviderError::CapacityExceeded`] when even `min_count`
    /// cannot be satisfied.
    async fn create_instances(
        &self,
        request: &ReservationRequest,
    ) -> Result<Reservation, ProviderError>;

    /// Upsert tags on an instance. Idempotent.
    async fn tag_instance(
        &self,
        id: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), ProviderError>;

    async fn start_instance(&self, id: &str) -> Result<(), ProviderError>;

    async fn stop_instance(&self, id: &str) -> Result<(), ProviderError>;

    async fn reboot_instance(&self, id: &str) -> Result<(), ProviderError>;

    async fn terminate_instance(&self, id: &str) -> Result<(), ProviderError>;

    /// Fetch a fresh snapshot of one instance.
    async fn refresh(&self, id: &str) -> Result<Instance, ProviderError>;
}
