//! In-memory mock provider for testing and development.
//!
//! Simulates the small slice of a cloud provider the fleet core depends on:
//! tag-filtered listing, bounded reservations with an account-level instance
//! limit, tag upserts, the four lifecycle actions with state guards, and
//! eventual consistency. Transitional states settle one step per
//! [`refresh`](crate::ComputeProvider::refresh) call: `pending` becomes
//! `running`, `stopping` becomes `stopped`, `shutting-down` becomes
//! `terminated`. Addresses are assigned when an instance first reaches
//! `running`, so callers see the address-less window a real provider has.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::error::ProviderError;
use crate::instance::{Instance, InstanceState, NetworkInfo};
use crate::provider::{ComputeProvider, InstanceFilter, Reservation, ReservationRequest};

/// Default account-level cap on non-terminated instances.
const DEFAULT_INSTANCE_LIMIT: usize = 20;

struct MockEntry {
    record: Instance,
    /// A frozen instance never settles out of its current state.
    frozen: bool,
}

struct MockState {
    instances: BTreeMap<String, MockEntry>,
    next_instance: u64,
    next_reservation: u64,
    refresh_calls: u64,
}

/// Mock compute provider.
pub struct MockProvider {
    state: Mutex<MockState>,
    instance_limit: usize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::with_instance_limit(DEFAULT_INSTANCE_LIMIT)
    }

    /// Create a mock with a custom cap on non-terminated instances.
    pub fn with_instance_limit(instance_limit: usize) -> Self {
        Self {
            state: Mutex::new(MockState {
                instances: BTreeMap::new(),
                next_instance: 0,
                next_reservation: 0,
                refresh_calls: 0,
            }),
            instance_limit,
        }
    }

    /// Snapshot every instance the mock knows about, terminated included.
    pub fn all_instances(&self) -> Vec<Instance> {
        let state = self.state.lock().unwrap();
        state.instances.values().map(|e| e.record.clone()).collect()
    }

    /// Count of instances not yet terminated.
    pub fn live_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state
            .instances
            .values()
            .filter(|e| e.record.state != InstanceState::Terminated)
            .count()
    }

    /// Total refresh calls served, across all instances.
    pub fn refresh_calls(&self) -> u64 {
        self.state.lock().unwrap().refresh_calls
    }

    /// Force an instance into a state, bypassing the lifecycle guards.
    pub fn set_state(&self, id: &str, new_state: InstanceState) {
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.instances.get_mut(id) {
            entry.record.state = new_state;
            if new_state == InstanceState::Running {
                assign_addresses(&mut entry.record);
            }
        }
    }

    /// Pin an instance to its current state; refresh stops settling it.
    pub fn freeze(&self, id: &str) {
        if let Some(entry) = self.state.lock().unwrap().instances.get_mut(id) {
            entry.frozen = true;
        }
    }

    /// Let a frozen instance settle again.
    pub fn thaw(&self, id: &str) {
        if let Some(entry) = self.state.lock().unwrap().instances.get_mut(id) {
            entry.frozen = false;
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn assign_addresses(record: &mut Instance) {
    if record.network.public_ip_address.is_some() {
        return;
    }
    // Addressing is derived from the id so snapshots stay stable.
    let serial = record.id.trim_start_matches("i-");
    let low = u64::from_str_radix(serial, 16).unwrap_or(0) % 250 + 1;
    record.network = NetworkInfo {
        public_dns_name: Some(format!("{}.fleet.example.com", record.id)),
        public_ip_address: Some(format!("203.0.113.{low}")),
        private_dns_name: Some(format!("{}.internal.example.com", record.id)),
        private_ip_address: Some(format!("10.0.0.{low}")),
    };
}

fn settle(record: &mut Instance) {
    match record.state {
        InstanceState::Pending => {
            record.state = InstanceState::Running;
            assign_addresses(record);
        }
        InstanceState::Stopping => record.state = InstanceState::Stopped,
        InstanceState::ShuttingDown => record.state = InstanceState::Terminated,
        _ => {}
    }
}

#[async_trait]
impl ComputeProvider for MockProvider {
    async fn list_instances(
        &self,
        filter: &InstanceFilter,
    ) -> Result<Vec<Instance>, ProviderError> {
        let state = self.state.lock().unwrap();
        let matches = |record: &Instance| match filter {
            InstanceFilter::ProjectTag(value) => {
                record.tags.get(flotilla_identity::PROJECT_TAG) == Some(value)
            }
            InstanceFilter::NameTag(value) => {
                record.tags.get(flotilla_identity::NAME_TAG) == Some(value)
            }
        };
        Ok(state
            .instances
            .values()
            .filter(|e| matches(&e.record))
            .map(|e| e.record.clone())
            .collect())
    }

    async fn create_instances(
        &self,
        request: &ReservationRequest,
    ) -> Result<Reservation, ProviderError> {
        if request.min_count < 1 || request.min_count > request.max_count {
            return Err(ProviderError::Api(format!(
                "invalid count bounds: min={} max={}",
                request.min_count, request.max_count
            )));
        }

        let mut state = self.state.lock().unwrap();
        let live = state
            .instances
            .values()
            .filter(|e| e.record.state != InstanceState::Terminated)
            .count();

        if live + request.min_count as usize > self.instance_limit {
            return Err(ProviderError::CapacityExceeded {
                detail: format!(
                    "account allows {} more non-terminated instances, {} requested",
                    self.instance_limit.saturating_sub(live),
                    request.min_count
                ),
            });
        }

        // Fill up to max_count, clamped to the remaining headroom.
        let headroom = self.instance_limit.saturating_sub(live);
        let granted = (request.max_count as usize).min(headroom);

        let mut instances = Vec::with_capacity(granted);
        for _ in 0..granted {
            state.next_instance += 1;
            let record = Instance {
                id: format!("i-{:08x}", state.next_instance),
                state: InstanceState::Pending,
                network: NetworkInfo::default(),
                tags: BTreeMap::new(),
                image_id: request.image_id.clone(),
                instance_type: request.instance_type.clone(),
                placement: request.placement.clone(),
                key_name: request.key_name.clone(),
                security_groups: request.security_groups.clone(),
                launch_time: Utc::now(),
            };
            state.instances.insert(
                record.id.clone(),
                MockEntry {
                    record: record.clone(),
                    frozen: false,
                },
            );
            instances.push(record);
        }

        state.next_reservation += 1;
        let reservation_id = format!("r-{:04x}", state.next_reservation);

        info!(
            reservation = %reservation_id,
            granted,
            requested_min = request.min_count,
            requested_max = request.max_count,
            "[MOCK] Reserved instances"
        );

        Ok(Reservation {
            id: reservation_id,
            instances,
        })
    }

    async fn tag_instance(
        &self,
        id: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        let entry = state
            .instances
            .get_mut(id)
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;
        for (key, value) in tags {
            entry.record.tags.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn start_instance(&self, id: &str) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        let entry = state
            .instances
            .get_mut(id)
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;
        match entry.record.state {
            InstanceState::Terminated | InstanceState::ShuttingDown => {
                Err(ProviderError::IncompatibleState {
                    id: id.to_string(),
                    action: "start",
                    state: entry.record.state,
                })
            }
            InstanceState::Running | InstanceState::Pending => Ok(()),
            _ => {
                debug!(id, "[MOCK] start");
                entry.record.state = InstanceState::Pending;
                Ok(())
            }
        }
    }

    async fn stop_instance(&self, id: &str) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        let entry = state
            .instances
            .get_mut(id)
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;
        match entry.record.state {
            InstanceState::Terminated | InstanceState::ShuttingDown => {
                Err(ProviderError::IncompatibleState {
                    id: id.to_string(),
                    action: "stop",
                    state: entry.record.state,
                })
            }
            InstanceState::Stopped => Ok(()),
            _ => {
                debug!(id, "[MOCK] stop");
                entry.record.state = InstanceState::Stopping;
                Ok(())
            }
        }
    }

    async fn reboot_instance(&self, id: &str) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        let entry = state
            .instances
            .get_mut(id)
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;
        // An in-place restart only makes sense for a running instance.
        if entry.record.state != InstanceState::Running {
            return Err(ProviderError::IncompatibleState {
                id: id.to_string(),
                action: "reboot",
                state: entry.record.state,
            });
        }
        debug!(id, "[MOCK] reboot");
        Ok(())
    }

    async fn terminate_instance(&self, id: &str) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        let entry = state
            .instances
            .get_mut(id)
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;
        if entry.record.state != InstanceState::Terminated {
            debug!(id, "[MOCK] terminate");
            entry.record.state = InstanceState::ShuttingDown;
        }
        Ok(())
    }

    async fn refresh(&self, id: &str) -> Result<Instance, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.refresh_calls += 1;
        let entry = state
            .instances
            .get_mut(id)
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;
        if !entry.frozen {
            settle(&mut entry.record);
        }
        Ok(entry.record.clone())
    }
}
