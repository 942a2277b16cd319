//! Flat status projection of project instances.

use chrono::{DateTime, Utc};
use serde::Serialize;

use flotilla_identity::{NAME_TAG, OWNER_EMAIL_TAG, PROJECT_TAG};
use flotilla_provider::{Instance, InstanceState};

/// One row of a project status report.
///
/// A pure projection of a refreshed [`Instance`] snapshot; producing these
/// never mutates anything.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceStatus {
    pub id: String,
    pub project_name: Option<String>,
    pub name: Option<String>,
    pub state_code: u8,
    pub state: InstanceState,
    pub public_dns_name: Option<String>,
    pub public_ip_address: Option<String>,
    pub private_dns_name: Option<String>,
    pub private_ip_address: Option<String>,
    pub image_id: String,
    pub instance_type: String,
    pub placement: String,
    pub ssh_key_name: String,
    pub security_groups: Vec<String>,
    pub launch_time: DateTime<Utc>,
    pub owner_email: Option<String>,
}

impl InstanceStatus {
    pub fn of(instance: &Instance) -> Self {
        Self {
            id: instance.id.clone(),
            project_name: instance.tags.get(PROJECT_TAG).cloned(),
            name: instance.tags.get(NAME_TAG).cloned(),
            state_code: instance.state.code(),
            state: instance.state,
            public_dns_name: instance.network.public_dns_name.clone(),
            public_ip_address: instance.network.public_ip_address.clone(),
            private_dns_name: instance.network.private_dns_name.clone(),
            private_ip_address: instance.network.private_ip_address.clone(),
            image_id: instance.image_id.clone(),
            instance_type: instance.instance_type.clone(),
            placement: instance.placement.clone(),
            ssh_key_name: instance.key_name.clone(),
            security_groups: instance.security_groups.clone(),
            launch_time: instance.launch_time,
            owner_email: instance.tags.get(OWNER_EMAIL_TAG).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use flotilla_provider::NetworkInfo;

    use super::*;

    #[test]
    fn projects_tags_and_state_code() {
        let mut tags = BTreeMap::new();
        tags.insert(NAME_TAG.to_string(), "alpha.3".to_string());
        tags.insert(PROJECT_TAG.to_string(), "alpha".to_string());
        tags.insert(OWNER_EMAIL_TAG.to_string(), "owner@example.com".to_string());

        let instance = Instance {
            id: "i-00000003".to_string(),
            state: InstanceState::Stopped,
            network: NetworkInfo::default(),
            tags,
            image_id: "img-base".to_string(),
            instance_type: "m.small".to_string(),
            placement: "zone-a".to_string(),
            key_name: "devkey".to_string(),
            security_groups: vec!["default".to_string()],
            launch_time: Utc::now(),
        };

        let status = InstanceStatus::of(&instance);
        assert_eq!(status.name.as_deref(), Some("alpha.3"));
        assert_eq!(status.project_name.as_deref(), Some("alpha"));
        assert_eq!(status.owner_email.as_deref(), Some("owner@example.com"));
        assert_eq!(status.state_code, 80);
        assert_eq!(status.state, InstanceState::Stopped);
    }

    #[test]
    fn untagged_instance_has_no_names() {
        let instance = Instance {
            id: "i-00000009".to_string(),
            state: InstanceState::Pending,
            network: NetworkInfo::default(),
            tags: BTreeMap::new(),
            image_id: "img-base".to_string(),
            instance_type: "m.small".to_string(),
            placement: "zone-a".to_string(),
            key_name: "devkey".to_string(),
            security_groups: vec![],
            launch_time: Utc::now(),
        };

        let status = InstanceStatus::of(&instance);
        assert!(status.name.is_none());
        assert!(status.project_name.is_none());
        assert!(status.owner_email.is_none());
    }
}
