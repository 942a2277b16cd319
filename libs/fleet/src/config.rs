//! Project configuration.
//!
//! One TOML file describes a project: its name, the machine image and
//! instance shape to run, the replica range to converge to, and the wait
//! budget for state transitions. Everything the lifecycle operations need
//! comes from here; nothing is read from ambient state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::FleetError;
use flotilla_provider::SshCredentials;

fn default_user() -> String {
    "ubuntu".to_string()
}

fn default_security_group() -> String {
    "default".to_string()
}

fn default_instance_count() -> u32 {
    1
}

fn default_max_wait_tries() -> u32 {
    12
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_backend() -> String {
    "mock".to_string()
}

/// Configuration for one flotilla project.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Project name; becomes the `ProjectName` tag and the prefix of every
    /// instance's `Name` tag.
    pub project: String,

    /// Contact address of the project owner; becomes the `OwnerEmail` tag.
    pub email: String,

    /// Provider region to operate in.
    pub region: String,

    /// Machine image to boot new instances from. Must exist in `region`.
    pub image_id: String,

    /// Instance type; must match the image.
    pub instance_type: String,

    /// Availability zone for new instances.
    pub availability_zone: String,

    /// Account username on the instances; must match the image.
    #[serde(default = "default_user")]
    pub user: String,

    /// Security group name for new instances.
    #[serde(default = "default_security_group")]
    pub security_group: String,

    #[serde(default = "default_instance_count")]
    pub min_instance_count: u32,

    #[serde(default = "default_instance_count")]
    pub max_instance_count: u32,

    /// Provider key pair name used for new instances.
    pub key_pair: String,

    /// Path to the private key file matching `key_pair`.
    pub key_file: PathBuf,

    /// Polling attempts allowed when waiting out a state transition.
    #[serde(default = "default_max_wait_tries")]
    pub max_wait_tries: u32,

    /// Seconds between polling attempts.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Compute provider backend name.
    #[serde(default = "default_backend")]
    pub provider: String,
}

impl ProjectConfig {
    /// Load and parse a project configuration file.
    pub fn load(path: &Path) -> Result<Self, FleetError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            FleetError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&contents).map_err(|e| {
            FleetError::InvalidConfig(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), FleetError> {
        let required = [
            ("project", &self.project),
            ("email", &self.email),
            ("region", &self.region),
            ("image_id", &self.image_id),
            ("instance_type", &self.instance_type),
            ("availability_zone", &self.availability_zone),
            ("user", &self.user),
            ("security_group", &self.security_group),
            ("key_pair", &self.key_pair),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(FleetError::InvalidConfig(format!("{field} is missing")));
            }
        }

        if self.key_file.as_os_str().is_empty() {
            return Err(FleetError::InvalidConfig("key_file is missing".to_string()));
        }

        // Minimal shape check; full address validation belongs to the mail
        // system, not here.
        let email_ok = match self.email.split_once('@') {
            Some((local, domain)) => !local.is_empty() && domain.contains('.'),
            None => false,
        };
        if !email_ok {
            return Err(FleetError::InvalidConfig(format!(
                "email '{}' is not valid",
                self.email
            )));
        }

        if !(0 < self.min_instance_count && self.min_instance_count <= self.max_instance_count) {
            return Err(FleetError::InvalidConfig(
                "instance counts must satisfy 0 < min_instance_count <= max_instance_count"
                    .to_string(),
            ));
        }

        if self.max_wait_tries == 0 {
            return Err(FleetError::InvalidConfig(
                "max_wait_tries must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// SSH credentials for reaching this project's instances.
    pub fn credentials(&self) -> SshCredentials {
        SshCredentials {
            user: self.user.clone(),
            key_file: self.key_file.clone(),
        }
    }

    /// Sleep between polling attempts.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ProjectConfig {
        ProjectConfig {
            project: "alpha".to_string(),
            email: "owner@example.com".to_string(),
            region: "region-1".to_string(),
            image_id: "img-base".to_string(),
            instance_type: "m.small".to_string(),
            availability_zone: "region-1a".to_string(),
            user: "ubuntu".to_string(),
            security_group: "default".to_string(),
            min_instance_count: 2,
            max_instance_count: 5,
            key_pair: "devkey".to_string(),
            key_file: PathBuf::from("/home/dev/.ssh/devkey.pem"),
            max_wait_tries: 12,
            poll_interval_secs: 10,
            provider: "mock".to_string(),
        }
    }

    #[test]
    fn valid_config_passes() {
        valid_config().validate().unwrap();
    }

    #[test]
    fn parses_toml_with_defaults() {
        let config: ProjectConfig = toml::from_str(
            r#"
            project = "alpha"
            email = "owner@example.com"
            region = "region-1"
            image_id = "img-base"
            instance_type = "m.small"
            availability_zone = "region-1a"
            key_pair = "devkey"
            key_file = "/home/dev/.ssh/devkey.pem"
            "#,
        )
        .unwrap();

        assert_eq!(config.user, "ubuntu");
        assert_eq!(config.security_group, "default");
        assert_eq!(config.min_instance_count, 1);
        assert_eq!(config.max_instance_count, 1);
        assert_eq!(config.max_wait_tries, 12);
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.provider, "mock");
        config.validate().unwrap();
    }

    #[test]
    fn empty_project_is_rejected() {
        let mut config = valid_config();
        config.project = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_email_is_rejected() {
        for email in ["owner", "owner@", "@example.com", "owner@nodot"] {
            let mut config = valid_config();
            config.email = email.to_string();
            assert!(config.validate().is_err(), "accepted '{email}'");
        }
    }

    #[test]
    fn zero_min_count_is_rejected() {
        let mut config = valid_config();
        config.min_instance_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn min_above_max_is_rejected() {
        let mut config = valid_config();
        config.min_instance_count = 6;
        config.max_instance_count = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_wait_tries_is_rejected() {
        let mut config = valid_config();
        config.max_wait_tries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn credentials_come_from_user_and_key_file() {
        let credentials = valid_config().credentials();
        assert_eq!(credentials.user, "ubuntu");
        assert_eq!(credentials.key_file, PathBuf::from("/home/dev/.ssh/devkey.pem"));
    }
}
