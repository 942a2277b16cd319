//! Output formatting for CLI commands.

use anyhow::Result;
use colored::Colorize;
use tabled::{Table, Tabled};

use flotilla_fleet::{ExecOutcome, InstanceStatus};

/// Output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("invalid format '{other}' (expected 'table' or 'json')"),
        }
    }
}

/// One table row of a status report.
#[derive(Debug, Tabled)]
struct StatusRow {
    #[tabled(rename = "Instance")]
    instance: String,

    #[tabled(rename = "State")]
    state: String,

    #[tabled(rename = "Public")]
    public: String,

    #[tabled(rename = "SSHKey")]
    ssh_key: String,

    #[tabled(rename = "SecurityGroups")]
    security_groups: String,

    #[tabled(rename = "Zone")]
    zone: String,

    #[tabled(rename = "Contact")]
    contact: String,
}

fn dash(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

impl From<&InstanceStatus> for StatusRow {
    fn from(status: &InstanceStatus) -> Self {
        Self {
            instance: format!("{}|{}", status.id, dash(&status.name)),
            state: format!("{}|{}", status.state_code, status.state),
            public: format!(
                "{}|{}",
                dash(&status.public_dns_name),
                dash(&status.public_ip_address)
            ),
            ssh_key: status.ssh_key_name.clone(),
            security_groups: status.security_groups.join(", "),
            zone: status.placement.clone(),
            contact: dash(&status.owner_email).to_string(),
        }
    }
}

/// Print a status report in the chosen format.
pub fn print_statuses(statuses: &[InstanceStatus], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if statuses.is_empty() {
                println!("{}", "No instances found.".dimmed());
            } else {
                let rows: Vec<StatusRow> = statuses.iter().map(StatusRow::from).collect();
                println!("{}", Table::new(rows));
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(statuses).unwrap_or_else(|_| "[]".to_string());
            println!("{json}");
        }
    }
}

/// Print per-instance results of a fleet-wide command.
pub fn print_exec_outcomes(outcomes: &[ExecOutcome], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            for outcome in outcomes {
                let verdict = if outcome.success {
                    "ok".green()
                } else {
                    "failed".red()
                };
                println!(
                    "{} ({}): {}",
                    outcome.instance_id, outcome.address, verdict
                );
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(outcomes).unwrap_or_else(|_| "[]".to_string());
            println!("{json}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use flotilla_provider::InstanceState;

    fn status(name: Option<&str>) -> InstanceStatus {
        InstanceStatus {
            id: "i-00000001".to_string(),
            project_name: Some("alpha".to_string()),
            name: name.map(str::to_string),
            state_code: 16,
            state: InstanceState::Running,
            public_dns_name: Some("host.fleet.example.com".to_string()),
            public_ip_address: Some("203.0.113.7".to_string()),
            private_dns_name: None,
            private_ip_address: None,
            image_id: "img-base".to_string(),
            instance_type: "m.small".to_string(),
            placement: "zone-a".to_string(),
            ssh_key_name: "devkey".to_string(),
            security_groups: vec!["default".to_string(), "web".to_string()],
            launch_time: Utc::now(),
            owner_email: Some("owner@example.com".to_string()),
        }
    }

    #[test]
    fn row_pairs_id_with_name_and_code_with_state() {
        let row = StatusRow::from(&status(Some("alpha.1")));
        assert_eq!(row.instance, "i-00000001|alpha.1");
        assert_eq!(row.state, "16|running");
        assert_eq!(row.public, "host.fleet.example.com|203.0.113.7");
        assert_eq!(row.security_groups, "default, web");
    }

    #[test]
    fn row_dashes_missing_fields() {
        let row = StatusRow::from(&status(None));
        assert_eq!(row.instance, "i-00000001|-");
    }

    #[test]
    fn format_parse_rejects_unknown() {
        assert!(OutputFormat::parse("table").is_ok());
        assert!(OutputFormat::parse("json").is_ok());
        assert!(OutputFormat::parse("yaml").is_err());
    }
}
