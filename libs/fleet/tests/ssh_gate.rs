//! Integration tests for the SSH readiness gate and remote sessions.
//!
//! Unlike transition waiting, exhausting the SSH retry budget is a hard
//! failure: provisioning that follows a create or start depends on
//! reachable hosts.

use std::path::PathBuf;
use std::sync::Arc;

use flotilla_fleet::{FleetError, FleetProject, ProjectConfig, Selector};
use flotilla_provider::{ComputeProvider, MockExecutor, MockProvider, RemoteExecutor};

fn test_config(max_wait_tries: u32) -> ProjectConfig {
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
        max_instance_count: 2,
        key_pair: "devkey".to_string(),
        key_file: PathBuf::from("/tmp/devkey.pem"),
        max_wait_tries,
        poll_interval_secs: 0,
        provider: "mock".to_string(),
    }
}

fn project_with_executor(
    provider: &Arc<MockProvider>,
    executor: &Arc<MockExecutor>,
    max_wait_tries: u32,
) -> FleetProject {
    FleetProject::new(
        test_config(max_wait_tries),
        Arc::clone(provider) as Arc<dyn ComputeProvider>,
        Arc::clone(executor) as Arc<dyn RemoteExecutor>,
    )
    .unwrap()
}

#[tokio::test]
async fn create_waits_until_instances_are_ssh_ready() {
    let provider = Arc::new(MockProvider::new());
    // Two probes fail before the fleet answers; with two instances that is
    // one full unready round.
    let executor = Arc::new(MockExecutor::ready_after(2));
    let project = project_with_executor(&provider, &executor, 5);

    project.create(true).await.unwrap();

    assert!(executor.call_count() >= 3);
    assert!(executor
        .calls()
        .iter()
        .all(|(_, command)| command == "hostname"));
}

#[tokio::test]
async fn ssh_gate_exhaustion_is_fatal() {
    let provider = Arc::new(MockProvider::new());
    let executor = Arc::new(MockExecutor::failing());
    let project = project_with_executor(&provider, &executor, 3);

    let err = project.create(true).await.unwrap_err();
    match err {
        FleetError::SshReadinessTimeout { project, pending } => {
            assert_eq!(project, "alpha");
            assert_eq!(pending, 2);
        }
        other => panic!("expected ssh timeout, got {other}"),
    }

    // One probe per instance per attempt, then the gate gave up. The
    // instances themselves are left running; only the gate failed.
    assert_eq!(executor.call_count(), 6);
}

#[tokio::test]
async fn start_probes_the_running_set() {
    let provider = Arc::new(MockProvider::new());
    let executor = Arc::new(MockExecutor::new());
    let project = project_with_executor(&provider, &executor, 5);

    project.create(false).await.unwrap();
    assert_eq!(executor.call_count(), 0);

    project.start(&Selector::All, true).await.unwrap();
    assert_eq!(executor.call_count(), 2);
}

#[tokio::test]
async fn remote_sessions_on_an_empty_project_is_a_distinct_error() {
    let provider = Arc::new(MockProvider::new());
    let executor = Arc::new(MockExecutor::new());
    let project = project_with_executor(&provider, &executor, 5);

    let err = project.remote_sessions(&Selector::All).await.unwrap_err();
    assert!(matches!(err, FleetError::NoHealthyInstances { .. }));
}

#[tokio::test]
async fn run_command_reports_per_instance_outcomes() {
    let provider = Arc::new(MockProvider::new());
    let executor = Arc::new(MockExecutor::new());
    let project = project_with_executor(&provider, &executor, 5);
    project.create(false).await.unwrap();

    let outcomes = project
        .run_command(&Selector::All, "uptime -p")
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.success));
    assert!(executor
        .calls()
        .iter()
        .all(|(_, command)| command == "uptime -p"));
}

#[tokio::test]
async fn sessions_carry_the_projects_credentials() {
    let provider = Arc::new(MockProvider::new());
    let executor = Arc::new(MockExecutor::new());
    let project = project_with_executor(&provider, &executor, 5);
    project.create(false).await.unwrap();

    let sessions = project.remote_sessions(&Selector::All).await.unwrap();
    assert_eq!(sessions.len(), 2);
    for session in &sessions {
        assert_eq!(session.credentials.user, "ubuntu");
        assert_eq!(
            session.credentials.key_file,
            PathBuf::from("/tmp/devkey.pem")
        );
        assert!(!session.address.is_empty());
    }
}
