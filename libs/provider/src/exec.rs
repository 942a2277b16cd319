//! Remote command execution interface and implementations.
//!
//! The fleet core probes SSH readiness and runs fleet-wide commands through
//! this seam. The contract is deliberately narrow: one command against one
//! address, success or failure. [`SshExecutor`] shells out to `ssh(1)`;
//! [`MockExecutor`] scripts readiness for tests.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Credentials for reaching an instance over SSH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshCredentials {
    /// Account username on the instance; must match the machine image.
    pub user: String,

    /// Path to the private key file.
    pub key_file: PathBuf,
}

/// Remote command execution against a single instance.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run `command` on `address`; true on success, false on any failure.
    async fn run(&self, address: &str, credentials: &SshCredentials, command: &str) -> bool;
}

/// Executor that spawns the system `ssh` client.
pub struct SshExecutor {
    /// Connection timeout handed to ssh, in seconds.
    pub connect_timeout_secs: u64,
}

impl SshExecutor {
    pub fn new() -> Self {
        Self {
            connect_timeout_secs: 10,
        }
    }
}

impl Default for SshExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn run(&self, address: &str, credentials: &SshCredentials, command: &str) -> bool {
        let status = Command::new("ssh")
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg("StrictHostKeyChecking=accept-new")
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout_secs))
            .arg("-i")
            .arg(&credentials.key_file)
            .arg(format!("{}@{}", credentials.user, address))
            .arg("--")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => status.success(),
            Err(e) => {
                debug!(address, error = %e, "Failed to spawn ssh");
                false
            }
        }
    }
}

struct MockExecState {
    /// Commands seen, as `(address, command)` pairs.
    calls: Vec<(String, String)>,

    /// Failures to serve before starting to succeed.
    refusals_left: u64,

    fail_all: bool,
}

/// Mock executor with scriptable readiness.
pub struct MockExecutor {
    state: Mutex<MockExecState>,
}

impl MockExecutor {
    /// An executor where every command succeeds.
    pub fn new() -> Self {
        Self::ready_after(0)
    }

    /// An executor where every command fails.
    pub fn failing() -> Self {
        Self {
            state: Mutex::new(MockExecState {
                calls: Vec::new(),
                refusals_left: 0,
                fail_all: true,
            }),
        }
    }

    /// An executor that fails the first `refusals` commands, then succeeds.
    pub fn ready_after(refusals: u64) -> Self {
        Self {
            state: Mutex::new(MockExecState {
                calls: Vec::new(),
                refusals_left: refusals,
                fail_all: false,
            }),
        }
    }

    /// The `(address, command)` pairs run so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteExecutor for MockExecutor {
    async fn run(&self, address: &str, _credentials: &SshCredentials, command: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        state.calls.push((address.to_string(), command.to_string()));
        if state.fail_all {
            return false;
        }
        if state.refusals_left > 0 {
            state.refusals_left -= 1;
            return false;
        }
        true
    }
}
