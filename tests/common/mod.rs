//! Common test utilities for reconciler integration tests.
//!
//! Provides a scripted in-memory [`VaultApi`] implementation that records
//! every call, so tests can assert exactly which remote operations a pass
//! performed.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use vault_config_reconciler::client::{
    ClientError, MountConfig, MountInfo, MountInput, Secret, SecretData, VaultApi,
};
use vault_config_reconciler::SecretsEngine;

/// Paths passed to each remote operation, in call order.
#[derive(Debug, Default, Clone)]
pub struct Calls {
    pub mounts: Vec<String>,
    pub tunes: Vec<String>,
    pub unmounts: Vec<String>,
    pub reads: Vec<String>,
    pub writes: Vec<String>,
    pub status_probes: Vec<String>,
}

#[derive(Debug, Default)]
struct MockState {
    mounts: HashMap<String, MountInfo>,
    auth: HashMap<String, MountInfo>,
    storage: HashMap<String, SecretData>,
    statuses: HashMap<String, u16>,
    write_responses: HashMap<String, SecretData>,
    mount_failures: HashMap<String, usize>,
    conflicts: HashSet<String>,
    fail_auth_listing: bool,
    calls: Calls,
    mount_instants: Vec<tokio::time::Instant>,
}

/// In-memory Vault double. Builder methods script the server's state and
/// failure behavior before a pass runs.
#[derive(Debug, Default)]
pub struct MockVault {
    state: Mutex<MockState>,
}

impl MockVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-mount an engine at `path` (listing key gains the trailing `/`).
    pub fn with_mount(self, path: &str, engine_type: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.mounts.insert(
                format!("{path}/"),
                MountInfo {
                    accessor: format!("{engine_type}_{path}_acc"),
                    mount_type: engine_type.to_string(),
                    description: String::new(),
                },
            );
        }
        self
    }

    /// Pre-enable an auth method with the given accessor.
    pub fn with_auth(self, path: &str, accessor: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.auth.insert(
                format!("{path}/"),
                MountInfo {
                    accessor: accessor.to_string(),
                    mount_type: "userpass".to_string(),
                    description: String::new(),
                },
            );
        }
        self
    }

    /// Seed data at a logical path.
    pub fn with_secret(self, path: &str, data: SecretData) -> Self {
        self.state
            .lock()
            .unwrap()
            .storage
            .insert(path.to_string(), data);
        self
    }

    /// Script the raw status probe for a path (default is 404).
    pub fn with_status(self, path: &str, status: u16) -> Self {
        self.state
            .lock()
            .unwrap()
            .statuses
            .insert(path.to_string(), status);
        self
    }

    /// Script data the server returns from a write to `path`.
    pub fn with_write_response(self, path: &str, data: SecretData) -> Self {
        self.state
            .lock()
            .unwrap()
            .write_responses
            .insert(path.to_string(), data);
        self
    }

    /// Fail the next `failures` mount attempts for `path`.
    pub fn with_mount_failures(self, path: &str, failures: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .mount_failures
            .insert(path.to_string(), failures);
        self
    }

    /// Make writes to `path` fail with the server's overwrite-conflict
    /// response.
    pub fn with_conflict(self, path: &str) -> Self {
        self.state.lock().unwrap().conflicts.insert(path.to_string());
        self
    }

    /// Make the auth-method listing fail.
    pub fn with_failing_auth_listing(self) -> Self {
        self.state.lock().unwrap().fail_auth_listing = true;
        self
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls.clone()
    }

    /// Virtual timestamps of each mount attempt (for backoff assertions
    /// under a paused runtime clock).
    pub fn mount_instants(&self) -> Vec<tokio::time::Instant> {
        self.state.lock().unwrap().mount_instants.clone()
    }

    pub fn has_mount(&self, path: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .mounts
            .contains_key(&format!("{path}/"))
    }

    pub fn stored(&self, path: &str) -> Option<SecretData> {
        self.state.lock().unwrap().storage.get(path).cloned()
    }
}

fn server_error(path: &str, status: u16, message: &str) -> ClientError {
    ClientError::Api {
        path: path.to_string(),
        status,
        errors: vec![message.to_string()],
    }
}

#[async_trait]
impl VaultApi for MockVault {
    async fn list_mounts(&self) -> Result<HashMap<String, MountInfo>, ClientError> {
        Ok(self.state.lock().unwrap().mounts.clone())
    }

    async fn mount(&self, path: &str, input: &MountInput) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.mounts.push(path.to_string());
        state.mount_instants.push(tokio::time::Instant::now());

        if let Some(remaining) = state.mount_failures.get_mut(path) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(server_error(path, 500, "internal error"));
            }
        }

        state.mounts.insert(
            format!("{path}/"),
            MountInfo {
                accessor: format!("{}_{path}_acc", input.engine_type),
                mount_type: input.engine_type.clone(),
                description: input.description.clone(),
            },
        );

        Ok(())
    }

    async fn tune_mount(&self, path: &str, _config: &MountConfig) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.tunes.push(path.to_string());

        if state.mounts.contains_key(&format!("{path}/")) {
            Ok(())
        } else {
            Err(server_error(path, 400, "no matching mount"))
        }
    }

    async fn unmount(&self, path: &str) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.unmounts.push(path.to_string());
        state.mounts.remove(&format!("{path}/"));

        Ok(())
    }

    async fn list_auth(&self) -> Result<HashMap<String, MountInfo>, ClientError> {
        let state = self.state.lock().unwrap();
        if state.fail_auth_listing {
            return Err(server_error("sys/auth", 503, "vault is sealed"));
        }

        Ok(state.auth.clone())
    }

    async fn read(&self, path: &str) -> Result<Option<Secret>, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.reads.push(path.to_string());

        Ok(state.storage.get(path).map(|data| Secret {
            data: data.clone(),
            warnings: Vec::new(),
        }))
    }

    async fn write(
        &self,
        path: &str,
        data: Option<&SecretData>,
    ) -> Result<Option<Secret>, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.writes.push(path.to_string());

        if state.conflicts.contains(path) {
            return Err(server_error(
                path,
                400,
                "existing configuration present, delete them before reconfiguring",
            ));
        }

        state
            .storage
            .insert(path.to_string(), data.cloned().unwrap_or_default());

        Ok(state.write_responses.get(path).map(|data| Secret {
            data: data.clone(),
            warnings: Vec::new(),
        }))
    }

    async fn status(&self, path: &str) -> Result<u16, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.status_probes.push(path.to_string());

        Ok(state.statuses.get(path).copied().unwrap_or(404))
    }
}

/// Parse a YAML list of desired secrets engines.
pub fn engines(yaml: &str) -> Vec<SecretsEngine> {
    serde_yaml::from_str(yaml).expect("test engines yaml")
}

/// Shorthand for a JSON object used as secret data.
pub fn data(json: serde_json::Value) -> SecretData {
    json.as_object().expect("test data is an object").clone()
}
