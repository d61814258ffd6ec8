//! # Vault Client
//!
//! Abstract interface for the remote secret-management server.
//!
//! The reconciler only ever talks to the server through [`VaultApi`], so
//! alternative transports (or an in-memory fake in tests) plug in behind
//! one trait. [`rest`] provides the default HTTP implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod rest;

/// JSON payload of a logical read or write.
pub type SecretData = serde_json::Map<String, serde_json::Value>;

/// Metadata of a mounted backend, as returned by the mount and auth
/// listings. Listing keys are paths with a trailing `/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MountInfo {
    /// Server-assigned unique identifier for this backend instance.
    pub accessor: String,
    #[serde(rename = "type")]
    pub mount_type: String,
    pub description: String,
}

/// Mount-level settings, used both when creating and when tuning a mount.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MountConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_lease_ttl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lease_ttl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_no_cache: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_non_hmac_request_keys: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_non_hmac_response_keys: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passthrough_request_headers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_response_headers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<HashMap<String, String>>,
}

/// Request body for enabling a secrets engine at a path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MountInput {
    #[serde(rename = "type")]
    pub engine_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub plugin_name: String,
    #[serde(default)]
    pub config: MountConfig,
    /// Options are accepted by the server only at creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<HashMap<String, String>>,
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub seal_wrap: bool,
}

/// Result of a logical read or write: the returned data plus any warnings
/// the server attached to the response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secret {
    #[serde(default)]
    pub data: SecretData,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// The eight server primitives the reconciler consumes.
///
/// Paths are given without a leading `/v1/` prefix and without trailing
/// separators; listing results keep the server's trailing-`/` key
/// convention.
#[async_trait]
pub trait VaultApi: Send + Sync {
    /// List currently mounted secrets engines.
    async fn list_mounts(&self) -> Result<HashMap<String, MountInfo>, ClientError>;

    /// Enable a secrets engine at `path`.
    async fn mount(&self, path: &str, input: &MountInput) -> Result<(), ClientError>;

    /// Update mount-level settings of an existing mount in place.
    async fn tune_mount(&self, path: &str, config: &MountConfig) -> Result<(), ClientError>;

    /// Disable the secrets engine mounted at `path`.
    async fn unmount(&self, path: &str) -> Result<(), ClientError>;

    /// List enabled auth methods. Supplies accessor ids for template
    /// resolution.
    async fn list_auth(&self) -> Result<HashMap<String, MountInfo>, ClientError>;

    /// Read a logical path. `None` means the path has no data.
    async fn read(&self, path: &str) -> Result<Option<Secret>, ClientError>;

    /// Write a logical path, returning any data the server responds with.
    async fn write(
        &self,
        path: &str,
        data: Option<&SecretData>,
    ) -> Result<Option<Secret>, ClientError>;

    /// Raw status probe: issue a read and report only the HTTP status
    /// code, without interpreting the body.
    async fn status(&self, path: &str) -> Result<u16, ClientError>;
}

/// Errors surfaced by a [`VaultApi`] implementation.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("error building http client")]
    Build(#[source] reqwest::Error),
    #[error("error sending request to {url}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("error decoding response from {url}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with a non-success status. `errors` carries the
    /// messages from the response body, which is the only failure detail
    /// the server exposes.
    #[error("vault returned status {status} for {path}: {}", .errors.join("; "))]
    Api {
        path: String,
        status: u16,
        errors: Vec<String>,
    },
}
