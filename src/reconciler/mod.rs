//! # Reconciler
//!
//! Orchestrates one configuration pass: normalize the desired state,
//! classify drift against the live server, ensure each mount and its
//! configuration items, then prune unmanaged mounts when enabled.
//!
//! A pass is sequential: resources are processed one at a time in the
//! order supplied, and items within a resource in declared order. The
//! first fatal error aborts the pass; everything applied before it stays
//! applied. Re-invoking the pass is safe: completed work is idempotent
//! on re-application.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::warn;

use crate::client::{ClientError, MountInfo, Secret, SecretData, VaultApi};
use crate::config::{self, PurgeUnmanagedConfig, SecretsEngine};
use crate::error::ReconcileError;

pub mod backoff;

mod drift;
mod items;
mod mounts;
mod rotation;
mod template;

use backoff::ExponentialBackoff;

/// Mutable state scoped to exactly one pass: the rotation cache and the
/// accessor map. Created at pass start, dropped at pass end, never shared
/// across passes. Concurrent passes against independent servers each get
/// their own context.
pub(crate) struct ReconcileContext {
    /// Rotation endpoints already invoked in this pass.
    pub(crate) rotation_cache: HashSet<String>,
    /// Normalized mount path -> accessor id, longest path first.
    pub(crate) accessors: Vec<(String, String)>,
}

impl ReconcileContext {
    fn new(auth_mounts: HashMap<String, MountInfo>) -> Self {
        let mut accessors: Vec<(String, String)> = auth_mounts
            .into_iter()
            .map(|(path, info)| (path.trim_matches('/').to_string(), info.accessor))
            .collect();
        // Longest path first so a token can never be clobbered by a mount
        // whose path is a prefix of the token's target.
        accessors.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(&b.0)));

        Self {
            rotation_cache: HashSet::new(),
            accessors,
        }
    }
}

/// Write a logical path and surface any warnings the server attached to
/// the response.
pub(crate) async fn write_with_warning_check(
    client: &dyn VaultApi,
    path: &str,
    data: Option<&SecretData>,
) -> Result<Option<Secret>, ClientError> {
    let response = client.write(path, data).await?;

    if let Some(secret) = &response {
        for warning in &secret.warnings {
            warn!("warning returned by vault for write to {path}: {warning}");
        }
    }

    Ok(response)
}

/// Reconciles desired resources against the live server configuration.
pub struct Reconciler {
    client: Arc<dyn VaultApi>,
    purge: PurgeUnmanagedConfig,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("purge", &self.purge)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Create a reconciler over `client`, with purging disabled.
    pub fn new(client: Arc<dyn VaultApi>) -> Self {
        Self {
            client,
            purge: PurgeUnmanagedConfig::default(),
        }
    }

    /// Enable or configure pruning of unmanaged resources.
    #[must_use]
    pub fn with_purge(mut self, purge: PurgeUnmanagedConfig) -> Self {
        self.purge = purge;
        self
    }

    /// Run one full configuration pass over the desired secrets engines.
    ///
    /// Returns the first fatal error encountered, if any. The success and
    /// failure counters in [`crate::observability::metrics`] are updated
    /// per item as the pass proceeds.
    pub async fn reconcile_secrets_engines(
        &self,
        mut engines: Vec<SecretsEngine>,
    ) -> Result<(), ReconcileError> {
        let auth_mounts = self
            .client
            .list_auth()
            .await
            .map_err(ReconcileError::AuthEnumeration)?;
        let mut ctx = ReconcileContext::new(auth_mounts);

        config::normalize_paths(&mut engines);

        let existing = drift::existing_engines(self.client.as_ref()).await?;
        let unmanaged = drift::unmanaged_engines(&existing, &engines);

        let mut backoff = ExponentialBackoff::remote_ops();
        for engine in &engines {
            let mount_existed =
                mounts::ensure_mount(self.client.as_ref(), &mut backoff, engine).await?;
            items::apply_engine_configuration(self.client.as_ref(), &mut ctx, engine, mount_existed)
                .await?;
        }

        drift::prune_unmanaged_engines(self.client.as_ref(), &self.purge, &unmanaged).await
    }
}
