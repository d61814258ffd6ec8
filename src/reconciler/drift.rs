//! # Drift Classification and Pruning
//!
//! Computes which mounts exist on the server but are absent from the
//! desired state, and removes them when purging is enabled. System mounts
//! are never eligible.

use std::collections::HashSet;

use tracing::info;

use crate::client::VaultApi;
use crate::config::{PurgeUnmanagedConfig, SecretsEngine};
use crate::error::ReconcileError;

/// Mounts owned by the server itself; never prunable.
const RESERVED_MOUNTS: &[&str] = &["sys", "identity", "cubbyhole"];

/// All currently mounted secrets engine paths, trimmed of separators.
pub(crate) async fn existing_engines(
    client: &dyn VaultApi,
) -> Result<HashSet<String>, ReconcileError> {
    let mounts = client
        .list_mounts()
        .await
        .map_err(ReconcileError::Enumeration)?;

    Ok(mounts
        .keys()
        .map(|path| path.trim_matches('/').to_string())
        .collect())
}

/// Existing mounts that are neither reserved nor declared in the desired
/// state.
pub(crate) fn unmanaged_engines(
    existing: &HashSet<String>,
    desired: &[SecretsEngine],
) -> HashSet<String> {
    let mut unmanaged = existing.clone();

    for reserved in RESERVED_MOUNTS {
        unmanaged.remove(*reserved);
    }
    for engine in desired {
        unmanaged.remove(&engine.path);
    }

    unmanaged
}

/// Unmount every unmanaged engine, in path order. A no-op unless purging
/// is enabled and the secrets category is not excluded. An unmount
/// failure aborts the pass; engines already unmounted stay unmounted.
pub(crate) async fn prune_unmanaged_engines(
    client: &dyn VaultApi,
    purge: &PurgeUnmanagedConfig,
    unmanaged: &HashSet<String>,
) -> Result<(), ReconcileError> {
    if unmanaged.is_empty() || !purge.enabled || purge.exclude.secrets {
        return Ok(());
    }

    let mut paths: Vec<&String> = unmanaged.iter().collect();
    paths.sort();

    for path in paths {
        info!("removing secrets engine path {path}");
        client
            .unmount(path)
            .await
            .map_err(|source| ReconcileError::Prune {
                path: path.clone(),
                source,
            })?;
    }

    Ok(())
}
