//! # Mount Reconciliation
//!
//! Ensures a desired secrets engine is mounted with its declared
//! settings: absent mounts are created, existing mounts are tuned in
//! place. Both operations share the bounded-backoff retry policy.

use tracing::{debug, info};

use crate::client::{MountInput, VaultApi};
use crate::config::SecretsEngine;
use crate::error::ReconcileError;

use super::backoff::{retry_with_backoff, ExponentialBackoff};

/// Ensure `engine` is mounted. Returns whether the mount pre-existed;
/// downstream lifecycle checks are skipped for freshly created mounts,
/// which cannot contain prior sub-resources.
pub(crate) async fn ensure_mount(
    client: &dyn VaultApi,
    backoff: &mut ExponentialBackoff,
    engine: &SecretsEngine,
) -> Result<bool, ReconcileError> {
    let mounts = client
        .list_mounts()
        .await
        .map_err(ReconcileError::Enumeration)?;
    debug!("already existing mounts: {:?}", mounts.keys());

    let mount_existed = mounts.contains_key(&format!("{}/", engine.path));

    let config = engine
        .mount_config()
        .map_err(|source| ReconcileError::InvalidConfig {
            path: engine.path.clone(),
            source,
        })?;

    if mount_existed {
        info!("tuning already existing secrets engine {}/", engine.path);

        // Options are only accepted at creation time; the tune request
        // carries everything else.
        let mut tune_config = config;
        tune_config.options = None;

        retry_with_backoff(backoff, &format!("tuning {}", engine.path), || {
            client.tune_mount(&engine.path, &tune_config)
        })
        .await
        .map_err(|source| ReconcileError::Tune {
            path: engine.path.clone(),
            source,
        })?;
    } else {
        let input = MountInput {
            engine_type: engine.engine_type.clone(),
            description: engine.description.clone(),
            plugin_name: engine.plugin_name.clone(),
            options: config.options.clone(),
            config,
            local: engine.local,
            seal_wrap: engine.seal_wrap,
        };

        info!(
            "adding secrets engine {} ({})",
            engine.path, engine.engine_type
        );
        debug!("secrets engine input {input:?}");

        retry_with_backoff(backoff, &format!("mounting {}", engine.path), || {
            client.mount(&engine.path, &input)
        })
        .await
        .map_err(|source| ReconcileError::Mount {
            path: engine.path.clone(),
            source,
        })?;
    }

    Ok(mount_existed)
}
