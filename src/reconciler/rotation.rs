//! # Credential Rotation
//!
//! Root-credential rotation for engines whose credentials are rotated
//! out-of-band. Each rotation endpoint is invoked at most once per pass:
//! the context caches endpoints already rotated, and an entry is only
//! added on success so a failed rotation is attempted again by the next
//! pass.

use tracing::info;

use crate::client::VaultApi;
use crate::error::ReconcileError;

use super::{write_with_warning_check, ReconcileContext};

/// Rotation endpoint for an engine type, or `RotationUnsupported` when
/// the type has none.
pub(crate) fn rotation_endpoint(
    engine_type: &str,
    path: &str,
    name: &str,
) -> Result<String, ReconcileError> {
    match engine_type {
        "aws" => Ok(format!("{path}/config/rotate-root")),
        "database" => Ok(format!("{path}/rotate-root/{name}")),
        "gcp" => Ok(format!("{path}/{name}/rotate")),
        _ => Err(ReconcileError::RotationUnsupported {
            engine_type: engine_type.to_string(),
        }),
    }
}

/// Rotate the credentials behind `config_path`, at most once per pass.
pub(crate) async fn rotate_credentials(
    client: &dyn VaultApi,
    ctx: &mut ReconcileContext,
    engine_type: &str,
    path: &str,
    name: &str,
    config_path: &str,
) -> Result<(), ReconcileError> {
    let rotate_path = rotation_endpoint(engine_type, path, name)?;

    if ctx.rotation_cache.contains(&rotate_path) {
        info!("credentials were rotated previously for {rotate_path}");
        return Ok(());
    }

    info!("doing credential rotation at {rotate_path}");

    write_with_warning_check(client, &rotate_path, None)
        .await
        .map_err(|source| ReconcileError::Rotation {
            path: config_path.to_string(),
            source,
        })?;

    info!("credentials got rotated at {rotate_path}");
    ctx.rotation_cache.insert(rotate_path);

    Ok(())
}
