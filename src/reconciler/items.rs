//! # Configuration Item Reconciliation
//!
//! Applies the per-item configuration declared under a mount: resolves
//! accessor templates, computes each item's target path, honors the
//! `create_only`/`rotate`/`save_to` lifecycle flags, and triggers
//! credential rotation for the engine/option pairs whose root credentials
//! are rotated out-of-band.
//!
//! Overwrite conflicts (the server refusing to reconfigure an
//! irreversibly-configured resource) are the one non-fatal failure: the
//! item is logged and skipped, and the pass continues.

use tracing::info;

use crate::client::{ClientError, SecretData, VaultApi};
use crate::config::{self, ConfigItem, SecretsEngine};
use crate::error::ReconcileError;
use crate::observability::metrics;

use super::rotation::rotate_credentials;
use super::template::resolve_accessor_templates;
use super::{write_with_warning_check, ReconcileContext};

/// Engine types whose `config` option is written without a name segment
/// in the path.
const ENGINES_WITHOUT_NAME_CONFIG: &[&str] = &["ad", "alicloud", "azure", "gcp", "gcpkms", "kv"];

/// Engine/option pairs whose root credentials are rotatable out-of-band,
/// so re-applying the static configuration would push stale credentials.
const ROTATABLE_ROOT_CONFIGS: &[(&str, &str)] = &[("database", "config"), ("aws", "config/root")];

/// The generate-style option whose existence is probed with a raw status
/// check instead of a data read.
const GENERATE_OPTION: &str = "root/generate";

enum ItemOutcome {
    Applied,
    Skipped,
    Conflict,
}

/// Whether this engine type/config option pair is exempt from requiring a
/// `name` field on its items.
fn config_needs_no_name(engine_type: &str, config_option: &str) -> bool {
    if config_option == "config" {
        return ENGINES_WITHOUT_NAME_CONFIG.contains(&engine_type);
    }
    if engine_type == "aws" && config_option == "config/root" {
        return true;
    }
    if engine_type == "transit" && config_option == "cache-config" {
        return true;
    }

    false
}

/// The server rejects overwriting some irreversibly-configured resources
/// with this message text; no structured error code is exposed for it, so
/// the match is textual and isolated here.
fn is_overwrite_prohibited(err: &ClientError) -> bool {
    match err {
        ClientError::Api { errors, .. } => errors
            .iter()
            .any(|e| e.contains("delete them before reconfiguring")),
        _ => false,
    }
}

/// Scalar rendering of an item's `name` field.
fn name_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Versioned payload for `save_to` writes: the result data nested under
/// `data`, written with a check-and-set of 0.
fn versioned_payload(data: SecretData) -> SecretData {
    let mut payload = SecretData::new();
    payload.insert("data".to_string(), serde_json::Value::Object(data));
    payload.insert(
        "options".to_string(),
        serde_json::json!({ "cas": 0 }),
    );

    payload
}

/// Apply every configuration item declared under `engine`, in declared
/// order. Counts each item's outcome on the application counters.
pub(crate) async fn apply_engine_configuration(
    client: &dyn VaultApi,
    ctx: &mut ReconcileContext,
    engine: &SecretsEngine,
    mount_existed: bool,
) -> Result<(), ReconcileError> {
    for (option_key, block) in &engine.configuration {
        let config_option = config::yaml_key_to_string(option_key);

        let items =
            config::decode_items(block).map_err(|source| ReconcileError::InvalidConfig {
                path: engine.path.clone(),
                source,
            })?;

        for item in items {
            let outcome =
                apply_config_item(client, ctx, engine, mount_existed, &config_option, item).await;

            match outcome {
                Ok(ItemOutcome::Applied | ItemOutcome::Skipped) => {
                    metrics::increment_items_applied();
                }
                Ok(ItemOutcome::Conflict) => {
                    metrics::increment_item_failures();
                }
                Err(err) => {
                    metrics::increment_item_failures();
                    return Err(err);
                }
            }
        }
    }

    Ok(())
}

async fn apply_config_item(
    client: &dyn VaultApi,
    ctx: &mut ReconcileContext,
    engine: &SecretsEngine,
    mount_existed: bool,
    config_option: &str,
    mut item: ConfigItem,
) -> Result<ItemOutcome, ReconcileError> {
    resolve_accessor_templates(&mut item.data, &ctx.accessors);

    let name = item.data.get("name").and_then(name_value);
    if name.is_none() && !config_needs_no_name(&engine.engine_type, config_option) {
        return Err(ReconcileError::MissingName {
            path: engine.path.clone(),
            option: config_option.to_string(),
        });
    }

    let config_path = match &name {
        Some(name) => format!("{}/{}/{}", engine.path, config_option, name),
        None => format!("{}/{}", engine.path, config_option),
    };

    // A freshly created mount cannot contain prior sub-resources, so the
    // existence probe only runs when the mount pre-existed.
    let mut should_update = true;
    if (item.create_only || item.rotate) && mount_existed {
        let exists = probe_existence(client, engine, config_option, &config_path).await?;

        if exists {
            let reason = if item.create_only {
                "create_only"
            } else {
                "rotate"
            };
            info!(
                "secret at config path {config_path} already exists, \
                 {reason} was set so this will not be updated"
            );
            should_update = false;
        }
    }

    let mut outcome = ItemOutcome::Skipped;
    if should_update {
        match write_with_warning_check(client, &config_path, Some(&item.data)).await {
            Ok(response) => {
                if let Some(save_to) = &item.save_to {
                    let data = response.map(|secret| secret.data).unwrap_or_default();
                    write_with_warning_check(client, save_to, Some(&versioned_payload(data)))
                        .await
                        .map_err(|source| ReconcileError::SaveTo {
                            path: save_to.clone(),
                            source,
                        })?;
                }
                outcome = ItemOutcome::Applied;
            }
            Err(err) if is_overwrite_prohibited(&err) => {
                info!("can't reconfigure {config_path}, please delete it manually");
                return Ok(ItemOutcome::Conflict);
            }
            Err(source) => {
                return Err(ReconcileError::Write {
                    path: config_path,
                    source,
                });
            }
        }
    }

    if item.rotate
        && mount_existed
        && ROTATABLE_ROOT_CONFIGS.contains(&(engine.engine_type.as_str(), config_option))
    {
        rotate_credentials(
            client,
            ctx,
            &engine.engine_type,
            &engine.path,
            name.as_deref().unwrap_or(""),
            &config_path,
        )
        .await?;
    }

    Ok(outcome)
}

/// Decide whether the sub-resource at `config_path` already exists. The
/// generate-style option cannot be read back as data, so it is probed
/// with a raw status check of the engine's CA endpoint instead.
async fn probe_existence(
    client: &dyn VaultApi,
    engine: &SecretsEngine,
    config_option: &str,
    config_path: &str,
) -> Result<bool, ReconcileError> {
    if config_option == GENERATE_OPTION {
        let ca_path = format!("{}/ca", engine.path);
        let status = client
            .status(&ca_path)
            .await
            .map_err(|source| ReconcileError::ExistenceCheck {
                path: ca_path,
                source,
            })?;

        return Ok(status == 200);
    }

    match client.read(config_path).await {
        Ok(Some(secret)) => Ok(!secret.data.is_empty()),
        Ok(None) => Ok(false),
        Err(source) => Err(ReconcileError::ExistenceCheck {
            path: config_path.to_string(),
            source,
        }),
    }
}
