//! # Reconciliation Errors
//!
//! Every fatal error kind a pass can surface. All variants carry the
//! resource or path context plus the originating cause; the orchestrator
//! stops at the first one and returns it unchanged. Overwrite conflicts
//! are deliberately absent: they are classified locally in the item
//! reconciler and the pass continues past them.

use thiserror::Error;

use crate::client::ClientError;
use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Listing the existing mounts failed; nothing was mutated.
    #[error("unable to list existing secrets engines")]
    Enumeration(#[source] ClientError),

    /// Listing auth methods (for the accessor map) failed; nothing was
    /// mutated.
    #[error("error while getting list of auth methods for secrets engine configuration")]
    AuthEnumeration(#[source] ClientError),

    /// Mount creation exhausted its retry budget.
    #[error("error mounting {path} into vault after several attempts")]
    Mount {
        path: String,
        #[source]
        source: ClientError,
    },

    /// Mount tuning exhausted its retry budget.
    #[error("error tuning {path} after several attempts")]
    Tune {
        path: String,
        #[source]
        source: ClientError,
    },

    /// The desired-state specification for an engine could not be decoded.
    #[error("invalid configuration for secrets engine {path}")]
    InvalidConfig {
        path: String,
        #[source]
        source: ConfigError,
    },

    /// A configuration item has no resolvable name and its engine
    /// type/config option combination requires one.
    #[error("error finding config item name for secrets engine: {path}/{option}")]
    MissingName { path: String, option: String },

    /// The existence probe for a `create_only`/`rotate` item failed.
    #[error("error checking whether {path} already exists")]
    ExistenceCheck {
        path: String,
        #[source]
        source: ClientError,
    },

    /// A configuration write failed for any reason other than an
    /// overwrite conflict.
    #[error("error configuring {path} in vault")]
    Write {
        path: String,
        #[source]
        source: ClientError,
    },

    /// Persisting a write's result data to its `save_to` path failed.
    #[error("error saving secret in vault to {path}")]
    SaveTo {
        path: String,
        #[source]
        source: ClientError,
    },

    /// Credential rotation was requested for an engine type with no
    /// rotation endpoint.
    #[error("secrets engine type '{engine_type}' doesn't support credential rotation")]
    RotationUnsupported { engine_type: String },

    /// The rotation call itself failed. Not cached; the next pass will
    /// attempt the rotation again.
    #[error("error rotating credentials for '{path}' config in vault")]
    Rotation {
        path: String,
        #[source]
        source: ClientError,
    },

    /// Unmounting an unmanaged engine failed. Engines pruned before the
    /// failure stay pruned.
    #[error("error unmounting {path} secrets engine from vault")]
    Prune {
        path: String,
        #[source]
        source: ClientError,
    },
}
