//! # Vault Config Reconciler
//!
//! Reconciles the configuration of a running Vault server against a
//! declarative desired-state specification, so a deployment can be driven
//! fully config-as-code: apply a specification and the server converges to
//! match it, repeatedly and safely.
//!
//! The crate covers secrets engines; auth methods, policies and audit
//! devices follow the same pattern and can be layered on top of the same
//! [`client::VaultApi`] seam.
//!
//! ## Reconciliation Flow
//!
//! 1. List auth methods to build the accessor map for template resolution
//! 2. Normalize desired engine paths (default to the engine type, trim `/`)
//! 3. Classify drift: existing mounts not present in the desired state
//! 4. For each desired engine: ensure the mount (create or tune, with
//!    bounded exponential backoff), then apply its configuration items,
//!    honoring the `create_only`, `rotate` and `save_to` lifecycle flags
//! 5. Prune unmanaged mounts when purging is enabled
//!
//! The first fatal error aborts the pass; work already applied stays
//! applied. Re-running a pass is safe: existing mounts are tuned instead of
//! re-created and `create_only`/`rotate` items are skipped once their
//! target exists.

pub mod client;
pub mod config;
pub mod error;
pub mod observability;
pub mod reconciler;

pub use client::rest::RestVaultClient;
pub use client::{ClientError, MountConfig, MountInfo, MountInput, Secret, VaultApi};
pub use config::{PurgeExclude, PurgeUnmanagedConfig, SecretsEngine};
pub use error::ReconcileError;
pub use reconciler::Reconciler;
