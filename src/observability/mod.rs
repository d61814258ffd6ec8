//! # Observability
//!
//! Logging initialization and prometheus metrics.
//!
//! - `metrics`: the two application counters exposed for external scraping

pub mod metrics;

use tracing_subscriber::EnvFilter;

/// Initialize a plain `tracing` subscriber honoring `RUST_LOG`.
///
/// Convenience for hosts and test binaries that have no subscriber of
/// their own; calling it more than once is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
