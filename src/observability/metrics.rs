//! # Metrics
//!
//! Prometheus counters for monitoring reconciliation outcomes.
//!
//! ## Metrics Exposed
//!
//! - `vault_reconciler_items_applied_total` - Configuration items applied successfully
//! - `vault_reconciler_item_failures_total` - Configuration items that failed to apply
//!
//! The counters live on a crate registry so a host can gather and export
//! them after each pass; this crate never serves them itself.

use prometheus::{IntCounter, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static ITEMS_APPLIED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "vault_reconciler_items_applied_total",
        "Total number of configuration items applied successfully",
    )
    .expect("Failed to create ITEMS_APPLIED_TOTAL metric - this should never happen")
});

static ITEM_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "vault_reconciler_item_failures_total",
        "Total number of configuration items that failed to apply",
    )
    .expect("Failed to create ITEM_FAILURES_TOTAL metric - this should never happen")
});

/// Register the counters on the crate registry. Call once at startup if
/// the host gathers from [`gather`].
pub fn register_metrics() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(ITEMS_APPLIED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ITEM_FAILURES_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_items_applied() {
    ITEMS_APPLIED_TOTAL.inc();
}

pub fn increment_item_failures() {
    ITEM_FAILURES_TOTAL.inc();
}

/// Current value of the applied-items counter.
pub fn items_applied() -> u64 {
    ITEMS_APPLIED_TOTAL.get()
}

/// Current value of the failed-items counter.
pub fn item_failures() -> u64 {
    ITEM_FAILURES_TOTAL.get()
}

/// Snapshot the crate registry for export.
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_monotonic() {
        let applied_before = items_applied();
        let failures_before = item_failures();

        increment_items_applied();
        increment_item_failures();

        assert_eq!(items_applied(), applied_before + 1);
        assert_eq!(item_failures(), failures_before + 1);
    }

    #[test]
    fn test_duplicate_registration_is_an_error() {
        // A second registration of the same collector is an AlreadyReg
        // error, not a panic.
        let _ = register_metrics();

        assert!(register_metrics().is_err());
    }
}
