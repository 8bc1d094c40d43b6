//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Polling Metrics
    pub static ref POLLS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("featherlink_polls_total", "Total number of timeline polls"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref DELIVERIES_TOTAL: IntCounter = IntCounter::new(
        "featherlink_deliveries_total",
        "Total number of feed deltas delivered to subscribers"
    ).expect("metric can be created");
    pub static ref DELIVERED_ENTRIES_TOTAL: IntCounter = IntCounter::new(
        "featherlink_delivered_entries_total",
        "Total number of entries contained in delivered feed deltas"
    ).expect("metric can be created");
    pub static ref ACTIVE_SUBSCRIPTIONS: IntGauge = IntGauge::new(
        "featherlink_active_subscriptions",
        "Current number of polled topics"
    ).expect("metric can be created");

    // Storage Metrics
    pub static ref KEYS_GENERATED_TOTAL: IntCounter = IntCounter::new(
        "featherlink_keys_generated_total",
        "Total number of signing keys generated"
    ).expect("metric can be created");
    pub static ref LEASE_CHANGES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("featherlink_lease_changes_total", "Total number of persisted lease changes"),
        &["kind"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("featherlink_errors_total", "Total number of errors returned to clients"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(POLLS_TOTAL.clone()))
            .expect("POLLS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(DELIVERIES_TOTAL.clone()))
            .expect("DELIVERIES_TOTAL can be registered");
        REGISTRY
            .register(Box::new(DELIVERED_ENTRIES_TOTAL.clone()))
            .expect("DELIVERED_ENTRIES_TOTAL can be registered");
        REGISTRY
            .register(Box::new(ACTIVE_SUBSCRIPTIONS.clone()))
            .expect("ACTIVE_SUBSCRIPTIONS can be registered");
        REGISTRY
            .register(Box::new(KEYS_GENERATED_TOTAL.clone()))
            .expect("KEYS_GENERATED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(LEASE_CHANGES_TOTAL.clone()))
            .expect("LEASE_CHANGES_TOTAL can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}
