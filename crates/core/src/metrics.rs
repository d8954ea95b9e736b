//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Request throttle (dispatch wait)
//! - Catalog gateway (outbound requests, latency)
//! - Response cache (lookups, retries)
//! - Watch-state persistence

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Request Throttle
// =============================================================================

/// Time a task spent waiting for its dispatch slot.
pub static THROTTLE_WAIT: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "marquee_throttle_wait_seconds",
            "Time spent waiting for a dispatch slot",
        )
        .buckets(vec![0.0, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    )
    .unwrap()
});

/// Tasks dispatched through the throttle.
pub static THROTTLE_DISPATCHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "marquee_throttle_dispatched_total",
        "Total tasks dispatched by the request throttle",
    )
    .unwrap()
});

// =============================================================================
// Catalog Gateway
// =============================================================================

/// Outbound catalog requests by endpoint class and outcome.
pub static GATEWAY_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "marquee_gateway_requests_total",
            "Total outbound catalog API requests",
        ),
        &["endpoint", "outcome"], // outcome: "success", "auth", "not_found", "rate_limited", "server", "network", "validation", "decode"
    )
    .unwrap()
});

/// Outbound catalog request duration, excluding throttle wait.
pub static GATEWAY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "marquee_gateway_request_duration_seconds",
            "Duration of outbound catalog API requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["endpoint"],
    )
    .unwrap()
});

// =============================================================================
// Response Cache
// =============================================================================

/// Cache lookups by resource class and result.
pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("marquee_cache_lookups_total", "Total response cache lookups"),
        &["class", "result"], // result: "hit", "miss", "stale"
    )
    .unwrap()
});

/// Retries issued after a transient gateway failure.
pub static CACHE_RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "marquee_cache_retries_total",
            "Total retries of failed catalog fetches",
        ),
        &["class"],
    )
    .unwrap()
});

// =============================================================================
// Watch State
// =============================================================================

/// Watch-state mutations by operation.
pub static WATCH_MUTATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "marquee_watch_mutations_total",
            "Total watch-state mutations",
        ),
        &["operation"],
    )
    .unwrap()
});

/// Failed writes to durable storage.
pub static PERSIST_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "marquee_persist_failures_total",
            "Total failed writes to local storage",
        ),
        &["key"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Throttle
        Box::new(THROTTLE_WAIT.clone()),
        Box::new(THROTTLE_DISPATCHED.clone()),
        // Gateway
        Box::new(GATEWAY_REQUESTS.clone()),
        Box::new(GATEWAY_DURATION.clone()),
        // Cache
        Box::new(CACHE_LOOKUPS.clone()),
        Box::new(CACHE_RETRIES.clone()),
        // Watch state
        Box::new(WATCH_MUTATIONS.clone()),
        Box::new(PERSIST_FAILURES.clone()),
    ]
}
