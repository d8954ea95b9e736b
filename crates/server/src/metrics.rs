//! Prometheus metrics for observability.
//!
//! HTTP request metrics are recorded by middleware. Cache and watch-state
//! sizes are gauges refreshed from application state on every scrape.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use regex_lite::Regex;

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "marquee_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("marquee_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "marquee_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// State Metrics (collected dynamically)
// =============================================================================

/// Entries held by the response cache, fresh or stale.
pub static CACHE_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "marquee_cache_entries",
        "Number of entries in the response cache",
    )
    .unwrap()
});

/// Watch-state list sizes.
pub static WATCH_ENTRIES: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("marquee_watch_entries", "Current watch-state entries by list"),
        &["list"],
    )
    .unwrap()
});

/// Time until the outbound throttle opens its next slot.
pub static THROTTLE_NEXT_SLOT_MS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "marquee_throttle_next_slot_milliseconds",
        "Milliseconds until the throttle dispatches its next request",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // State
    registry.register(Box::new(CACHE_ENTRIES.clone())).unwrap();
    registry.register(Box::new(WATCH_ENTRIES.clone())).unwrap();
    registry
        .register(Box::new(THROTTLE_NEXT_SLOT_MS.clone()))
        .unwrap();

    // Core metrics (throttle, gateway, cache, watch state)
    for metric in marquee_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Refresh gauges from current application state before a scrape.
pub fn collect_dynamic_metrics(state: &AppState) {
    CACHE_ENTRIES.set(state.catalog().cache().len() as i64);

    let watch = state.watch();
    WATCH_ENTRIES
        .with_label_values(&["history"])
        .set(watch.history().len() as i64);
    WATCH_ENTRIES
        .with_label_values(&["continue_watching"])
        .set(watch.continue_watching().len() as i64);
    WATCH_ENTRIES
        .with_label_values(&["favorites"])
        .set(watch.favorites().len() as i64);
    WATCH_ENTRIES
        .with_label_values(&["recent_searches"])
        .set(state.searches().list().len() as i64);

    if let Some(status) = state.throttle_status() {
        THROTTLE_NEXT_SLOT_MS.set(status.next_slot_in_ms.unwrap_or(0) as i64);
    }
}

static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());
static RECENT_SEARCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*/searches/recent)/[^/]+$").unwrap());

/// Normalize a path for metric labels (replace IDs and free text with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = RECENT_SEARCH.replace(path, "$1/{query}");
    // Second pass catches adjacent numeric segments such as "/12/34".
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_numeric() {
        let path = "/api/v1/catalog/movie/603";
        assert_eq!(normalize_path(path), "/api/v1/catalog/movie/{id}");
    }

    #[test]
    fn test_normalize_path_numeric_middle() {
        let path = "/api/v1/catalog/tv/1399/season/2/episode/3";
        assert_eq!(
            normalize_path(path),
            "/api/v1/catalog/tv/{id}/season/{id}/episode/{id}"
        );
    }

    #[test]
    fn test_normalize_path_recent_search() {
        let path = "/api/v1/searches/recent/the%20matrix";
        assert_eq!(normalize_path(path), "/api/v1/searches/recent/{query}");
        assert_eq!(
            normalize_path("/api/v1/searches/recent"),
            "/api/v1/searches/recent"
        );
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("marquee_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_state_metrics() {
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        HTTP_REQUESTS_IN_FLIGHT.set(0);
        CACHE_ENTRIES.set(0);
        WATCH_ENTRIES.with_label_values(&["history"]).set(0);
        marquee_core::metrics::CACHE_LOOKUPS
            .with_label_values(&["list", "hit"])
            .inc();

        let output = encode_metrics();

        assert!(output.contains("marquee_http_request_duration_seconds"));
        assert!(output.contains("marquee_http_requests_in_flight"));
        assert!(output.contains("marquee_cache_entries"));
        assert!(output.contains("marquee_watch_entries"));
        assert!(output.contains("marquee_cache_lookups_total"));
    }
}
