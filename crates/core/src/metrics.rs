//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Build orchestration (attempts, retries, durations)
//! - Bundler invocations (per transport)
//! - Archive assembly

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Build Metrics
// =============================================================================

/// Builds finished, by terminal result.
pub static BUILDS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("packsmith_builds_total", "Total builds run to a terminal state"),
        &["result"], // "completed", "failed"
    )
    .unwrap()
});

/// Build duration in seconds, by terminal result.
pub static BUILD_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("packsmith_build_duration_seconds", "Duration of builds")
            .buckets(vec![5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 900.0]),
        &["result"],
    )
    .unwrap()
});

/// Requests rejected before any build attempt.
pub static VALIDATION_REJECTIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "packsmith_validation_rejections_total",
        "Total package requests rejected by validation",
    )
    .unwrap()
});

/// Safe-URL proxy fallback retries.
pub static FALLBACK_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "packsmith_fallback_retries_total",
        "Total builds retried through the safe-URL proxy",
    )
    .unwrap()
});

// =============================================================================
// Bundler Metrics
// =============================================================================

/// Bundler invocations, by transport and result.
pub static BUNDLER_INVOCATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "packsmith_bundler_invocations_total",
            "Total native bundler invocations",
        ),
        &["transport", "result"], // transport: "primary", "fallback"; result: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Archive Metrics
// =============================================================================

/// Archives assembled, by result.
pub static ARCHIVES_ASSEMBLED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "packsmith_archives_assembled_total",
            "Total downloadable archives assembled",
        ),
        &["result"], // "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(BUILDS_TOTAL.clone()),
        Box::new(BUILD_DURATION.clone()),
        Box::new(VALIDATION_REJECTIONS.clone()),
        Box::new(FALLBACK_RETRIES.clone()),
        Box::new(BUNDLER_INVOCATIONS.clone()),
        Box::new(ARCHIVES_ASSEMBLED.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register_cleanly() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
    }
}
