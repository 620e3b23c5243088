//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Conversions (outcomes, durations by encoding mode)
//! - Filename templates (resolved vs fallback names)

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use tracing::warn;

/// Registry holding every core metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Conversions total by outcome.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vidbatch_conversions_total", "Total file conversions"),
        &["status"], // "succeeded", "failed", "cancelled"
    )
    .unwrap()
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "vidbatch_conversion_duration_seconds",
            "Duration of a single file conversion",
        )
        .buckets(vec![
            1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0,
        ]),
        &["mode"], // "crf", "two_pass"
    )
    .unwrap()
});

// =============================================================================
// Template Metrics
// =============================================================================

/// Filename template resolutions by outcome.
pub static TEMPLATE_RESOLUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vidbatch_template_resolutions_total",
            "Total filename template resolutions",
        ),
        &["outcome"], // "resolved", "fallback"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(TEMPLATE_RESOLUTIONS.clone()),
    ]
}

fn register_metrics(registry: &Registry) {
    for metric in all_metrics() {
        if let Err(e) = registry.register(metric) {
            warn!(error = %e, "Failed to register metric");
        }
    }
}

/// Encode all registered metrics in the Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_are_registered_and_encoded() {
        CONVERSIONS_TOTAL.with_label_values(&["succeeded"]).inc();
        TEMPLATE_RESOLUTIONS.with_label_values(&["fallback"]).inc();
        CONVERSION_DURATION.with_label_values(&["crf"]).observe(2.0);

        let text = encode_metrics();
        assert!(text.contains("vidbatch_conversions_total"));
        assert!(text.contains("vidbatch_template_resolutions_total"));
        assert!(text.contains("vidbatch_conversion_duration_seconds"));
    }
}
