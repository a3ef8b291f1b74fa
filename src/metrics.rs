// Prometheus metrics for scheduler and admission monitoring
//
// Counters and gauges for:
// - Queue activity (enqueued, completed, failed, retried, cancelled)
// - Admission decisions (allowed, denied by limit dimension)
// - Execution mode resolutions

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

lazy_static! {
    pub static ref REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    // Queue metrics
    pub static ref REQUESTS_ENQUEUED_TOTAL: IntCounter = IntCounter::new(
        "proofgate_requests_enqueued_total",
        "Total number of requests admitted into the queue"
    ).expect("Failed to create enqueued requests metric");

    pub static ref REQUESTS_COMPLETED_TOTAL: IntCounter = IntCounter::new(
        "proofgate_requests_completed_total",
        "Total number of requests that settled successfully"
    ).expect("Failed to create completed requests metric");

    pub static ref REQUESTS_FAILED_TOTAL: IntCounter = IntCounter::new(
        "proofgate_requests_failed_total",
        "Total number of requests that settled with a terminal failure"
    ).expect("Failed to create failed requests metric");

    pub static ref REQUESTS_RETRIED_TOTAL: IntCounter = IntCounter::new(
        "proofgate_requests_retried_total",
        "Total number of critical-request retry attempts"
    ).expect("Failed to create retried requests metric");

    pub static ref REQUESTS_CANCELLED_TOTAL: IntCounter = IntCounter::new(
        "proofgate_requests_cancelled_total",
        "Total number of queued requests cancelled before starting"
    ).expect("Failed to create cancelled requests metric");

    pub static ref ACTIVE_OPERATIONS: IntGauge = IntGauge::new(
        "proofgate_active_operations",
        "Number of operations currently executing"
    ).expect("Failed to create active operations metric");

    // Admission metrics
    pub static ref ADMISSIONS_ALLOWED_TOTAL: IntCounter = IntCounter::new(
        "proofgate_admissions_allowed_total",
        "Total number of rate-limit checks that allowed the request"
    ).expect("Failed to create admissions allowed metric");

    pub static ref ADMISSIONS_DENIED_TOTAL: CounterVec = CounterVec::new(
        prometheus::Opts::new(
            "proofgate_admissions_denied_total",
            "Total number of rate-limit denials by limit dimension"
        ),
        &["limit_type"]
    ).expect("Failed to create admissions denied metric");

    // Router metrics
    pub static ref MODE_RESOLUTIONS_TOTAL: CounterVec = CounterVec::new(
        prometheus::Opts::new(
            "proofgate_mode_resolutions_total",
            "Total number of execution-mode resolutions by resolved mode"
        ),
        &["mode"]
    ).expect("Failed to create mode resolutions metric");
}

/// Register all metrics with the global registry
///
/// Safe to call more than once; duplicate registrations are ignored.
pub fn init_metrics() {
    let _ = REGISTRY.register(Box::new(REQUESTS_ENQUEUED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(REQUESTS_COMPLETED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(REQUESTS_FAILED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(REQUESTS_RETRIED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(REQUESTS_CANCELLED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ACTIVE_OPERATIONS.clone()));
    let _ = REGISTRY.register(Box::new(ADMISSIONS_ALLOWED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ADMISSIONS_DENIED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(MODE_RESOLUTIONS_TOTAL.clone()));
}

/// Gather all registered metrics in the Prometheus text exposition format
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
