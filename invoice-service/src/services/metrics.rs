//! Prometheus metrics for invoice-service.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, register_histogram_vec, Counter,
    CounterVec, Histogram, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

/// Renders the HTTP metrics recorded by the service-core middleware.
static HTTP_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Invoices persisted, by initial status.
pub static INVOICES_CREATED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoice_created_total",
        "Total number of invoices created",
        &["status"]
    )
    .expect("Failed to register invoice_created_total")
});

/// Gateway callbacks by outcome (applied, unauthorized, not_found, rejected, error).
pub static CALLBACKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoice_callbacks_total",
        "Total number of gateway callbacks by outcome",
        &["outcome"]
    )
    .expect("Failed to register invoice_callbacks_total")
});

/// Remote invoices created at the gateway whose local row never committed.
pub static ORPHANED_GATEWAY_INVOICES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "invoice_orphaned_gateway_invoices_total",
        "Gateway invoices created without a committed local record"
    )
    .expect("Failed to register invoice_orphaned_gateway_invoices_total")
});

/// Event publish failures (best effort, never fail the request).
pub static EVENT_PUBLISH_FAILURES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "invoice_event_publish_failures_total",
        "Invoice events that could not be published"
    )
    .expect("Failed to register invoice_event_publish_failures_total")
});

/// Gateway create-invoice latency.
pub static GATEWAY_REQUEST_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "invoice_gateway_request_duration_seconds",
        "Gateway create-invoice request duration in seconds",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register invoice_gateway_request_duration_seconds")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "invoice_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register invoice_db_query_duration_seconds")
});

/// Install the HTTP metrics recorder and force the domain metrics.
///
/// Safe to call more than once; only the first call installs the recorder.
pub fn init_metrics() {
    if HTTP_METRICS_HANDLE.get().is_none() {
        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                let _ = HTTP_METRICS_HANDLE.set(handle);
            }
            Err(e) => tracing::warn!(error = %e, "Prometheus recorder already installed"),
        }
    }

    Lazy::force(&INVOICES_CREATED_TOTAL);
    Lazy::force(&CALLBACKS_TOTAL);
    Lazy::force(&ORPHANED_GATEWAY_INVOICES_TOTAL);
    Lazy::force(&EVENT_PUBLISH_FAILURES_TOTAL);
    Lazy::force(&GATEWAY_REQUEST_DURATION);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = HTTP_METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_default();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    if let Ok(domain_metrics) = encoder.encode_to_string(&metric_families) {
        output.push_str(&domain_metrics);
    }

    output
}

pub fn record_callback(outcome: &str) {
    CALLBACKS_TOTAL.with_label_values(&[outcome]).inc();
}
