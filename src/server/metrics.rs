use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all storefront metrics
const PREFIX: &str = "storefront";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Download Metrics
    pub static ref DOWNLOAD_LINKS_ISSUED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_download_links_issued_total"), "Download links issued"),
        &["format"]
    ).expect("Failed to create download_links_issued_total metric");

    pub static ref DOWNLOAD_REDEMPTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_download_redemptions_total"), "Download redemptions by outcome"),
        &["outcome"]
    ).expect("Failed to create download_redemptions_total metric");

    // Notification Metrics
    pub static ref EMAIL_DELIVERIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_email_deliveries_total"), "Email delivery attempts by result"),
        &["result"]
    ).expect("Failed to create email_deliveries_total metric");

    // Payment Metrics
    pub static ref PAYMENT_CLASSIFICATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_payment_classifications_total"),
            "Payment statuses classified by bucket and source"
        ),
        &["bucket", "source"]
    ).expect("Failed to create payment_classifications_total metric");

    pub static ref GATEWAY_CALLS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_gateway_calls_total"), "Payment gateway calls by result"),
        &["operation", "result"]
    ).expect("Failed to create gateway_calls_total metric");

    // Error Metrics
    pub static ref ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_errors_total"), "Total errors by type"),
        &["error_type"]
    ).expect("Failed to create errors_total metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(DOWNLOAD_LINKS_ISSUED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(DOWNLOAD_REDEMPTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(EMAIL_DELIVERIES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PAYMENT_CLASSIFICATIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(GATEWAY_CALLS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Collapses path parameters so tokens and emails don't explode label cardinality.
pub fn categorize_endpoint(path: &str) -> &'static str {
    if path.contains("/downloads/download/") {
        "downloads/download"
    } else if path.contains("/downloads/history/") {
        "downloads/history"
    } else if path.ends_with("/downloads/create") {
        "downloads/create"
    } else if path.ends_with("/downloads/resend") {
        "downloads/resend"
    } else if path.ends_with("/downloads/stats") {
        "downloads/stats"
    } else if path.starts_with("/payment/") {
        "payment"
    } else if path == "/" {
        "home"
    } else {
        "other"
    }
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

pub fn record_link_issued(format: &str) {
    DOWNLOAD_LINKS_ISSUED_TOTAL
        .with_label_values(&[format])
        .inc();
}

/// Outcome is "first", "repeat" or an error kind.
pub fn record_redemption(outcome: &str) {
    DOWNLOAD_REDEMPTIONS_TOTAL
        .with_label_values(&[outcome])
        .inc();
}

pub fn record_email_delivery(result: &str) {
    EMAIL_DELIVERIES_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_payment_classification(bucket: &str, source: &str) {
    PAYMENT_CLASSIFICATIONS_TOTAL
        .with_label_values(&[bucket, source])
        .inc();
}

pub fn record_gateway_call(operation: &str, result: &str) {
    GATEWAY_CALLS_TOTAL
        .with_label_values(&[operation, result])
        .inc();
}

/// Record an error
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    // RSS is reported in kB
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        if let Ok(kb) = kb_str.parse::<f64>() {
                            PROCESS_MEMORY_BYTES.set(kb * 1024.0);
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
