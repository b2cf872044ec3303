use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all cone search metrics
const PREFIX: &str = "conesearch";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds, up to the response head"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Queries
    pub static ref QUERIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_queries_total"), "Catalog queries by outcome"),
        &["catalog", "outcome"]
    ).expect("Failed to create queries_total metric");

    pub static ref QUERY_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_query_duration_seconds"),
            "Catalog query duration in seconds, including streaming"
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
        &["catalog"]
    ).expect("Failed to create query_duration_seconds metric");

    pub static ref ROWS_STREAMED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(format!("{PREFIX}_rows_streamed_total"), "Result rows encoded into responses"),
        &["catalog"]
    ).expect("Failed to create rows_streamed_total metric");

    // Errors
    pub static ref ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_errors_total"), "Error responses by kind"),
        &["kind"]
    ).expect("Failed to create errors_total metric");

    pub static ref CATALOGS_CONFIGURED: Gauge = Gauge::new(
        format!("{PREFIX}_catalogs_configured"),
        "Number of catalogs loaded at startup"
    ).expect("Failed to create catalogs_configured metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Already-registered errors are ignored so tests can call this repeatedly
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(QUERIES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(QUERY_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(ROWS_STREAMED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CATALOGS_CONFIGURED.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn set_catalogs_configured(count: usize) {
    CATALOGS_CONFIGURED.set(count as f64);
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a finished catalog query.
///
/// `outcome` is one of `ok`, `error`, `cancelled` or `timeout`.
pub fn record_query(catalog: &str, outcome: &str, rows: u64, duration: Duration) {
    QUERIES_TOTAL.with_label_values(&[catalog, outcome]).inc();
    QUERY_DURATION_SECONDS
        .with_label_values(&[catalog])
        .observe(duration.as_secs_f64());
    ROWS_STREAMED_TOTAL
        .with_label_values(&[catalog])
        .inc_by(rows);
}

pub fn record_error(kind: &str) {
    ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

/// Maps a request path onto a bounded label set.
///
/// Catalog ids come from the URL, so they are folded into a single label to
/// keep the metric cardinality under control.
pub fn categorize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/conesearch" => "/conesearch",
        "/metrics" => "/metrics",
        p if p.len() > 1 && !p[1..].contains('/') => "/{catalog}",
        _ => "other",
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
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
