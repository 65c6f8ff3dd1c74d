use axum::{body::Body, http::Request, http::StatusCode, response::Response};
use lazy_static::lazy_static;
use prometheus::{self, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use tracing::Span;

lazy_static! {
    // Registry for holding metric state
    pub static ref REGISTRY: Registry = Registry::new();
    // Simple request counter
    pub static ref INCOMING_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("incoming_requests", "The number of HTTP requests received"),
        &["http_method"]
    ).unwrap();
    // Request counter by status code
    pub static ref RESPONSE_CODE_COLLECTOR: IntCounterVec = IntCounterVec::new(
        Opts::new("outgoing_response", "The number of responses sent."),
        &["status_code"]
    ).unwrap();
    // Request histogram by response time
    pub static ref RESPONSE_TIME_COLLECTOR: HistogramVec = HistogramVec::new(
        HistogramOpts{
            common_opts: Opts::new("response_time", "The time taken to respond to each request"),
            buckets: prometheus::DEFAULT_BUCKETS.to_vec(),
        },
        &[],
    ).unwrap();
    // Extraction histogram by operation, excluding time spent waiting for the dataset
    pub static ref OPERATION_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts{
            common_opts: Opts::new("operation_duration", "The time taken to execute each data extraction"),
            buckets: prometheus::DEFAULT_BUCKETS.to_vec(),
        },
        &["operation"],
    ).unwrap();
    // Failed extractions by operation and error kind
    pub static ref OPERATION_ERRORS: IntCounterVec = IntCounterVec::new(
        Opts::new("operation_errors", "The number of failed data extractions"),
        &["operation", "kind"]
    ).unwrap();
}

pub fn register_metrics() {
    REGISTRY
        .register(Box::new(INCOMING_REQUESTS.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(RESPONSE_CODE_COLLECTOR.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(RESPONSE_TIME_COLLECTOR.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(OPERATION_DURATION.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(OPERATION_ERRORS.clone()))
        .unwrap();
}

/// Render all registered metrics in the Prometheus text format.
pub async fn metrics_handler() -> Result<String, StatusCode> {
    let encoder = prometheus::TextEncoder::new();
    encoder
        .encode_to_string(&REGISTRY.gather())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Increments the prometheus counter on all incoming requests, labelled by http method
pub fn request_counter(request: &Request<Body>, _span: &Span) {
    INCOMING_REQUESTS
        .with_label_values(&[&request.method().to_string().to_ascii_uppercase()])
        .inc();
}

/// Increment the prometheus counter on all outgoing responses, labelled by status code
pub fn record_response_metrics<B>(
    response: &Response<B>,
    latency: std::time::Duration,
    _span: &Span,
) {
    RESPONSE_CODE_COLLECTOR
        .with_label_values(&[response.status().as_str()])
        .inc();

    RESPONSE_TIME_COLLECTOR
        .with_label_values(&[])
        .observe(latency.as_secs_f64());
}

/// Record the duration of one data extraction.
pub fn record_operation(operation: &str, duration: std::time::Duration) {
    OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

/// Increment the failed extraction counter.
pub fn record_operation_error(operation: &str, kind: &str) {
    OPERATION_ERRORS.with_label_values(&[operation, kind]).inc();
}
