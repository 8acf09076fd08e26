use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};

use crate::oracle::OracleError;

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap();

    // Store Metrics
    pub static ref DB_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "db_operations_total",
        "Total number of database operations",
        &["operation", "collection", "status"]
    )
    .unwrap();

    pub static ref DB_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "db_operation_duration_seconds",
        "Database operation duration in seconds",
        &["operation", "collection"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap();

    // Oracle Metrics
    pub static ref ORACLE_CALLS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "oracle_calls_total",
        "Total number of content oracle calls",
        &["capability", "outcome"]
    )
    .unwrap();

    pub static ref ORACLE_CALL_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "oracle_call_duration_seconds",
        "Content oracle call duration in seconds",
        &["capability"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap();

    // Business Metrics
    pub static ref TASKS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "tasks_created_total",
        "Total number of tasks created"
    )
    .unwrap();

    pub static ref QUIZZES_GENERATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quizzes_generated_total",
        "Total number of quizzes generated",
        &["source"]
    )
    .unwrap();

    pub static ref QUIZ_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_attempts_total",
        "Total number of quiz attempts submitted",
        &["result"]
    )
    .unwrap();

    pub static ref ROADMAPS_GENERATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "roadmaps_generated_total",
        "Total number of roadmaps generated",
        &["source"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track database operation with metrics
pub async fn track_db_operation<F, T>(
    operation: &str,
    collection: &str,
    future: F,
) -> Result<T, anyhow::Error>
where
    F: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    DB_OPERATIONS_TOTAL
        .with_label_values(&[operation, collection, status])
        .inc();

    DB_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation, collection])
        .observe(duration);

    result
}

/// Helper: time an oracle call and count it by outcome
pub async fn track_oracle_call<F, T>(capability: &str, future: F) -> Result<T, OracleError>
where
    F: std::future::Future<Output = Result<T, OracleError>>,
{
    let start = std::time::Instant::now();
    let result = future.await;

    let outcome = match &result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };

    ORACLE_CALLS_TOTAL
        .with_label_values(&[capability, outcome])
        .inc();

    ORACLE_CALL_DURATION_SECONDS
        .with_label_values(&[capability])
        .observe(start.elapsed().as_secs_f64());

    result
}

/// Record whether a generated artifact came from the oracle or a fallback
pub fn source_label(from_oracle: bool) -> &'static str {
    if from_oracle {
        "oracle"
    } else {
        "fallback"
    }
}
