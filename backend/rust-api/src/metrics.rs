use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

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
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Database Metrics (MongoDB)
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

    // Business Metrics
    pub static ref COURSE_META_MUTATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "course_meta_mutations_total",
        "Total number of course meta mutations",
        &["operation", "status"]
    )
    .unwrap();

    pub static ref SUBTOPIC_TOGGLES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "subtopic_toggles_total",
        "Total number of sub-topic completion toggles",
        &["completed"]
    )
    .unwrap();

    pub static ref ASSIGNMENT_SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "assignment_submissions_total",
        "Total number of assignment submission changes",
        &["submitted"]
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

pub fn record_course_meta_mutation(operation: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    COURSE_META_MUTATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
}

pub fn record_subtopic_toggle(completed: bool) {
    SUBTOPIC_TOGGLES_TOTAL
        .with_label_values(&[if completed { "true" } else { "false" }])
        .inc();
}

pub fn record_assignment_submission(submitted: bool) {
    ASSIGNMENT_SUBMISSIONS_TOTAL
        .with_label_values(&[if submitted { "true" } else { "false" }])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        let _ = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/health", "200"])
            .get();
    }

    #[test]
    fn test_render_metrics() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();
        record_course_meta_mutation("add_week", true);

        let output = render_metrics().unwrap();
        assert!(output.contains("http_requests_total"));
        assert!(output.contains("course_meta_mutations_total"));
    }

    #[tokio::test]
    async fn track_db_operation_passes_result_through() {
        let value = track_db_operation("find_one", "coursemetas", async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);

        let err = track_db_operation::<_, ()>("find_one", "coursemetas", async {
            Err(anyhow::anyhow!("boom"))
        })
        .await;
        assert!(err.is_err());
    }
}
