//! Request counters and latency, emitted through the `metrics` facade.
//!
//! The crate only records; installing a recorder/exporter is up to the
//! embedding application. Without one, these calls are no-ops.

use metrics::{counter, histogram};

/// Stable metric names, all under the `firekit_` prefix.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "firekit_requests_total";
    pub const RETRIES_TOTAL: &str = "firekit_retries_total";
    pub const LATENCY_SECONDS: &str = "firekit_latency_seconds";
}

/// Count a finished request and record its latency.
///
/// `status` is the final HTTP status, or 0 when the request never produced a
/// response.
pub fn record_request(operation: &str, status: u16, latency_secs: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_secs);
}

/// Count one retry of an operation.
pub fn record_retry(operation: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_prefixed_and_stable() {
        assert_eq!(names::REQUESTS_TOTAL, "firekit_requests_total");
        assert_eq!(names::RETRIES_TOTAL, "firekit_retries_total");
        assert_eq!(names::LATENCY_SECONDS, "firekit_latency_seconds");
    }
}
