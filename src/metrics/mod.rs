//! Metrics module
//!
//! Prometheus counters and histograms for token requests, guard decisions and
//! HTTP responses.

pub mod server;

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};
use std::time::Duration;

lazy_static! {
    // Token endpoint metrics
    pub static ref TOKEN_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "apigate_token_requests_total",
        "Token requests by flow and outcome",
        &["flow", "outcome"]
    ).unwrap();

    pub static ref TOKEN_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "apigate_token_request_duration_seconds",
        "Token request duration in seconds, including credential verification",
        &["flow"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    ).unwrap();

    // Guard metrics
    pub static ref GUARD_DECISIONS_TOTAL: CounterVec = register_counter_vec!(
        "apigate_guard_decisions_total",
        "Authorization guard decisions",
        &["audience", "outcome"]
    ).unwrap();

    // HTTP metrics
    pub static ref HTTP_RESPONSES_TOTAL: CounterVec = register_counter_vec!(
        "apigate_http_responses_total",
        "HTTP responses by route and status",
        &["route", "status"]
    ).unwrap();

    // Error metrics
    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "apigate_errors_total",
        "Total errors",
        &["type"]
    ).unwrap();
}

/// Record a finished token request
pub fn record_token_request(flow: &str, outcome: &str, elapsed: Duration) {
    TOKEN_REQUESTS_TOTAL.with_label_values(&[flow, outcome]).inc();
    TOKEN_REQUEST_DURATION
        .with_label_values(&[flow])
        .observe(elapsed.as_secs_f64());
}

/// Record an authorization guard decision
pub fn record_guard_decision(audience: &str, outcome: &str) {
    GUARD_DECISIONS_TOTAL
        .with_label_values(&[audience, outcome])
        .inc();
}

/// Record an HTTP response
pub fn record_response(route: &str, status: u16) {
    let status = status.to_string();
    HTTP_RESPONSES_TOTAL
        .with_label_values(&[route, status.as_str()])
        .inc();
}

/// Record an error
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}
