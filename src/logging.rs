//! Tracing setup and structured log helpers.
//!
//! Cycles and HTTP requests carry a uuid so their log lines can be grouped.

use std::time::Instant;
use tracing::{debug, error, info, warn, Level};

use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use uuid::Uuid;

use crate::error::KpiError;
use crate::kpi::{AggregationStats, KpiTotals};

/// Trace layer used by the `serve` router
pub fn create_http_trace_layer() -> TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    DefaultMakeSpan,
    DefaultOnRequest,
    DefaultOnResponse,
> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::DEBUG)
                .latency_unit(LatencyUnit::Micros),
        )
}

/// Install the global subscriber; `RUST_LOG` wins over `log_level`
pub fn init_tracing(log_level: &str) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}

pub fn log_operation_start(operation: &str, source: Option<&str>) {
    match source {
        Some(source) => info!(operation, source, "Operation started"),
        None => info!(operation, "Operation started"),
    }
}

pub fn log_operation_end(operation: &str, start_time: Instant, success: bool) {
    let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
    if success {
        info!(operation, duration_ms, "Operation finished");
    } else {
        warn!(operation, duration_ms, "Operation failed");
    }
}

/// Run `f` and log how long it took at debug level
pub fn log_timed_operation<F, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let result = f();
    debug!(
        operation,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Timed operation"
    );
    result
}

/// Log the outcome of one evaluation
pub fn log_cycle_stats(
    cycle_id: &str,
    stats: &AggregationStats,
    totals: &KpiTotals,
    feature_count: Option<usize>,
    duration_ms: f64,
) {
    let totals = totals
        .iter()
        .map(|(category, actual, expected)| format!("{}={}/{}", category, actual, expected))
        .collect::<Vec<_>>()
        .join(", ");

    info!(
        cycle_id,
        cells = stats.cells,
        occupied = stats.occupied,
        unresolved = stats.unresolved,
        buildings = stats.buildings,
        open_spaces = stats.open_spaces,
        category_misses = stats.category_misses,
        features = ?feature_count,
        totals = %totals,
        duration_ms,
        "Cycle evaluated"
    );
}

pub fn log_error(error: &KpiError, context: &str) {
    error!(
        error = %error,
        context,
        input_error = error.is_input_error(),
        "Evaluation error"
    );
}

pub fn log_request_error(error: &KpiError, endpoint: &str, request_id: &str, params: Option<&str>) {
    error!(
        error = %error,
        endpoint,
        request_id,
        params = params.unwrap_or("none"),
        input_error = error.is_input_error(),
        "Request failed"
    );
}

/// A fresh uuid for a request or cycle
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}
