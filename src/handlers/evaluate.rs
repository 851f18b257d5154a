//! Evaluation endpoint handler.
//!
//! Accepts a table snapshot (`header`, `grid`, optional `grid_hash`) and
//! returns the KPI result record computed with the server's configuration.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{KpiError, Result};
use crate::kpi::TypeDefs;
use crate::logging::{generate_request_id, log_request_error};
use crate::pipeline::{evaluate, Evaluation};
use crate::state::AppState;

/// Body of POST /evaluate
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub header: Value,
    pub grid: Value,
    #[serde(default)]
    pub grid_hash: Value,
}

/// Handle POST /evaluate requests
pub async fn evaluate_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EvaluateRequest>,
) -> Response {
    let request_id = generate_request_id();
    let start_time = Instant::now();

    debug!(
        endpoint = "/evaluate",
        request_id = %request_id,
        grid_hash = %request.grid_hash,
        "Processing evaluation request"
    );

    let grid_hash = request.grid_hash.clone();
    let outcome = {
        let state = state.clone();
        tokio::task::spawn_blocking(move || process_evaluation(&state, request))
            .await
            .map_err(|e| KpiError::Server {
                message: format!("Evaluation task failed: {}", e),
            })
            .and_then(|r| r)
    };

    match outcome {
        Ok(evaluation) => {
            info!(
                endpoint = "/evaluate",
                request_id = %request_id,
                duration_us = start_time.elapsed().as_micros() as u64,
                occupied = evaluation.summary.stats.occupied,
                features = ?evaluation.summary.feature_count,
                "Evaluation request successful"
            );
            state.record_evaluation(evaluation.summary);
            (StatusCode::OK, Json(evaluation.result)).into_response()
        }
        Err(error) => handle_evaluation_error(error, &request_id, &grid_hash),
    }
}

/// Load the catalog and run the evaluation
fn process_evaluation(state: &AppState, request: EvaluateRequest) -> Result<Evaluation> {
    let processing = &state.config.processing;
    let typedefs = TypeDefs::load(&processing.typedefs_path)?;
    evaluate(
        &request.header,
        &request.grid,
        request.grid_hash,
        &typedefs,
        processing,
    )
}

/// Status code for an evaluation error
fn error_status(error: &KpiError) -> StatusCode {
    if error.is_input_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Handle error responses for evaluations
fn handle_evaluation_error(error: KpiError, request_id: &str, grid_hash: &Value) -> Response {
    log_request_error(
        &error,
        "/evaluate",
        request_id,
        Some(&format!("grid_hash={}", grid_hash)),
    );

    (
        error_status(&error),
        Json(serde_json::json!({
            "error": error.to_string(),
            "request_id": request_id
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            error_status(&KpiError::MalformedHeader {
                message: "x".to_string()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&KpiError::UnsupportedCrs {
                crs: "EPSG:1".to_string()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&KpiError::Reprojection {
                message: "x".to_string()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            error_status(&KpiError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "typedefs.json"
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_request_defaults_grid_hash() {
        let request: EvaluateRequest =
            serde_json::from_value(serde_json::json!({"header": {}, "grid": []})).unwrap();
        assert!(request.grid_hash.is_null());
    }
}
