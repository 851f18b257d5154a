//! HTTP request handlers for the cityio-kpi server.
//!
//! This module contains the endpoint handlers and the router that wires them.

pub mod evaluate;
pub mod heartbeat;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::logging::create_http_trace_layer;
use crate::state::AppState;

pub use evaluate::evaluate_handler;
pub use heartbeat::heartbeat_handler;

/// Build the router for the `serve` command
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/evaluate", post(evaluate_handler))
        .route("/heartbeat", get(heartbeat_handler))
        .layer(CorsLayer::permissive())
        .layer(create_http_trace_layer())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_heartbeat_route() {
        let app = router(AppState::new_shared(Config::default()));
        let response = app
            .oneshot(Request::get("/heartbeat").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_evaluate_rejects_non_json_body() {
        let app = router(AppState::new_shared(Config::default()));
        let response = app
            .oneshot(
                Request::post("/evaluate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_evaluate_server_error_status() {
        let mut config = Config::default();
        config.processing.typedefs_path = "/nonexistent/typedefs.json".into();
        let app = router(AppState::new_shared(config));

        let body = serde_json::json!({"header": {}, "grid": []});
        let response = app
            .oneshot(
                Request::post("/evaluate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = router(AppState::new_shared(Config::default()));
        let response = app
            .oneshot(Request::get("/metadata").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
