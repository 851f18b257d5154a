//! In-process stand-in for a cityIO table.
//!
//! Serves `header`, `grid` and `meta/hashes/grid` below `/api/table/test/`
//! and records every body posted to `/api/table/update/test/kpi`.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;

use super::test_data::{sample_grid, sample_header};

/// Grid hash reported by the mock
pub const GRID_HASH: &str = "5f2c1d9e";

/// What the mock received
#[derive(Default)]
pub struct Recorded {
    pub posts: Mutex<Vec<Value>>,
    pub authorization: Mutex<Option<String>>,
}

/// A running mock table
pub struct MockCityIo {
    pub addr: SocketAddr,
    pub recorded: Arc<Recorded>,
}

impl MockCityIo {
    pub fn input_url(&self) -> String {
        format!("http://{}/api/table/test/", self.addr)
    }

    pub fn output_url(&self) -> String {
        format!("http://{}/api/table/update/test/kpi", self.addr)
    }
}

/// Start the mock on an ephemeral port
pub async fn start_mock_cityio() -> MockCityIo {
    let recorded = Arc::new(Recorded::default());

    let app = Router::new()
        .route("/api/table/test/header", get(|| async { Json(sample_header()) }))
        .route("/api/table/test/grid", get(|| async { Json(sample_grid()) }))
        .route(
            "/api/table/test/meta/hashes/grid",
            get(|| async { Json(Value::String(GRID_HASH.to_string())) }),
        )
        .route("/api/table/update/test/kpi", post(record_post))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock cityIO");
    let addr = listener.local_addr().expect("mock address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock cityIO failed");
    });

    MockCityIo { addr, recorded }
}

async fn record_post(
    State(recorded): State<Arc<Recorded>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    *recorded.authorization.lock() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    recorded.posts.lock().push(body);
    StatusCode::OK
}
