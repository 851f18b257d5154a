//! Heartbeat endpoint handler.
//!
//! Returns server status: uptime, memory usage, the evaluation settings and
//! the summary of the last successful evaluation.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::config::OutputForm;
use crate::features::GeometryMode;
use crate::pipeline::CycleSummary;
use crate::state::AppState;

/// Server ID, unique per process
static SERVER_ID: once_cell::sync::Lazy<String> =
    once_cell::sync::Lazy::new(|| Uuid::new_v4().to_string());

/// Heartbeat response structure
#[derive(Serialize)]
pub struct HeartbeatResponse {
    /// Server ID (unique per instance)
    pub server_id: String,
    /// Current timestamp (ISO 8601 format)
    pub timestamp: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Process memory usage in bytes
    pub memory_usage_bytes: Option<u64>,
    /// Evaluation settings
    pub settings: SettingsInfo,
    /// Last successful evaluation
    pub last_evaluation: Option<CycleSummary>,
    /// Server status
    pub status: String,
}

/// Evaluation settings reported by the heartbeat
#[derive(Serialize)]
pub struct SettingsInfo {
    pub input_crs: String,
    pub compute_crs: String,
    pub output_crs: String,
    pub geometry: GeometryMode,
    pub output_form: OutputForm,
    pub typedefs_path: String,
}

impl SettingsInfo {
    fn from_state(state: &AppState) -> Self {
        let processing = &state.config.processing;
        Self {
            input_crs: processing.input_crs.clone(),
            compute_crs: processing.compute_crs.clone(),
            output_crs: processing.output_crs.clone(),
            geometry: processing.geometry,
            output_form: processing.output_form,
            typedefs_path: processing.typedefs_path.display().to_string(),
        }
    }
}

/// Handle GET /heartbeat requests
pub async fn heartbeat_handler(State(state): State<Arc<AppState>>) -> Json<HeartbeatResponse> {
    let now = SystemTime::now();
    let timestamp = chrono::DateTime::<chrono::Utc>::from(now)
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

    let uptime = now
        .duration_since(state.started_at)
        .unwrap_or(Duration::from_secs(0));

    Json(HeartbeatResponse {
        server_id: SERVER_ID.clone(),
        timestamp,
        uptime_seconds: uptime.as_secs(),
        memory_usage_bytes: get_memory_usage(),
        settings: SettingsInfo::from_state(&state),
        last_evaluation: state.last_evaluation(),
        status: "healthy".to_string(),
    })
}

/// Resident set size of this process (Linux only)
fn get_memory_usage() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        // Second field of /proc/self/statm is the RSS in pages
        let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
        let pages = statm.split_whitespace().nth(1)?.parse::<u64>().ok()?;
        Some(pages * 4096)
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}
