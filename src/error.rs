//! Error types for cityio-kpi.
//!
//! Only conditions that abort an evaluation cycle are represented here.
//! Per-cell gaps (unresolved type-indices, use-codes outside every category)
//! are recovered where they occur and never surface as errors.

use thiserror::Error;

/// The main error type for cityio-kpi operations.
#[derive(Error, Debug)]
pub enum KpiError {
    /// Required header fields are absent or have the wrong shape
    #[error("Malformed header: {message}")]
    MalformedHeader { message: String },

    /// Grid payload does not match the header geometry
    #[error("Malformed grid: {message}")]
    MalformedGrid { message: String },

    /// A coordinate could not be reprojected
    #[error("Reprojection error: {message}")]
    Reprojection { message: String },

    /// CRS identifier that cannot be turned into a projection
    #[error("Unsupported CRS: {crs}")]
    UnsupportedCrs { crs: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Transport-level HTTP failures
    #[error("HTTP error for {url}: {message}")]
    Http { url: String, message: String },

    /// Upstream answered with something other than 200
    #[error("Unexpected status {status} from {url}")]
    UpstreamStatus { url: String, status: u16 },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server errors
    #[error("Server error: {message}")]
    Server { message: String },
}

impl KpiError {
    /// Whether the error was caused by the caller's input rather than by this process
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            KpiError::MalformedHeader { .. }
                | KpiError::MalformedGrid { .. }
                | KpiError::UnsupportedCrs { .. }
        )
    }
}

/// Convenience type alias for Results with KpiError
pub type Result<T> = std::result::Result<T, KpiError>;
