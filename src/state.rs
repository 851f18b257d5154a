//! Application state for the `serve` command.
//!
//! The state holds the configuration every request evaluates with and the
//! summary of the most recent successful evaluation.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::SystemTime;

use crate::config::Config;
use crate::pipeline::CycleSummary;

/// The main application state shared across all handlers
#[derive(Debug)]
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// Server start time
    pub started_at: SystemTime,
    last_evaluation: RwLock<Option<CycleSummary>>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(config: Config) -> Self {
        Self {
            config,
            started_at: SystemTime::now(),
            last_evaluation: RwLock::new(None),
        }
    }

    /// Create a new AppState wrapped in an Arc for shared ownership
    pub fn new_shared(config: Config) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    /// Record a finished evaluation
    pub fn record_evaluation(&self, summary: CycleSummary) {
        *self.last_evaluation.write() = Some(summary);
    }

    /// The most recent evaluation, if any
    pub fn last_evaluation(&self) -> Option<CycleSummary> {
        self.last_evaluation.read().clone()
    }
}
