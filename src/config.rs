//! Engine configuration
//!
//! Tunables for the scan pipeline. Defaults can be overridden via
//! environment variables at construction time.

use std::time::Duration;

/// Engine configuration shared by all components
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Duplicate suppression window. A payload re-decoded within this
    /// window of its last accepted decode is dropped.
    pub suppression_window: Duration,
    /// Interval between frame samples in the decode loop
    pub sampling_interval: Duration,
    /// Timeout applied to a single roster lookup call
    pub lookup_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            suppression_window: std::env::var("SUPPRESSION_WINDOW_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_millis(2000)),
            sampling_interval: std::env::var("SAMPLING_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_millis(100)),
            lookup_timeout: std::env::var("LOOKUP_TIMEOUT_SEC")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(10)),
        }
    }
}
