//! DedupWindow - Duplicate Suppression
//!
//! ## Responsibilities
//!
//! - Drop repeated decodes of the same payload inside a short window
//! - One entry per distinct payload seen inside the active session
//! - Full reset whenever a session (re-)enters Active
//!
//! A continuously scanning camera re-decodes an unmoved code many times
//! per second; this table is what keeps a single physical scan from
//! turning into many roster lookups and notifications. Duplicate drops
//! are routine, not errors: nothing is surfaced for them.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Duplicate suppression table
pub struct DedupWindow {
    /// payload -> last accepted decode time
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
    /// Minimum gap between accepted decodes of the same payload
    window: Duration,
}

impl DedupWindow {
    /// Create with the given suppression window
    pub fn new(window: std::time::Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            window: Duration::from_std(window).unwrap_or_else(|_| Duration::seconds(2)),
        }
    }

    /// Admit or drop a decode
    ///
    /// Returns true and records `observed_at` when the payload is new or
    /// its last accepted decode is older than the window. Returns false
    /// otherwise; the entry is left untouched so `last_accepted_at` only
    /// ever moves forward.
    pub async fn admit(&self, payload: &str, observed_at: DateTime<Utc>) -> bool {
        let mut entries = self.entries.write().await;

        if let Some(last_accepted) = entries.get(payload) {
            if observed_at.signed_duration_since(*last_accepted) <= self.window {
                tracing::debug!(
                    payload = %payload,
                    last_accepted_at = %last_accepted,
                    "Duplicate decode dropped"
                );
                return false;
            }
        }

        entries.insert(payload.to_string(), observed_at);
        true
    }

    /// Clear the table
    ///
    /// Called on every entry to Active so suppression state never leaks
    /// across sessions.
    pub async fn reset(&self) {
        let mut entries = self.entries.write().await;
        if !entries.is_empty() {
            tracing::debug!(entries = entries.len(), "Suppression table cleared");
        }
        entries.clear();
    }

    /// Number of distinct payloads currently tracked
    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the table is empty
    #[cfg(test)]
    async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn window_2s() -> DedupWindow {
        DedupWindow::new(StdDuration::from_secs(2))
    }

    #[tokio::test]
    async fn test_first_decode_admitted() {
        let window = window_2s();
        assert!(window.admit("STU-0042", Utc::now()).await);
    }

    #[tokio::test]
    async fn test_repeat_within_window_dropped() {
        let window = window_2s();
        let t0 = Utc::now();
        assert!(window.admit("STU-0042", t0).await);
        assert!(!window.admit("STU-0042", t0 + Duration::milliseconds(300)).await);
    }

    #[tokio::test]
    async fn test_repeat_beyond_window_admitted() {
        let window = window_2s();
        let t0 = Utc::now();
        assert!(window.admit("STU-0042", t0).await);
        assert!(window.admit("STU-0042", t0 + Duration::milliseconds(3000)).await);
    }

    #[tokio::test]
    async fn test_dropped_decode_does_not_extend_window() {
        let window = window_2s();
        let t0 = Utc::now();
        assert!(window.admit("STU-0042", t0).await);
        // Dropped at t0+1.9s; must not reset the clock
        assert!(!window.admit("STU-0042", t0 + Duration::milliseconds(1900)).await);
        // Still admitted at t0+2.1s measured from the *accepted* decode
        assert!(window.admit("STU-0042", t0 + Duration::milliseconds(2100)).await);
    }

    #[tokio::test]
    async fn test_distinct_payloads_independent() {
        let window = window_2s();
        let t0 = Utc::now();
        assert!(window.admit("STU-0042", t0).await);
        assert!(window.admit("STU-0043", t0).await);
    }

    #[tokio::test]
    async fn test_reset_clears_all_entries() {
        let window = window_2s();
        let t0 = Utc::now();
        assert!(window.admit("STU-0042", t0).await);
        assert_eq!(window.len().await, 1);

        window.reset().await;
        assert!(window.is_empty().await);

        // Same payload at the same instant is admitted again post-reset
        assert!(window.admit("STU-0042", t0).await);
    }
}
