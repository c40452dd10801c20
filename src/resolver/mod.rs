//! Resolver - Payload Resolution and Outcome Classification
//!
//! ## Responsibilities
//!
//! - Normalize admitted payloads (trim whitespace, nothing else)
//! - Issue exactly one roster lookup per admitted decode
//! - Classify the response into an [`Outcome`]
//! - Keep at most one lookup in flight per payload
//!
//! Lookups for different payloads may run concurrently; outcomes land in
//! the feedback slot in completion order, last writer wins. A lookup
//! failure is an outcome, not a session error: scanning continues.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::feedback::FeedbackState;
use crate::roster::{LookupError, RosterLookup, RosterRecord};

/// Classified result of one admitted scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The code is on the roster
    Found(RosterRecord),
    /// The service explicitly reported no such code
    NotFound { payload: String },
    /// The lookup itself failed (transport or service error)
    LookupFailed { reason: String },
}

impl Outcome {
    /// One-line summary for sinks that only log
    pub fn summary(&self) -> String {
        match self {
            Outcome::Found(record) => {
                format!("found: {} ({})", record.display_name, record.code)
            }
            Outcome::NotFound { payload } => format!("not found: {}", payload),
            Outcome::LookupFailed { reason } => format!("lookup failed: {}", reason),
        }
    }
}

/// Resolver instance
pub struct Resolver {
    roster: Arc<dyn RosterLookup>,
    feedback: Arc<FeedbackState>,
    lookup_timeout: Duration,
    /// Payloads with a lookup currently in flight
    in_flight: Mutex<HashSet<String>>,
}

impl Resolver {
    /// Create new Resolver
    pub fn new(
        roster: Arc<dyn RosterLookup>,
        feedback: Arc<FeedbackState>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            roster,
            feedback,
            lookup_timeout,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Resolve one payload to an outcome
    ///
    /// Trims the payload, issues a single lookup, classifies the result.
    /// Format validation and case sensitivity are the roster service's
    /// concern.
    pub async fn resolve(&self, payload: &str) -> Outcome {
        let code = payload.trim();

        let result = timeout(self.lookup_timeout, self.roster.lookup(code)).await;

        match result {
            Ok(Ok(Some(record))) => Outcome::Found(record),
            Ok(Ok(None)) => Outcome::NotFound {
                payload: code.to_string(),
            },
            Ok(Err(e)) => {
                tracing::error!(payload = %code, error = %e, "Roster lookup failed");
                Outcome::LookupFailed {
                    reason: e.to_string(),
                }
            }
            Err(_) => {
                let e = LookupError::Transport(format!(
                    "lookup timed out after {:?}",
                    self.lookup_timeout
                ));
                tracing::error!(payload = %code, error = %e, "Roster lookup failed");
                Outcome::LookupFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Resolve in the background and publish the outcome
    ///
    /// Skips the payload entirely if a lookup for it is already in
    /// flight. The spawned task is detached on purpose: a lookup issued
    /// before `stop()` still completes and publishes its outcome after
    /// the session has ended.
    pub fn dispatch(self: &Arc<Self>, payload: String) {
        let resolver = self.clone();
        tokio::spawn(async move {
            {
                let mut in_flight = resolver.in_flight.lock().await;
                if !in_flight.insert(payload.trim().to_string()) {
                    tracing::debug!(payload = %payload, "Lookup already in flight, skipping");
                    return;
                }
            }

            let outcome = resolver.resolve(&payload).await;

            {
                let mut in_flight = resolver.in_flight.lock().await;
                in_flight.remove(payload.trim());
            }

            resolver.feedback.publish_outcome(outcome);
        });
    }
}
