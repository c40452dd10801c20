//! Roster Lookup Service surface
//!
//! ## Responsibilities
//!
//! - Define the lookup seam the engine resolves payloads against
//! - Ship an HTTP adapter for remote roster services
//!
//! The engine treats the roster as a black box: no retry, no backoff, no
//! assumptions about how records are stored. Retry policy, if any, lives
//! in the service client behind this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;

/// One roster entry, as returned by a lookup
///
/// The engine only holds an immutable copy for the duration of one
/// outcome's display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRecord {
    /// Check-in code (the QR payload for this person)
    pub code: String,
    /// Display name
    pub display_name: String,
    /// Additional service-defined fields (group, grade, photo URL, ...)
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Lookup failure
///
/// Distinct from "no such code", which is a valid response
/// (`Ok(None)` from [`RosterLookup::lookup`]).
#[derive(Debug, Clone, thiserror::Error)]
pub enum LookupError {
    /// The service could not be reached or timed out
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with an error
    #[error("roster service error: {0}")]
    Service(String),
}

/// Roster lookup capability consumed by the resolver
#[async_trait]
pub trait RosterLookup: Send + Sync {
    /// Look up a check-in code
    ///
    /// `Ok(Some(record))` when the code is on the roster, `Ok(None)` when
    /// the service explicitly reports no such code.
    async fn lookup(&self, code: &str) -> std::result::Result<Option<RosterRecord>, LookupError>;
}

/// HTTP adapter for a remote roster service
///
/// Expects `GET {base_url}/api/students/{code}` returning a
/// [`RosterRecord`] as JSON, with 404 meaning "no such code".
pub struct HttpRosterClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRosterClient {
    /// Create new HttpRosterClient
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn lookup_url(&self, code: &str) -> String {
        format!("{}/api/students/{}", self.base_url, code)
    }
}

#[async_trait]
impl RosterLookup for HttpRosterClient {
    async fn lookup(&self, code: &str) -> std::result::Result<Option<RosterRecord>, LookupError> {
        let url = self.lookup_url(code);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !resp.status().is_success() {
            return Err(LookupError::Service(format!(
                "roster service returned {}",
                resp.status()
            )));
        }

        let record: RosterRecord = resp
            .json()
            .await
            .map_err(|e| LookupError::Service(format!("invalid roster response: {}", e)))?;

        tracing::debug!(code = %code, display_name = %record.display_name, "Roster lookup hit");

        Ok(Some(record))
    }
}
