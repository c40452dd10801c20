//! FeedbackState - Latest Result Distribution
//!
//! ## Responsibilities
//!
//! - Hold the current classified outcome and the session's operational state
//! - Let any observer (the notification sink, a UI) subscribe to changes
//!
//! Overwritten, not queued: a new outcome always replaces the prior one.
//! The engine shows "the latest scan result", not a history. Writers are
//! fixed by convention: the session controller writes the session state,
//! the resolver writes the outcome.

use tokio::sync::watch;

use crate::resolver::Outcome;
use crate::session::SessionState;

/// Shared feedback surface
pub struct FeedbackState {
    outcome_tx: watch::Sender<Option<Outcome>>,
    session_tx: watch::Sender<SessionState>,
}

impl FeedbackState {
    /// Create new FeedbackState
    pub fn new() -> Self {
        let (outcome_tx, _) = watch::channel(None);
        let (session_tx, _) = watch::channel(SessionState::Idle);
        Self {
            outcome_tx,
            session_tx,
        }
    }

    /// Replace the current outcome
    ///
    /// Resolver-only by convention.
    pub fn publish_outcome(&self, outcome: Outcome) {
        tracing::info!(outcome = %outcome.summary(), "Outcome published");
        self.outcome_tx.send_replace(Some(outcome));
    }

    /// Record a session state transition
    ///
    /// Session-controller-only by convention.
    pub fn set_session_state(&self, state: SessionState) {
        tracing::info!(state = ?state, "Session state changed");
        self.session_tx.send_replace(state);
    }

    /// Latest outcome, if any scan has completed
    pub fn current_outcome(&self) -> Option<Outcome> {
        self.outcome_tx.borrow().clone()
    }

    /// Current session state
    pub fn session_state(&self) -> SessionState {
        self.session_tx.borrow().clone()
    }

    /// Subscribe to outcome changes (notification sink surface)
    pub fn subscribe_outcomes(&self) -> watch::Receiver<Option<Outcome>> {
        self.outcome_tx.subscribe()
    }

    /// Subscribe to session state transitions
    pub fn subscribe_session(&self) -> watch::Receiver<SessionState> {
        self.session_tx.subscribe()
    }
}

impl Default for FeedbackState {
    fn default() -> Self {
        Self::new()
    }
}
