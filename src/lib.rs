//! QR Check-in Engine
//!
//! Turns a live camera feed into attendance outcomes: decodes QR codes in
//! real time, resolves payloads against a roster, and reports a classified
//! result to the surrounding application. Embedded engine only: no web
//! surface, no CLI, no persistence.
//!
//! ## Architecture (6 Components)
//!
//! 1. CaptureDevice - host camera + decode primitive capability surface
//! 2. DecodeSource - frame sampling loop, emits decode events
//! 3. DedupWindow - drops repeated decodes inside a short window
//! 4. Resolver - roster lookup and outcome classification
//! 5. FeedbackState - latest outcome + session state for observers
//! 6. SessionController - start/stop lifecycle, single active session
//!
//! ## Design Principles
//!
//! - Single writer per shared surface: the controller writes session
//!   state, the resolver writes the outcome slot, the suppression table
//!   belongs to the pump. No locking beyond that discipline.
//! - External capabilities (camera, roster) are injected traits, so the
//!   core runs against fakes in tests.
//! - Only the latest completed outcome matters; outcomes land in
//!   completion order, last writer wins.

pub mod capture;
pub mod config;
pub mod decode_source;
pub mod dedup_window;
pub mod error;
pub mod feedback;
pub mod resolver;
pub mod roster;
pub mod session;

pub use capture::{AcquireError, CaptureDevice, DeviceHandle};
pub use config::EngineConfig;
pub use decode_source::DecodeEvent;
pub use dedup_window::DedupWindow;
pub use error::{Error, Result};
pub use feedback::FeedbackState;
pub use resolver::{Outcome, Resolver};
pub use roster::{HttpRosterClient, LookupError, RosterLookup, RosterRecord};
pub use session::{ScanPolicy, SessionController, SessionState, StartFailure};
