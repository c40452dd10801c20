//! SessionController - Scanner Lifecycle
//!
//! ## Responsibilities
//!
//! - Own the start/stop state machine for the capture session
//! - Enforce a single active session (no double-acquire)
//! - Guarantee device release on every exit path
//! - Reset the suppression window on each entry to Active
//! - Wire decode events through suppression into the resolver
//!
//! ## State machine
//!
//! ```text
//! Idle --start()--> Starting --device acquired--> Active
//! Starting --device/permission error--> Failed
//! Active --stop()--> Stopping --released--> Idle
//! Failed --start()--> Starting
//! ```
//!
//! No transition leaves a device handle acquired outside Active. Device
//! and permission failures are terminal for the session: no auto-retry,
//! the caller must start() again.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::capture::{AcquireError, CaptureDevice};
use crate::config::EngineConfig;
use crate::decode_source::{DecodeEvent, DecodeSource};
use crate::dedup_window::DedupWindow;
use crate::error::Result;
use crate::feedback::FeedbackState;
use crate::resolver::Resolver;
use crate::roster::RosterLookup;

/// Why a start attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartFailure {
    /// No capture device could be opened
    DeviceUnavailable,
    /// The platform refused camera access
    PermissionDenied,
}

/// Session operational state, single source of truth for whether the
/// decode source should be running
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No session, no device held
    Idle,
    /// Acquiring the capture device
    Starting,
    /// Decode loop running
    Active,
    /// Winding down, waiting for device release
    Stopping,
    /// Last start failed; cleared by the next start() or stop()
    Failed(StartFailure),
}

/// Per-start scan policy
///
/// `stop_on_success` winds the session down after the first *admitted*
/// decode; duplicates never trigger the stop. Default is continuous
/// scanning.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanPolicy {
    pub stop_on_success: bool,
}

struct SessionInner {
    state: SessionState,
    stop_tx: Option<watch::Sender<bool>>,
    pump: Option<JoinHandle<()>>,
}

/// Scanner lifecycle controller
///
/// Composition root of the engine: owns the suppression window, the
/// resolver, and the feedback surface, and drives the decode source.
pub struct SessionController {
    device: Arc<dyn CaptureDevice>,
    dedup: Arc<DedupWindow>,
    resolver: Arc<Resolver>,
    feedback: Arc<FeedbackState>,
    config: EngineConfig,
    inner: Mutex<SessionInner>,
}

impl SessionController {
    /// Create new SessionController
    pub fn new(
        device: Arc<dyn CaptureDevice>,
        roster: Arc<dyn RosterLookup>,
        config: EngineConfig,
    ) -> Self {
        let feedback = Arc::new(FeedbackState::new());
        let dedup = Arc::new(DedupWindow::new(config.suppression_window));
        let resolver = Arc::new(Resolver::new(
            roster,
            feedback.clone(),
            config.lookup_timeout,
        ));

        Self {
            device,
            dedup,
            resolver,
            feedback,
            config,
            inner: Mutex::new(SessionInner {
                state: SessionState::Idle,
                stop_tx: None,
                pump: None,
            }),
        }
    }

    /// Feedback surface for observers (notification sink, UI)
    pub fn feedback(&self) -> Arc<FeedbackState> {
        self.feedback.clone()
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.feedback.session_state()
    }

    /// Start a capture session
    ///
    /// Idle|Failed -> Starting -> Active. Calling start() while a session
    /// is starting, active, or stopping is a no-op returning the current
    /// state. On acquire failure the state becomes Failed and the error
    /// is returned; the device is not held.
    pub async fn start(self: &Arc<Self>, policy: ScanPolicy) -> Result<SessionState> {
        let mut inner = self.inner.lock().await;

        match inner.state {
            SessionState::Starting | SessionState::Active | SessionState::Stopping => {
                tracing::warn!(state = ?inner.state, "start() ignored, session already in progress");
                return Ok(inner.state.clone());
            }
            SessionState::Idle | SessionState::Failed(_) => {}
        }

        let session_id = Uuid::new_v4();
        Self::set_state(&mut inner, &self.feedback, SessionState::Starting);
        tracing::info!(session_id = %session_id, "Starting capture session");

        let handle = match self.device.acquire().await {
            Ok(handle) => handle,
            Err(e) => {
                let failure = match &e {
                    AcquireError::DeviceUnavailable(_) => StartFailure::DeviceUnavailable,
                    AcquireError::PermissionDenied(_) => StartFailure::PermissionDenied,
                };
                tracing::error!(session_id = %session_id, error = %e, "Device acquire failed");
                Self::set_state(&mut inner, &self.feedback, SessionState::Failed(failure));
                return Err(e.into());
            }
        };

        // Fresh session, fresh suppression table
        self.dedup.reset().await;

        Self::set_state(&mut inner, &self.feedback, SessionState::Active);

        let (stop_tx, stop_rx) = watch::channel(false);
        let (event_tx, event_rx) = mpsc::channel(64);

        let source = DecodeSource::new(self.device.clone(), self.config.sampling_interval);
        let decode_task = tokio::spawn(source.run(session_id, handle, event_tx, stop_rx));

        let pump = tokio::spawn(Self::pump(
            self.clone(),
            session_id,
            event_rx,
            decode_task,
            stop_tx.clone(),
            policy,
        ));

        inner.stop_tx = Some(stop_tx);
        inner.pump = Some(pump);

        tracing::info!(session_id = %session_id, "Capture session active");
        Ok(SessionState::Active)
    }

    /// Stop the capture session
    ///
    /// Idempotent: stop() from Idle is a no-op, stop() from Failed just
    /// clears the failure. From Active, the decode loop is signalled,
    /// awaited until the device handle is released, and only then is
    /// Idle reported. In-flight roster lookups are not cancelled; their
    /// outcome still lands in the feedback slot.
    pub async fn stop(&self) -> Result<SessionState> {
        let pump = {
            let mut inner = self.inner.lock().await;

            match inner.state {
                SessionState::Idle => return Ok(SessionState::Idle),
                SessionState::Stopping => {
                    // Another stop is already draining the session
                    return Ok(SessionState::Stopping);
                }
                SessionState::Failed(_) => {
                    Self::set_state(&mut inner, &self.feedback, SessionState::Idle);
                    return Ok(SessionState::Idle);
                }
                SessionState::Starting | SessionState::Active => {}
            }

            Self::set_state(&mut inner, &self.feedback, SessionState::Stopping);
            if let Some(stop_tx) = &inner.stop_tx {
                let _ = stop_tx.send(true);
            }
            inner.pump.take()
        };

        // Lock released: the pump finalizes the state itself
        if let Some(pump) = pump {
            if let Err(e) = pump.await {
                tracing::error!(error = %e, "Session pump panicked during stop");
            }
        }

        Ok(SessionState::Idle)
    }

    /// Event pump: suppression -> resolver, then session teardown
    ///
    /// Runs until the decode loop closes the event channel (external
    /// stop) or the policy fires. Always awaits the decode task before
    /// finalizing, so Idle implies the device handle is released.
    async fn pump(
        controller: Arc<Self>,
        session_id: Uuid,
        mut events: mpsc::Receiver<DecodeEvent>,
        decode_task: JoinHandle<()>,
        stop_tx: watch::Sender<bool>,
        policy: ScanPolicy,
    ) {
        while let Some(event) = events.recv().await {
            if !controller.dedup.admit(&event.payload, event.observed_at).await {
                continue;
            }

            tracing::debug!(
                session_id = %session_id,
                payload = %event.payload,
                "Decode admitted, dispatching lookup"
            );
            controller.resolver.dispatch(event.payload);

            if policy.stop_on_success {
                tracing::info!(session_id = %session_id, "Stop-on-success policy fired");
                break;
            }
        }

        let _ = stop_tx.send(true);
        // Unblock the decode loop if it is mid-send on a full channel
        drop(events);
        if let Err(e) = decode_task.await {
            tracing::error!(session_id = %session_id, error = %e, "Decode task panicked");
        }

        controller.finalize().await;
    }

    /// Transition to Idle after the decode task has fully wound down
    async fn finalize(&self) {
        let mut inner = self.inner.lock().await;
        inner.stop_tx = None;
        inner.pump = None;
        if inner.state != SessionState::Idle {
            Self::set_state(&mut inner, &self.feedback, SessionState::Idle);
        }
    }

    fn set_state(inner: &mut SessionInner, feedback: &FeedbackState, state: SessionState) {
        inner.state = state.clone();
        feedback.set_session_state(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::DeviceHandle;
    use crate::roster::{LookupError, RosterRecord};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Device whose frames always decode the same payload
    struct FakeDevice {
        acquires: AtomicUsize,
        releases: AtomicUsize,
        payload: Option<String>,
        fail_with: Option<AcquireError>,
    }

    impl FakeDevice {
        fn decoding(payload: &str) -> Self {
            Self {
                acquires: AtomicUsize::new(0),
                releases: AtomicUsize::new(0),
                payload: Some(payload.to_string()),
                fail_with: None,
            }
        }

        fn silent() -> Self {
            Self {
                acquires: AtomicUsize::new(0),
                releases: AtomicUsize::new(0),
                payload: None,
                fail_with: None,
            }
        }

        fn failing(e: AcquireError) -> Self {
            Self {
                acquires: AtomicUsize::new(0),
                releases: AtomicUsize::new(0),
                payload: None,
                fail_with: Some(e),
            }
        }
    }

    #[async_trait]
    impl CaptureDevice for FakeDevice {
        async fn acquire(&self) -> std::result::Result<DeviceHandle, AcquireError> {
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            self.acquires.fetch_add(1, Ordering::SeqCst);
            Ok(DeviceHandle::new("fake"))
        }

        async fn release(&self, _handle: DeviceHandle) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }

        async fn decode_next_frame(&self, _handle: &DeviceHandle) -> crate::Result<Option<String>> {
            Ok(self.payload.clone())
        }
    }

    struct MemoryRoster {
        records: HashMap<String, RosterRecord>,
    }

    impl MemoryRoster {
        fn empty() -> Self {
            Self {
                records: HashMap::new(),
            }
        }
    }

    #[async_trait]
    impl RosterLookup for MemoryRoster {
        async fn lookup(
            &self,
            code: &str,
        ) -> std::result::Result<Option<RosterRecord>, LookupError> {
            Ok(self.records.get(code).cloned())
        }
    }

    fn fast_config() -> EngineConfig {
        EngineConfig {
            suppression_window: Duration::from_millis(2000),
            sampling_interval: Duration::from_millis(5),
            lookup_timeout: Duration::from_secs(1),
        }
    }

    fn controller_with(device: Arc<FakeDevice>) -> Arc<SessionController> {
        Arc::new(SessionController::new(
            device,
            Arc::new(MemoryRoster::empty()),
            fast_config(),
        ))
    }

    #[tokio::test]
    async fn test_start_reaches_active() {
        let device = Arc::new(FakeDevice::silent());
        let controller = controller_with(device.clone());

        let state = controller.start(ScanPolicy::default()).await.unwrap();
        assert_eq!(state, SessionState::Active);
        assert_eq!(device.acquires.load(Ordering::SeqCst), 1);

        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_double_start_is_noop() {
        let device = Arc::new(FakeDevice::silent());
        let controller = controller_with(device.clone());

        controller.start(ScanPolicy::default()).await.unwrap();
        let state = controller.start(ScanPolicy::default()).await.unwrap();

        assert_eq!(state, SessionState::Active);
        // Exactly one capture session
        assert_eq!(device.acquires.load(Ordering::SeqCst), 1);

        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_releases_device_and_reaches_idle() {
        let device = Arc::new(FakeDevice::silent());
        let controller = controller_with(device.clone());

        controller.start(ScanPolicy::default()).await.unwrap();
        let state = controller.stop().await.unwrap();

        assert_eq!(state, SessionState::Idle);
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(device.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_from_idle_is_noop() {
        let device = Arc::new(FakeDevice::silent());
        let controller = controller_with(device.clone());

        let state = controller.stop().await.unwrap();
        assert_eq!(state, SessionState::Idle);
        assert_eq!(device.releases.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_permission_denied_start_fails_terminal() {
        let device = Arc::new(FakeDevice::failing(AcquireError::PermissionDenied(
            "blocked by platform".to_string(),
        )));
        let controller = controller_with(device.clone());

        let err = controller.start(ScanPolicy::default()).await.unwrap_err();
        assert!(matches!(err, crate::Error::PermissionDenied(_)));
        assert_eq!(
            controller.state(),
            SessionState::Failed(StartFailure::PermissionDenied)
        );
        // Device never held, nothing to release
        assert_eq!(device.releases.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_device_unavailable_start_fails_terminal() {
        let device = Arc::new(FakeDevice::failing(AcquireError::DeviceUnavailable(
            "no camera".to_string(),
        )));
        let controller = controller_with(device);

        let err = controller.start(ScanPolicy::default()).await.unwrap_err();
        assert!(matches!(err, crate::Error::DeviceUnavailable(_)));
        assert_eq!(
            controller.state(),
            SessionState::Failed(StartFailure::DeviceUnavailable)
        );
    }

    #[tokio::test]
    async fn test_stop_from_failed_clears_to_idle() {
        let device = Arc::new(FakeDevice::failing(AcquireError::DeviceUnavailable(
            "no camera".to_string(),
        )));
        let controller = controller_with(device);

        let _ = controller.start(ScanPolicy::default()).await;
        let state = controller.stop().await.unwrap();
        assert_eq!(state, SessionState::Idle);
    }

    #[tokio::test]
    async fn test_repeated_start_stop_cycles_leak_no_handles() {
        let device = Arc::new(FakeDevice::silent());
        let controller = controller_with(device.clone());

        for _ in 0..3 {
            controller.start(ScanPolicy::default()).await.unwrap();
            controller.stop().await.unwrap();
        }

        assert_eq!(device.acquires.load(Ordering::SeqCst), 3);
        assert_eq!(device.releases.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stop_on_success_winds_down_after_first_admit() {
        let device = Arc::new(FakeDevice::decoding("STU-0042"));
        let controller = controller_with(device.clone());

        controller
            .start(ScanPolicy {
                stop_on_success: true,
            })
            .await
            .unwrap();

        // The device decodes the same payload every frame; only the first
        // is admitted and it stops the session.
        let mut session_rx = controller.feedback().subscribe_session();
        while *session_rx.borrow() != SessionState::Idle {
            session_rx.changed().await.unwrap();
        }

        assert_eq!(device.releases.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_suppression_resets_between_sessions() {
        let device = Arc::new(FakeDevice::decoding("STU-0042"));
        let controller = controller_with(device.clone());

        // First session admits the payload then stops on it
        controller
            .start(ScanPolicy {
                stop_on_success: true,
            })
            .await
            .unwrap();
        let mut session_rx = controller.feedback().subscribe_session();
        while *session_rx.borrow() != SessionState::Idle {
            session_rx.changed().await.unwrap();
        }

        // Second session must admit the same payload again immediately:
        // suppression state does not survive a stop/start cycle
        controller
            .start(ScanPolicy {
                stop_on_success: true,
            })
            .await
            .unwrap();
        let mut session_rx = controller.feedback().subscribe_session();
        while *session_rx.borrow() != SessionState::Idle {
            session_rx.changed().await.unwrap();
        }

        assert_eq!(device.acquires.load(Ordering::SeqCst), 2);
        assert_eq!(device.releases.load(Ordering::SeqCst), 2);
    }
}
