//! DecodeSource - Continuous Frame Sampling
//!
//! ## Responsibilities
//!
//! - Sample frames from an acquired capture device at a fixed interval
//! - Emit one [`DecodeEvent`] per successful QR decode
//! - Swallow empty frames (no code visible) and malformed-frame errors
//! - Guarantee the device handle is released before the loop task returns
//!
//! The loop runs as a spawned task owned by the session controller. The
//! controller signals shutdown through a watch channel and awaits the
//! task, so "loop returned" implies "handle released".

use crate::capture::{CaptureDevice, DeviceHandle};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::interval;
use uuid::Uuid;

/// One successful frame decode
///
/// Transient: produced here, consumed immediately by the suppression
/// window, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeEvent {
    /// Raw decoded text
    pub payload: String,
    /// When the decode happened
    pub observed_at: DateTime<Utc>,
}

/// DecodeSource instance
pub struct DecodeSource {
    device: Arc<dyn CaptureDevice>,
    sampling_interval: Duration,
}

impl DecodeSource {
    /// Create new DecodeSource
    pub fn new(device: Arc<dyn CaptureDevice>, sampling_interval: Duration) -> Self {
        Self {
            device,
            sampling_interval,
        }
    }

    /// Run the sampling loop until told to stop
    ///
    /// Consumes the handle; releases it on every exit path before
    /// returning. Decode failures on individual frames are logged and do
    /// not end the loop.
    pub async fn run(
        self,
        session_id: Uuid,
        handle: DeviceHandle,
        events: mpsc::Sender<DecodeEvent>,
        mut stop: watch::Receiver<bool>,
    ) {
        let mut ticker = interval(self.sampling_interval);

        tracing::info!(
            session_id = %session_id,
            device_id = %handle.device_id,
            "Decode loop started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                    continue;
                }
            }

            match self.device.decode_next_frame(&handle).await {
                Ok(Some(payload)) => {
                    let event = DecodeEvent {
                        payload,
                        observed_at: Utc::now(),
                    };
                    tracing::debug!(
                        session_id = %session_id,
                        payload = %event.payload,
                        "Frame decoded"
                    );
                    if events.send(event).await.is_err() {
                        // Consumer gone, session is winding down
                        break;
                    }
                }
                Ok(None) => {
                    // No code in frame, keep sampling
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %session_id,
                        error = %e,
                        "Frame decode failed, continuing"
                    );
                }
            }
        }

        self.device.release(handle).await;

        tracing::info!(session_id = %session_id, "Decode loop stopped, device released");
    }
}
