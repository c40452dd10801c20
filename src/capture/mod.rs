//! Capture Device Capability
//!
//! ## Responsibilities
//!
//! - Abstract the host camera + QR decode primitive behind one surface
//! - Exclusive device ownership (one handle at a time)
//! - Portable across underlying camera/decoding libraries
//!
//! The engine never talks to a physical camera directly; everything goes
//! through [`CaptureDevice`]. Tests inject a scripted implementation.

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Opaque handle to an acquired capture device
///
/// Exactly one handle exists per active session. The handle must be given
/// back via [`CaptureDevice::release`] before a stop is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    /// Implementation-defined device identifier
    pub device_id: String,
}

impl DeviceHandle {
    /// Create a handle for the given device id
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
        }
    }
}

/// Device acquisition failure
///
/// Both variants are terminal for the session being started: the caller
/// transitions to `Failed` and must issue a fresh `start()`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AcquireError {
    /// No capture device could be opened
    #[error("no capture device available: {0}")]
    DeviceUnavailable(String),

    /// The platform refused camera access
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),
}

impl From<AcquireError> for Error {
    fn from(e: AcquireError) -> Self {
        match e {
            AcquireError::DeviceUnavailable(msg) => Error::DeviceUnavailable(msg),
            AcquireError::PermissionDenied(msg) => Error::PermissionDenied(msg),
        }
    }
}

/// Camera + decode capability consumed by the engine
///
/// ## Contract
///
/// - `acquire` opens the device; the returned handle is the single owner
///   until `release` is called with it.
/// - `decode_next_frame` samples one frame and attempts a QR decode.
///   `Ok(None)` means no code was visible in the frame, the overwhelmingly
///   common case and not an error. `Err` means the frame itself was
///   malformed; callers log and keep sampling.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Acquire the capture device
    async fn acquire(&self) -> std::result::Result<DeviceHandle, AcquireError>;

    /// Release a previously acquired handle
    async fn release(&self, handle: DeviceHandle);

    /// Sample one frame and attempt decode
    async fn decode_next_frame(&self, handle: &DeviceHandle) -> Result<Option<String>>;
}
