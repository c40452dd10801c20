//! Error handling for the check-in engine

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No capture device could be acquired
    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Platform denied camera access
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
