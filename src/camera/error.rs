use thiserror::Error;

/// Camera subsystem errors.
///
/// A dropped frame is deliberately not represented here; the frame
/// processor returns `Option` and the next frame proceeds independently.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("capture authorization not granted")]
    PermissionDenied,

    #[error("session configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("device enumeration failed: {0}")]
    Enumeration(String),

    #[error("hotplug registration failed: {0}")]
    Hotplug(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, CameraError>;
