use std::sync::Arc;

use crate::camera::error::Result;
use crate::camera::types::{CameraDevice, DeviceId, HotplugEvent};

/// A single raw frame delivered by a capture backend.
///
/// Pixel data is tightly packed RGB24. Ownership transfers to the sink for
/// the duration of processing only; backends never retain a reference.
pub struct RawFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Callback receiving raw frames on the backend's delivery thread.
pub type FrameSink = Arc<dyn Fn(RawFrame) + Send + Sync>;

/// Handle to a running capture stream. Dropping without calling `stop`
/// must not leak the capture thread; `stop` blocks until delivery ceases.
pub trait CaptureHandle: Send {
    /// Stop frame delivery. Idempotent.
    fn stop(&mut self);
}

/// Platform-agnostic capture backend trait.
///
/// Implemented per-platform (V4L2 on Linux) plus a simulated backend for
/// development without hardware. Provides device enumeration, hot-plug
/// detection, and stream attachment.
pub trait CaptureBackend: Send + Sync {
    /// Enumerate all currently connected capture devices, in the order the
    /// platform reports them.
    ///
    /// Returns `CameraError::PermissionDenied` when capture authorization
    /// is not granted.
    fn enumerate_devices(&self) -> Result<Vec<CameraDevice>>;

    /// Register for hot-plug notifications.
    ///
    /// The callback fires on the backend's internal thread when a device is
    /// connected or disconnected.
    fn watch_hotplug(&self, callback: Box<dyn Fn(HotplugEvent) + Send>) -> Result<()>;

    /// Attach the device input and the frame sink, start streaming, and
    /// return a handle controlling the stream's lifetime.
    ///
    /// Any attach refusal (device busy, unsupported format, vanished device)
    /// is reported as `CameraError::ConfigurationFailed` and leaves nothing
    /// attached.
    fn start_capture(&self, id: &DeviceId, sink: FrameSink) -> Result<Box<dyn CaptureHandle>>;
}
