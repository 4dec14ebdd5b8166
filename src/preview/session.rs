use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::camera::backend::{CaptureBackend, CaptureHandle, FrameSink};
use crate::camera::error::{CameraError, Result};
use crate::camera::types::{CameraDevice, DeviceId};
use crate::diagnostics::stats::{FrameStats, FrameStatsSnapshot};
use crate::preview::filter::{self, DisplayFrame, FilterParams};

/// Single-slot, latest-wins holder for the most recent processed frame.
///
/// Written from the frame-delivery thread, read from command handlers. The
/// lock is held only for the pointer swap, never across processing. Writes
/// land in completion order, not capture order; a late-finishing stale
/// frame may overwrite a newer one, which this design accepts.
pub struct DisplaySlot {
    frame: Mutex<Option<Arc<DisplayFrame>>>,
    sequence: AtomicU64,
}

impl DisplaySlot {
    pub fn new() -> Self {
        Self {
            frame: Mutex::new(None),
            sequence: AtomicU64::new(0),
        }
    }

    /// Replace the displayed frame. The previous one is released.
    pub fn publish(&self, frame: DisplayFrame) {
        *self.frame.lock() = Some(Arc::new(frame));
        self.sequence.fetch_add(1, Ordering::Relaxed);
    }

    /// The most recently published frame, if any.
    ///
    /// Returns a cheap reference-counted pointer rather than copying the
    /// pixel buffer.
    pub fn latest(&self) -> Option<Arc<DisplayFrame>> {
        self.frame.lock().clone()
    }

    /// Monotonic publish counter. Increases by 1 per successful frame.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

impl Default for DisplaySlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Capture session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
}

/// Session status exposed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub selected_device_id: Option<String>,
    pub state: SessionState,
    pub device_active: bool,
    pub disconnected_alert_pending: bool,
}

/// Lifecycle of the single active capture stream: `Idle → Running → Idle`.
///
/// All transitions are explicit method calls so the stop-before-switch rule
/// is auditable in isolation rather than hidden in a setter side effect.
/// Callers serialise access through the managed-state mutex; the only thing
/// touched from other threads is the display slot.
pub struct PreviewSession {
    state: SessionState,
    selected: Option<CameraDevice>,
    handle: Option<Box<dyn CaptureHandle>>,
    device_active: bool,
    disconnect_alert_pending: bool,
    params: FilterParams,
    display: Arc<DisplaySlot>,
    stats: Arc<Mutex<FrameStats>>,
}

impl PreviewSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            selected: None,
            handle: None,
            device_active: false,
            disconnect_alert_pending: false,
            params: FilterParams::default(),
            display: Arc::new(DisplaySlot::new()),
            stats: Arc::new(Mutex::new(FrameStats::new())),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn selected(&self) -> Option<&CameraDevice> {
        self.selected.as_ref()
    }

    pub fn device_active(&self) -> bool {
        self.device_active
    }

    pub fn disconnect_alert_pending(&self) -> bool {
        self.disconnect_alert_pending
    }

    pub fn display(&self) -> &Arc<DisplaySlot> {
        &self.display
    }

    pub fn diagnostics(&self) -> FrameStatsSnapshot {
        self.stats.lock().snapshot()
    }

    /// Change the selected device.
    ///
    /// Switching to a device with a different ID (or clearing the selection)
    /// always stops any running stream before the new selection applies.
    /// Re-selecting the current device is a no-op.
    pub fn select(&mut self, device: Option<CameraDevice>) {
        let current = self.selected.as_ref().map(|d| &d.id);
        if current == device.as_ref().map(|d| &d.id) {
            return;
        }
        self.stop();
        self.selected = device;
    }

    /// Attach the selected device and the frame sink, then transition to
    /// Running. No-op when already Running.
    ///
    /// Fails with `ConfigurationFailed` (session stays Idle, active flag
    /// cleared) when nothing is selected or the backend refuses either
    /// attachment. The caller retries by calling `start` again.
    pub fn start(&mut self, backend: &dyn CaptureBackend) -> Result<()> {
        if self.state == SessionState::Running {
            return Ok(());
        }

        let device = self.selected.clone().ok_or_else(|| {
            self.device_active = false;
            CameraError::ConfigurationFailed("no device selected".into())
        })?;

        *self.stats.lock() = FrameStats::new();

        let display = Arc::clone(&self.display);
        let stats = Arc::clone(&self.stats);
        let params = self.params;
        let sink: FrameSink = Arc::new(move |frame| {
            // Runs on the delivery thread. A frame the processor declines
            // is dropped silently; the next one proceeds independently.
            match filter::process(&frame, params) {
                Some(image) => {
                    display.publish(image);
                    stats.lock().record_processed();
                }
                None => stats.lock().record_dropped(),
            }
        });

        match backend.start_capture(&device.id, sink) {
            Ok(handle) => {
                tracing::info!("preview running on '{}'", device.name);
                self.handle = Some(handle);
                self.state = SessionState::Running;
                self.device_active = true;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("failed to start preview on '{}': {e}", device.name);
                self.device_active = false;
                Err(e)
            }
        }
    }

    /// Detach input and output and return to Idle. Safe to call from any
    /// state; idempotent.
    pub fn stop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
        }
        self.state = SessionState::Idle;
        self.device_active = false;
    }

    /// React to a device disconnect.
    ///
    /// When the vanished device is the selected one: stop, clear the
    /// selection, and raise the one-shot user-visible notice. Returns
    /// whether the session was affected. In-flight frames from the dead
    /// stream either fail the processor's checks or land in the slot as a
    /// stale image; neither is corrected.
    pub fn handle_disconnect(&mut self, id: &DeviceId) -> bool {
        if self.selected.as_ref().map(|d| &d.id) != Some(id) {
            return false;
        }
        tracing::info!("selected device {id} disconnected; stopping preview");
        self.stop();
        self.selected = None;
        self.disconnect_alert_pending = true;
        true
    }

    /// Clear the disconnect notice after the user acknowledged it.
    pub fn acknowledge_disconnect(&mut self) {
        self.disconnect_alert_pending = false;
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            selected_device_id: self.selected.as_ref().map(|d| d.id.to_string()),
            state: self.state,
            device_active: self.device_active,
            disconnected_alert_pending: self.disconnect_alert_pending,
        }
    }
}

impl Default for PreviewSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.stop();
    }
}
