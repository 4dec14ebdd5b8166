use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::camera::backend::{CaptureBackend, CaptureHandle, FrameSink, RawFrame};
use crate::camera::error::{CameraError, Result};
use crate::camera::types::{CameraDevice, DeviceId, DeviceKind, HotplugEvent};

const DUMMY_DEVICE_ID: &str = "dummy:test:camera-001";
const DUMMY_DEVICE_NAME: &str = "Dummy Test Camera";

const FRAME_WIDTH: u32 = 320;
const FRAME_HEIGHT: u32 = 240;
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// A fake capture backend for running the app without real hardware.
///
/// Exposes a single simulated device and delivers a moving RGB gradient at
/// roughly 30 fps from a dedicated thread, matching the delivery discipline
/// of a real backend.
///
/// Enable via `DUMMY_CAMERA=1` environment variable.
pub struct DummyBackend;

impl DummyBackend {
    pub fn new() -> Self {
        Self
    }

    /// Whether the dummy camera is enabled via environment variable.
    pub fn is_enabled() -> bool {
        std::env::var("DUMMY_CAMERA").is_ok_and(|v| v == "1" || v == "true")
    }

    /// The stable device ID for the dummy camera.
    pub fn device_id() -> DeviceId {
        DeviceId::new(DUMMY_DEVICE_ID)
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate one synthetic gradient frame. `tick` shifts the pattern so the
/// preview visibly animates.
fn test_pattern(tick: u32) -> RawFrame {
    let mut data = Vec::with_capacity((FRAME_WIDTH * FRAME_HEIGHT * 3) as usize);
    for y in 0..FRAME_HEIGHT {
        for x in 0..FRAME_WIDTH {
            data.push((x.wrapping_add(tick) % 256) as u8);
            data.push((y.wrapping_add(tick / 2) % 256) as u8);
            data.push((255 - (x % 256)) as u8);
        }
    }
    RawFrame {
        data,
        width: FRAME_WIDTH,
        height: FRAME_HEIGHT,
    }
}

struct DummyHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureHandle for DummyHandle {
    fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DummyHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl CaptureBackend for DummyBackend {
    fn enumerate_devices(&self) -> Result<Vec<CameraDevice>> {
        Ok(vec![CameraDevice {
            id: Self::device_id(),
            name: DUMMY_DEVICE_NAME.to_string(),
            device_path: "dummy://test-camera".to_string(),
            kind: DeviceKind::BuiltIn,
            is_connected: true,
        }])
    }

    fn watch_hotplug(&self, _callback: Box<dyn Fn(HotplugEvent) + Send>) -> Result<()> {
        // Dummy backend does not generate hotplug events
        Ok(())
    }

    fn start_capture(&self, id: &DeviceId, sink: FrameSink) -> Result<Box<dyn CaptureHandle>> {
        if id != &Self::device_id() {
            return Err(CameraError::ConfigurationFailed(format!(
                "no such device: {id}"
            )));
        }

        let running = Arc::new(AtomicBool::new(true));
        let running_thread = Arc::clone(&running);

        let thread = std::thread::Builder::new()
            .name("dummy-capture".to_string())
            .spawn(move || {
                tracing::info!("dummy capture thread starting");
                let mut tick: u32 = 0;
                while running_thread.load(Ordering::Relaxed) {
                    sink(test_pattern(tick));
                    tick = tick.wrapping_add(4);
                    std::thread::sleep(FRAME_INTERVAL);
                }
                tracing::info!("dummy capture thread exiting");
            })
            .map_err(|e| CameraError::ConfigurationFailed(format!("spawn failed: {e}")))?;

        Ok(Box::new(DummyHandle {
            running,
            thread: Some(thread),
        }))
    }
}
