use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

use crate::camera::backend::{CaptureBackend, CaptureHandle, FrameSink, RawFrame};
use crate::camera::error::{CameraError, Result};
use crate::camera::types::{CameraDevice, DeviceId, DeviceKind, HotplugEvent};

/// Preferred capture resolution. The driver may negotiate something else;
/// the actual format is always read back after `set_format`.
const PREVIEW_WIDTH: u32 = 640;
const PREVIEW_HEIGHT: u32 = 480;

/// Polling interval for the hotplug watcher thread.
const HOTPLUG_POLL: Duration = Duration::from_secs(1);

/// How long `start_capture` waits for the capture thread to report whether
/// the device and stream attached.
const ATTACH_TIMEOUT: Duration = Duration::from_secs(5);

/// V4L2 capture backend.
///
/// Enumerates `/dev/video*` nodes, filters to ones that expose video
/// capture formats (UVC metadata nodes are skipped), and streams frames
/// via a memory-mapped buffer queue on a dedicated thread. Hot-plug
/// detection is a 1 s enumeration diff; V4L2 has no notification API
/// short of udev, and polling keeps the backend dependency-free.
pub struct V4l2Backend;

impl V4l2Backend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for V4l2Backend {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan `/dev` for video nodes, sorted by index for a stable order.
fn video_nodes() -> std::io::Result<Vec<PathBuf>> {
    let mut nodes: Vec<(u32, PathBuf)> = std::fs::read_dir("/dev")?
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            let name = path.file_name()?.to_str()?;
            let index: u32 = name.strip_prefix("video")?.parse().ok()?;
            Some((index, path))
        })
        .collect();
    nodes.sort_by_key(|(index, _)| *index);
    Ok(nodes.into_iter().map(|(_, path)| path).collect())
}

/// Probe one node: open, query caps, and require at least one capture
/// format. Returns `Ok(None)` for nodes that are not capture devices
/// (e.g. UVC metadata nodes) and the io error for nodes we cannot open.
fn probe_node(path: &Path) -> std::io::Result<Option<CameraDevice>> {
    let dev = Device::with_path(path)?;
    let caps = dev.query_caps()?;

    let formats = dev.enum_formats().unwrap_or_default();
    if formats.is_empty() {
        return Ok(None);
    }

    let path_str = path.to_string_lossy().to_string();
    Ok(Some(CameraDevice {
        id: DeviceId::from_bus_info(&caps.bus, &caps.card, &path_str),
        name: caps.card.clone(),
        device_path: path_str,
        kind: DeviceKind::from_bus_info(&caps.bus),
        is_connected: true,
    }))
}

fn enumerate() -> Result<Vec<CameraDevice>> {
    let nodes = video_nodes().map_err(|e| CameraError::Enumeration(e.to_string()))?;
    let mut devices: Vec<CameraDevice> = Vec::new();
    let mut denied = 0usize;
    let mut probed = 0usize;

    for path in &nodes {
        probed += 1;
        match probe_node(path) {
            Ok(Some(device)) => {
                // A physical camera exposes several nodes; keep the first.
                if !devices.iter().any(|d| d.id == device.id) {
                    devices.push(device);
                }
            }
            Ok(None) => {}
            Err(e) if e.kind() == ErrorKind::PermissionDenied => denied += 1,
            Err(e) => {
                tracing::debug!("skipping {}: {e}", path.display());
            }
        }
    }

    if probed > 0 && denied == probed {
        return Err(CameraError::PermissionDenied);
    }
    Ok(devices)
}

/// Preferred pixel formats, best first. RGB3 needs no conversion, YUYV is
/// what most UVC cameras actually deliver, MJPG is the bandwidth fallback.
const FOURCC_PRIORITY: [&[u8; 4]; 3] = [b"RGB3", b"YUYV", b"MJPG"];

fn negotiate_format(dev: &Device) -> std::result::Result<Format, String> {
    for fourcc in FOURCC_PRIORITY {
        let wanted = FourCC::new(fourcc);
        let request = Format::new(PREVIEW_WIDTH, PREVIEW_HEIGHT, wanted);
        match dev.set_format(&request) {
            Ok(actual) if actual.fourcc == wanted => return Ok(actual),
            Ok(_) | Err(_) => continue,
        }
    }
    Err("no supported pixel format (tried RGB3, YUYV, MJPG)".to_string())
}

/// Convert one captured buffer to tightly packed RGB24.
fn to_rgb24(buf: &[u8], format: &Format) -> Option<RawFrame> {
    let width = format.width;
    let height = format.height;

    if format.fourcc == FourCC::new(b"RGB3") {
        let expected = (width as usize).checked_mul(height as usize)?.checked_mul(3)?;
        if buf.len() < expected {
            return None;
        }
        return Some(RawFrame {
            data: buf[..expected].to_vec(),
            width,
            height,
        });
    }

    if format.fourcc == FourCC::new(b"YUYV") {
        return yuyv_to_rgb(buf, width, height);
    }

    if format.fourcc == FourCC::new(b"MJPG") {
        let decoded = image::load_from_memory_with_format(buf, image::ImageFormat::Jpeg).ok()?;
        let rgb = decoded.to_rgb8();
        let (w, h) = rgb.dimensions();
        return Some(RawFrame {
            data: rgb.into_raw(),
            width: w,
            height: h,
        });
    }

    None
}

/// YUYV 4:2:2 to RGB24, BT.601 full range.
fn yuyv_to_rgb(buf: &[u8], width: u32, height: u32) -> Option<RawFrame> {
    let expected = (width as usize).checked_mul(height as usize)?.checked_mul(2)?;
    if buf.len() < expected || width % 2 != 0 {
        return None;
    }

    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for chunk in buf[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (
            f32::from(chunk[0]),
            f32::from(chunk[1]) - 128.0,
            f32::from(chunk[2]),
            f32::from(chunk[3]) - 128.0,
        );
        for y in [y0, y1] {
            data.push((y + 1.402 * v).clamp(0.0, 255.0) as u8);
            data.push((y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8);
            data.push((y + 1.772 * u).clamp(0.0, 255.0) as u8);
        }
    }
    Some(RawFrame {
        data,
        width,
        height,
    })
}

struct V4l2Handle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureHandle for V4l2Handle {
    fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for V4l2Handle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Open the device, negotiate a format, and run the delivery loop. The
/// attach outcome is reported once over `ready` so `start_capture` can
/// fail synchronously.
fn run_capture(
    device_path: String,
    sink: FrameSink,
    running: Arc<AtomicBool>,
    ready: mpsc::Sender<std::result::Result<(), String>>,
) {
    let dev = match Device::with_path(&device_path) {
        Ok(dev) => dev,
        Err(e) => {
            let _ = ready.send(Err(format!("open {device_path}: {e}")));
            return;
        }
    };

    let format = match negotiate_format(&dev) {
        Ok(format) => format,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let mut stream = match Stream::with_buffers(&dev, Type::VideoCapture, 4) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(format!("stream attach: {e}")));
            return;
        }
    };

    let _ = ready.send(Ok(()));
    tracing::info!(
        path = %device_path,
        width = format.width,
        height = format.height,
        fourcc = ?format.fourcc,
        "capture loop started"
    );

    while running.load(Ordering::Relaxed) {
        let buf = match stream.next() {
            Ok((buf, _meta)) => buf,
            Err(e) => {
                // Device likely vanished mid-stream; hotplug polling will
                // notice and the session will be torn down.
                tracing::warn!("frame dequeue failed: {e}");
                break;
            }
        };

        if let Some(frame) = to_rgb24(buf, &format) {
            sink(frame);
        }
    }

    tracing::info!(path = %device_path, "capture loop exiting");
}

impl CaptureBackend for V4l2Backend {
    fn enumerate_devices(&self) -> Result<Vec<CameraDevice>> {
        enumerate()
    }

    fn watch_hotplug(&self, callback: Box<dyn Fn(HotplugEvent) + Send>) -> Result<()> {
        // The watcher thread is detached; it lives for the process lifetime.
        std::thread::Builder::new()
            .name("v4l2-hotplug".to_string())
            .spawn(move || {
                let mut known = enumerate().unwrap_or_default();
                loop {
                    std::thread::sleep(HOTPLUG_POLL);
                    let current = enumerate().unwrap_or_default();

                    for device in &current {
                        if !known.iter().any(|d| d.id == device.id) {
                            callback(HotplugEvent::Connected(device.clone()));
                        }
                    }
                    for device in &known {
                        if !current.iter().any(|d| d.id == device.id) {
                            callback(HotplugEvent::Disconnected {
                                id: device.id.clone(),
                            });
                        }
                    }
                    known = current;
                }
            })
            .map(|_| ())
            .map_err(|e| CameraError::Hotplug(e.to_string()))
    }

    fn start_capture(&self, id: &DeviceId, sink: FrameSink) -> Result<Box<dyn CaptureHandle>> {
        let devices = enumerate()?;
        let device = devices
            .iter()
            .find(|d| &d.id == id)
            .ok_or_else(|| CameraError::ConfigurationFailed(format!("no such device: {id}")))?;

        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = {
            let device_path = device.device_path.clone();
            let running = Arc::clone(&running);
            std::thread::Builder::new()
                .name(format!("capture-{}", device_path.replace("/dev/", "")))
                .spawn(move || run_capture(device_path, sink, running, ready_tx))
                .map_err(|e| CameraError::ConfigurationFailed(format!("spawn failed: {e}")))?
        };

        let mut handle = V4l2Handle {
            running,
            thread: Some(thread),
        };

        match ready_rx.recv_timeout(ATTACH_TIMEOUT) {
            Ok(Ok(())) => Ok(Box::new(handle)),
            Ok(Err(e)) => {
                handle.stop();
                Err(CameraError::ConfigurationFailed(e))
            }
            Err(_) => {
                handle.stop();
                Err(CameraError::ConfigurationFailed(
                    "timed out attaching capture stream".into(),
                ))
            }
        }
    }
}
