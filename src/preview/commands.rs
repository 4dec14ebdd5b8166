use base64::Engine;
use parking_lot::Mutex;
use serde::Serialize;
use tauri::State;

use crate::camera::commands::CameraState;
use crate::camera::error::CameraError;
use crate::camera::types::DeviceId;
use crate::diagnostics::stats::FrameStatsSnapshot;
use crate::preview::compress;
use crate::preview::session::{PreviewSession, SessionStatus};

/// JPEG quality for preview frames sent to the frontend.
const PREVIEW_JPEG_QUALITY: u8 = 85;

/// Managed state holding the single preview session.
pub struct PreviewState {
    pub session: Mutex<PreviewSession>,
}

impl PreviewState {
    pub fn new() -> Self {
        Self {
            session: Mutex::new(PreviewSession::new()),
        }
    }
}

impl Default for PreviewState {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the presentation layer reads in one payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    #[serde(flatten)]
    pub session: SessionStatus,
    pub permission_denied: bool,
}

/// Change the selected camera. `None` clears the selection; switching to a
/// different device stops any running preview first.
#[tauri::command]
pub async fn select_camera(
    state: State<'_, PreviewState>,
    camera_state: State<'_, CameraState>,
    device_id: Option<String>,
) -> Result<(), String> {
    let device = match device_id {
        Some(raw) => {
            let id = DeviceId::new(raw);
            let registry = camera_state.registry.lock();
            let device = registry
                .find(&id)
                .cloned()
                .ok_or_else(|| CameraError::DeviceNotFound(id.to_string()).to_string())?;
            Some(device)
        }
        None => None,
    };

    state.session.lock().select(device);
    Ok(())
}

/// Start the preview on the selected camera.
#[tauri::command]
pub async fn start_preview(
    state: State<'_, PreviewState>,
    camera_state: State<'_, CameraState>,
) -> Result<(), String> {
    state
        .session
        .lock()
        .start(camera_state.backend.as_ref())
        .map_err(|e| e.to_string())
}

/// Stop the preview. Idempotent.
#[tauri::command]
pub async fn stop_preview(state: State<'_, PreviewState>) -> Result<(), String> {
    state.session.lock().stop();
    Ok(())
}

/// Get the latest filtered frame as base64-encoded JPEG.
#[tauri::command]
pub async fn get_frame(state: State<'_, PreviewState>) -> Result<String, String> {
    let frame = state
        .session
        .lock()
        .display()
        .latest()
        .ok_or_else(|| "no frame available".to_string())?;

    let jpeg = compress::compress_jpeg(&frame.data, frame.width, frame.height, PREVIEW_JPEG_QUALITY)
        .ok_or_else(|| "frame encoding failed".to_string())?;
    Ok(base64::engine::general_purpose::STANDARD.encode(&jpeg))
}

/// Current session status plus the registry's permission flag.
#[tauri::command]
pub async fn get_status(
    state: State<'_, PreviewState>,
    camera_state: State<'_, CameraState>,
) -> Result<StatusPayload, String> {
    Ok(StatusPayload {
        session: state.session.lock().status(),
        permission_denied: camera_state.registry.lock().permission_denied(),
    })
}

/// Clear the one-shot disconnect notice.
#[tauri::command]
pub async fn acknowledge_disconnect(state: State<'_, PreviewState>) -> Result<(), String> {
    state.session.lock().acknowledge_disconnect();
    Ok(())
}

/// Frame pipeline counters for the current session.
#[tauri::command]
pub async fn get_diagnostics(
    state: State<'_, PreviewState>,
) -> Result<FrameStatsSnapshot, String> {
    Ok(state.session.lock().diagnostics())
}
