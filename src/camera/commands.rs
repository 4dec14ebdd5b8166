use std::sync::Arc;

use parking_lot::Mutex;
use tauri::State;

use crate::camera::backend::CaptureBackend;
use crate::camera::registry::DeviceRegistry;
use crate::camera::types::CameraDevice;

/// Shared camera state managed by Tauri.
///
/// The backend is behind an `Arc` because capture threads and the hotplug
/// watcher outlive individual command invocations.
pub struct CameraState {
    pub backend: Arc<dyn CaptureBackend>,
    pub registry: Mutex<DeviceRegistry>,
}

impl CameraState {
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            registry: Mutex::new(DeviceRegistry::new()),
        }
    }
}

/// List all connected cameras, refreshing the registry from the platform.
#[tauri::command]
pub async fn list_cameras(state: State<'_, CameraState>) -> Result<Vec<CameraDevice>, String> {
    let mut registry = state.registry.lock();
    Ok(registry.refresh(state.backend.as_ref()).to_vec())
}
