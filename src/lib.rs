mod camera;
mod diagnostics;
mod preview;

use std::sync::Arc;

use camera::commands::{list_cameras, CameraState};
use camera::hotplug_bridge::start_hotplug_watcher;
use preview::commands::{
    acknowledge_disconnect, get_diagnostics, get_frame, get_status, select_camera, start_preview,
    stop_preview, PreviewState,
};

/// Create the capture backend for the current platform.
///
/// When `DUMMY_CAMERA=1` is set, a simulated camera is used instead.
fn create_camera_state() -> CameraState {
    if camera::dummy::DummyBackend::is_enabled() {
        return CameraState::new(Arc::new(camera::dummy::DummyBackend::new()));
    }

    #[cfg(target_os = "linux")]
    {
        CameraState::new(Arc::new(camera::platform::V4l2Backend::new()))
    }

    #[cfg(not(target_os = "linux"))]
    {
        CameraState::new(Arc::new(NullBackend))
    }
}

/// No-op backend used on platforms without a native capture backend.
#[cfg(not(target_os = "linux"))]
struct NullBackend;

#[cfg(not(target_os = "linux"))]
impl camera::backend::CaptureBackend for NullBackend {
    fn enumerate_devices(&self) -> camera::error::Result<Vec<camera::types::CameraDevice>> {
        Ok(vec![])
    }

    fn watch_hotplug(
        &self,
        _callback: Box<dyn Fn(camera::types::HotplugEvent) + Send>,
    ) -> camera::error::Result<()> {
        Ok(())
    }

    fn start_capture(
        &self,
        id: &camera::types::DeviceId,
        _sink: camera::backend::FrameSink,
    ) -> camera::error::Result<Box<dyn camera::backend::CaptureHandle>> {
        Err(camera::error::CameraError::ConfigurationFailed(format!(
            "no capture backend on this platform: {id}"
        )))
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|_app, _args, _cwd| {}))
        .manage(create_camera_state())
        .manage(PreviewState::new())
        .invoke_handler(tauri::generate_handler![
            list_cameras,
            select_camera,
            start_preview,
            stop_preview,
            get_frame,
            get_status,
            acknowledge_disconnect,
            get_diagnostics,
        ])
        .setup(|app| {
            use tauri::Manager;

            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::new()
                        .targets([
                            tauri_plugin_log::Target::new(tauri_plugin_log::TargetKind::Stdout),
                            tauri_plugin_log::Target::new(tauri_plugin_log::TargetKind::Webview),
                        ])
                        .level(log::LevelFilter::Debug)
                        .build(),
                )?;
            }

            let camera_state = app.state::<CameraState>();
            let devices = camera_state
                .registry
                .lock()
                .refresh(camera_state.backend.as_ref())
                .to_vec();
            tracing::info!("found {} capture device(s) at startup", devices.len());

            start_hotplug_watcher(app.handle(), camera_state.backend.as_ref());

            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
