use crate::camera::backend::CaptureBackend;
use crate::camera::error::CameraError;
use crate::camera::types::{CameraDevice, DeviceId};

/// Current set of eligible capture devices, rebuilt from the platform on
/// every change. Keyed by stable device ID, kept in platform-reported order.
///
/// Holds no platform resources itself; a refresh simply re-runs the
/// backend's enumeration and replaces the whole set.
pub struct DeviceRegistry {
    devices: Vec<CameraDevice>,
    permission_denied: bool,
    permission_warned: bool,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            permission_denied: false,
            permission_warned: false,
        }
    }

    /// Re-enumerate devices and replace the current set.
    ///
    /// A `PermissionDenied` result yields an empty set; the condition is
    /// logged once and never retried automatically. The user must grant
    /// access externally and trigger a refresh themselves. Other enumeration
    /// failures also empty the set but are logged on every occurrence.
    pub fn refresh(&mut self, backend: &dyn CaptureBackend) -> &[CameraDevice] {
        match backend.enumerate_devices() {
            Ok(devices) => {
                tracing::debug!("enumerated {} capture device(s)", devices.len());
                self.devices = devices;
                self.permission_denied = false;
            }
            Err(CameraError::PermissionDenied) => {
                if self.first_permission_denial() {
                    tracing::warn!("capture authorization not granted; device list stays empty");
                }
                self.devices.clear();
                self.permission_denied = true;
            }
            Err(e) => {
                tracing::warn!("device enumeration failed: {e}");
                self.devices.clear();
            }
        }
        &self.devices
    }

    /// Devices from the most recent refresh, in platform order.
    pub fn devices(&self) -> &[CameraDevice] {
        &self.devices
    }

    /// Look up a device by ID.
    pub fn find(&self, id: &DeviceId) -> Option<&CameraDevice> {
        self.devices.iter().find(|d| &d.id == id)
    }

    /// Whether the last refresh was refused for lack of authorization.
    pub fn permission_denied(&self) -> bool {
        self.permission_denied
    }

    /// One-shot gate for the permission warning. True on the first denial,
    /// false on every later one.
    fn first_permission_denial(&mut self) -> bool {
        !std::mem::replace(&mut self.permission_warned, true)
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::backend::{CaptureHandle, FrameSink};
    use crate::camera::error::Result;
    use crate::camera::types::{DeviceKind, HotplugEvent};
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behaviour {
        Devices(Vec<CameraDevice>),
        Denied,
        Broken,
    }

    struct FakeBackend {
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl FakeBackend {
        fn new(behaviour: Behaviour) -> Self {
            Self {
                behaviour,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl CaptureBackend for FakeBackend {
        fn enumerate_devices(&self) -> Result<Vec<CameraDevice>> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            match &self.behaviour {
                Behaviour::Devices(devices) => Ok(devices.clone()),
                Behaviour::Denied => Err(CameraError::PermissionDenied),
                Behaviour::Broken => Err(CameraError::Enumeration("ioctl failed".into())),
            }
        }

        fn watch_hotplug(&self, _callback: Box<dyn Fn(HotplugEvent) + Send>) -> Result<()> {
            Ok(())
        }

        fn start_capture(
            &self,
            id: &DeviceId,
            _sink: FrameSink,
        ) -> Result<Box<dyn CaptureHandle>> {
            Err(CameraError::ConfigurationFailed(id.to_string()))
        }
    }

    fn cam(id: &str, name: &str) -> CameraDevice {
        CameraDevice {
            id: DeviceId::new(id),
            name: name.to_string(),
            device_path: format!("/dev/{id}"),
            kind: DeviceKind::External,
            is_connected: true,
        }
    }

    #[test]
    fn refresh_preserves_platform_order() {
        let backend = FakeBackend::new(Behaviour::Devices(vec![
            cam("cam-b", "Cam B"),
            cam("cam-a", "Cam A"),
        ]));
        let mut registry = DeviceRegistry::new();
        let devices = registry.refresh(&backend);
        assert_eq!(devices[0].name, "Cam B");
        assert_eq!(devices[1].name, "Cam A");
    }

    #[test]
    fn refresh_replaces_previous_set() {
        let mut registry = DeviceRegistry::new();
        registry.refresh(&FakeBackend::new(Behaviour::Devices(vec![
            cam("cam-a", "Cam A"),
            cam("cam-b", "Cam B"),
        ])));
        registry.refresh(&FakeBackend::new(Behaviour::Devices(vec![cam(
            "cam-b", "Cam B",
        )])));
        assert_eq!(registry.devices().len(), 1);
        assert!(registry.find(&DeviceId::new("cam-a")).is_none());
        assert!(registry.find(&DeviceId::new("cam-b")).is_some());
    }

    #[test]
    fn permission_denied_yields_empty_set_and_flag() {
        let backend = FakeBackend::new(Behaviour::Denied);
        let mut registry = DeviceRegistry::new();
        registry.refresh(&backend);
        assert!(registry.devices().is_empty());
        assert!(registry.permission_denied());
    }

    #[test]
    fn permission_denied_is_not_retried_by_refresh_itself() {
        // Each refresh call is caller-initiated; the registry never loops.
        let backend = FakeBackend::new(Behaviour::Denied);
        let mut registry = DeviceRegistry::new();
        registry.refresh(&backend);
        registry.refresh(&backend);
        assert_eq!(backend.calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn permission_denial_warns_exactly_once() {
        let mut registry = DeviceRegistry::new();
        assert!(registry.first_permission_denial());
        assert!(!registry.first_permission_denial());
        assert!(!registry.first_permission_denial());
    }

    #[test]
    fn denied_refresh_consumes_the_one_shot_warning() {
        let backend = FakeBackend::new(Behaviour::Denied);
        let mut registry = DeviceRegistry::new();
        registry.refresh(&backend);
        // The warning fired during the first refresh; later denials stay
        // silent.
        assert!(!registry.first_permission_denial());
    }

    #[test]
    fn permission_flag_clears_after_successful_refresh() {
        let mut registry = DeviceRegistry::new();
        registry.refresh(&FakeBackend::new(Behaviour::Denied));
        assert!(registry.permission_denied());
        registry.refresh(&FakeBackend::new(Behaviour::Devices(vec![cam(
            "cam-a", "Cam A",
        )])));
        assert!(!registry.permission_denied());
        assert_eq!(registry.devices().len(), 1);
    }

    #[test]
    fn enumeration_failure_empties_set_without_permission_flag() {
        let mut registry = DeviceRegistry::new();
        registry.refresh(&FakeBackend::new(Behaviour::Devices(vec![cam(
            "cam-a", "Cam A",
        )])));
        registry.refresh(&FakeBackend::new(Behaviour::Broken));
        assert!(registry.devices().is_empty());
        assert!(!registry.permission_denied());
    }

    #[test]
    fn find_matches_by_id() {
        let mut registry = DeviceRegistry::new();
        registry.refresh(&FakeBackend::new(Behaviour::Devices(vec![
            cam("cam-a", "Cam A"),
            cam("cam-b", "Cam B"),
        ])));
        assert_eq!(
            registry.find(&DeviceId::new("cam-b")).map(|d| d.name.as_str()),
            Some("Cam B")
        );
        assert!(registry.find(&DeviceId::new("cam-z")).is_none());
    }
}
