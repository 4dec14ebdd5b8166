use serde::Serialize;
use std::fmt;

/// Stable camera identifier derived from the platform bus info and card name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a new `DeviceId` from a raw string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build a stable ID from V4L2 `bus_info` and card name.
    ///
    /// Bus info identifies the physical port (e.g. `usb-0000:00:14.0-3`),
    /// which survives re-enumeration across `/dev/video*` index shuffles.
    /// Falls back to a hash of the device path when bus info is empty.
    pub fn from_bus_info(bus_info: &str, card: &str, device_path: &str) -> Self {
        if bus_info.is_empty() {
            let hash = simple_hash(device_path);
            return Self(format!("unknown:{hash:016x}"));
        }
        let card_hash = simple_hash(card);
        Self(format!("{bus_info}:{card_hash:08x}"))
    }

    /// Return the inner string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Simple FNV-1a hash for generating a stable fallback identifier.
fn simple_hash(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in s.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Accepted capture device categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    BuiltIn,
    External,
}

impl DeviceKind {
    /// Classify a device by its bus info. USB-attached cameras count as
    /// external; anything else (platform, PCI, virtual) as built-in.
    pub fn from_bus_info(bus_info: &str) -> Self {
        if bus_info.to_lowercase().starts_with("usb") {
            Self::External
        } else {
            Self::BuiltIn
        }
    }
}

/// Discovered capture device.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraDevice {
    pub id: DeviceId,
    pub name: String,
    pub device_path: String,
    pub kind: DeviceKind,
    pub is_connected: bool,
}

/// Hot-plug event for device connection changes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HotplugEvent {
    Connected(CameraDevice),
    Disconnected { id: DeviceId },
}
