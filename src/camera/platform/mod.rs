// Platform capture backends, one per OS.

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use linux::V4l2Backend;
