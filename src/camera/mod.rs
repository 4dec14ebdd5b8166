// Camera domain: discovery, hotplug, and stream attachment.

pub mod backend;
pub mod commands;
pub mod dummy;
pub mod error;
pub mod hotplug_bridge;
pub mod platform;
pub mod registry;
pub mod types;
