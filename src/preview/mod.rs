// Preview pipeline: session lifecycle, frame filtering, and IPC.

pub mod commands;
pub mod compress;
pub mod filter;
pub mod session;
