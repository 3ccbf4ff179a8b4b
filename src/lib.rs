//! Background activity monitor. Turns the host's window-change events into per-user screen
//! time, per-application usage and a focus score, and enforces an optional focus mode
//! whitelist through host notifications.
//!

pub mod host;
pub mod monitor;
pub mod storage;
pub mod utils;
