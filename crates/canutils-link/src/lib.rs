//! CAN interface configuration.
//!
//! Reads and writes per-interface attributes (bitrate, bus state, control
//! mode). This is independent of frame transport: nothing in
//! `canutils-transport` calls into it.

pub mod bitrate;
pub mod error;
pub mod state;
pub mod sysfs;

pub use bitrate::Bitrate;
pub use error::{LinkError, Result};
pub use state::{BusState, ControlMode};
pub use sysfs::{LinkConfig, LinkInfo, SysfsLink, DEFAULT_SYSFS_ROOT};
