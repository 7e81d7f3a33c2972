use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::bitrate::Bitrate;
use crate::error::{LinkError, Result};
use crate::state::{BusState, ControlMode};

/// Where network interfaces live in sysfs.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/net";

const BITRATE_ATTR: &str = "can_bittiming/bitrate";
const STATE_ATTR: &str = "can_state";
const MODE_ATTR: &str = "can_mode";

/// Get/set access to a CAN interface's configuration.
pub trait LinkConfig {
    /// Current bitrate in bits/s, or `None` when the driver reports it as
    /// unknown. Off-table values are passed through.
    fn bitrate(&self, interface: &str) -> Result<Option<u32>>;

    fn set_bitrate(&self, interface: &str, bitrate: Bitrate) -> Result<()>;

    fn state(&self, interface: &str) -> Result<BusState>;

    fn set_mode(&self, interface: &str, mode: ControlMode) -> Result<()>;

    /// Bitrate and state together.
    fn info(&self, interface: &str) -> Result<LinkInfo> {
        Ok(LinkInfo {
            interface: interface.to_string(),
            bitrate_kbit: self.bitrate(interface)?.map(|bps| bps / 1000),
            state: self.state(interface)?,
        })
    }
}

/// Snapshot of an interface's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkInfo {
    pub interface: String,
    pub bitrate_kbit: Option<u32>,
    pub state: BusState,
}

/// [`LinkConfig`] over `<root>/<interface>/...` attribute files.
#[derive(Debug, Clone)]
pub struct SysfsLink {
    root: PathBuf,
}

impl Default for SysfsLink {
    fn default() -> Self {
        Self::with_root(DEFAULT_SYSFS_ROOT)
    }
}

impl SysfsLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn interface_dir(&self, interface: &str) -> Result<PathBuf> {
        if interface.is_empty() || interface.contains('/') || interface.starts_with('.') {
            return Err(LinkError::UnknownInterface(interface.to_string()));
        }
        let dir = self.root.join(interface);
        if !dir.is_dir() {
            return Err(LinkError::UnknownInterface(interface.to_string()));
        }
        Ok(dir)
    }

    fn read_attr(&self, interface: &str, attr: &str) -> Result<String> {
        let path = self.interface_dir(interface)?.join(attr);
        let value = fs::read_to_string(&path).map_err(|source| LinkError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), value = value.trim(), "read attribute");
        Ok(value.trim().to_string())
    }

    fn write_attr(&self, interface: &str, attr: &str, value: &str) -> Result<()> {
        let path = self.interface_dir(interface)?.join(attr);
        fs::write(&path, format!("{value}\n")).map_err(|source| LinkError::Io {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), value, "wrote attribute");
        Ok(())
    }
}

impl LinkConfig for SysfsLink {
    fn bitrate(&self, interface: &str) -> Result<Option<u32>> {
        let value = match self.read_attr(interface, BITRATE_ATTR) {
            Ok(value) => value,
            Err(LinkError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                return Ok(None)
            }
            Err(err) => return Err(err),
        };
        if value.is_empty() || value == "-1" {
            return Ok(None);
        }
        let bps: u32 = value.parse().map_err(|_| LinkError::Attribute {
            path: self.root.join(interface).join(BITRATE_ATTR),
            value: value.clone(),
        })?;
        Ok(Some(bps))
    }

    fn set_bitrate(&self, interface: &str, bitrate: Bitrate) -> Result<()> {
        self.write_attr(
            interface,
            BITRATE_ATTR,
            &bitrate.bits_per_second().to_string(),
        )
    }

    fn state(&self, interface: &str) -> Result<BusState> {
        match self.read_attr(interface, STATE_ATTR) {
            Ok(value) => Ok(BusState::parse(&value)),
            Err(LinkError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                Ok(BusState::Unknown)
            }
            Err(err) => Err(err),
        }
    }

    fn set_mode(&self, interface: &str, mode: ControlMode) -> Result<()> {
        self.write_attr(interface, MODE_ATTR, mode.as_str())
    }
}
