use std::ffi::CString;
use std::io;
use std::mem::size_of;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

use canutils_frame::FilterTable;
use tracing::debug;

use crate::channel::Channel;
use crate::config::{EndpointConfig, CAN_RAW};
use crate::error::{Result, TransportError};

// Values from <linux/can/raw.h>.
const SOL_CAN_BASE: libc::c_int = 100;
const SOL_CAN_RAW: libc::c_int = SOL_CAN_BASE + CAN_RAW;
const CAN_RAW_FILTER: libc::c_int = 1;
const CAN_RAW_LOOPBACK: libc::c_int = 3;
const CAN_RAW_RECV_OWN_MSGS: libc::c_int = 4;

/// Layout of `struct can_filter`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct RawFilter {
    can_id: u32,
    can_mask: u32,
}

/// A raw CAN socket (`PF_CAN`, `SOCK_RAW`, `CAN_RAW` by default).
///
/// The descriptor is closed when the socket is dropped.
#[derive(Debug)]
pub struct CanSocket {
    fd: OwnedFd,
    family: i32,
}

impl CanSocket {
    /// Create the socket described by `config` and apply its options.
    pub fn open(config: &EndpointConfig) -> Result<Self> {
        // SAFETY: plain syscall, no pointers involved.
        let raw = unsafe {
            libc::socket(
                config.family,
                config.socket_type | libc::SOCK_CLOEXEC,
                config.protocol,
            )
        };
        if raw < 0 {
            return Err(TransportError::TransportUnavailable {
                family: config.family,
                socket_type: config.socket_type,
                protocol: config.protocol,
                source: io::Error::last_os_error(),
            });
        }
        // SAFETY: `raw` is a freshly created descriptor that nothing else owns.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        let socket = Self {
            fd,
            family: config.family,
        };

        if let Some(enabled) = config.loopback {
            socket
                .set_int_option(CAN_RAW_LOOPBACK, enabled)
                .map_err(|source| TransportError::SocketOption {
                    option: "CAN_RAW_LOOPBACK",
                    source,
                })?;
        }
        if let Some(enabled) = config.recv_own_msgs {
            socket
                .set_int_option(CAN_RAW_RECV_OWN_MSGS, enabled)
                .map_err(|source| TransportError::SocketOption {
                    option: "CAN_RAW_RECV_OWN_MSGS",
                    source,
                })?;
        }

        debug!(
            family = config.family,
            socket_type = config.socket_type,
            protocol = config.protocol,
            "opened CAN socket"
        );
        Ok(socket)
    }

    fn set_int_option(&self, option: libc::c_int, enabled: bool) -> io::Result<()> {
        let value: libc::c_int = enabled.into();
        self.setsockopt(
            SOL_CAN_RAW,
            option,
            (&value as *const libc::c_int).cast(),
            size_of::<libc::c_int>(),
        )
    }

    fn setsockopt(
        &self,
        level: libc::c_int,
        option: libc::c_int,
        value: *const libc::c_void,
        len: usize,
    ) -> io::Result<()> {
        // SAFETY: callers pass a pointer to `len` readable bytes that outlive
        // the call; the descriptor is owned by `self`.
        let rc = unsafe {
            libc::setsockopt(
                self.fd.as_raw_fd(),
                level,
                option,
                value,
                len as libc::socklen_t,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Channel for CanSocket {
    fn attach(&mut self, interface: &str) -> Result<u32> {
        let unknown = |source: io::Error| TransportError::UnknownInterface {
            interface: interface.to_string(),
            source,
        };
        if interface.is_empty() || interface.len() >= libc::IFNAMSIZ {
            return Err(unknown(io::Error::new(
                io::ErrorKind::InvalidInput,
                "interface name must be 1 to 15 bytes",
            )));
        }
        let name = CString::new(interface)
            .map_err(|err| unknown(io::Error::new(io::ErrorKind::InvalidInput, err)))?;

        // SAFETY: `name` is a valid NUL-terminated string for the call.
        let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
        if index == 0 {
            return Err(unknown(io::Error::last_os_error()));
        }

        // SAFETY: sockaddr_can is plain old data; all-zero is a valid value.
        let mut addr: libc::sockaddr_can = unsafe { std::mem::zeroed() };
        addr.can_family = self.family as libc::sa_family_t;
        addr.can_ifindex = index as libc::c_int;

        // SAFETY: `addr` is a valid sockaddr_can and the length matches it.
        let rc = unsafe {
            libc::bind(
                self.fd.as_raw_fd(),
                (&addr as *const libc::sockaddr_can).cast::<libc::sockaddr>(),
                size_of::<libc::sockaddr_can>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(TransportError::Bind {
                interface: interface.to_string(),
                source: io::Error::last_os_error(),
            });
        }

        Ok(index)
    }

    fn set_filters(&self, filters: &FilterTable) -> io::Result<()> {
        // An empty table maps to the kernel's accept-all filter.
        let raw: Vec<RawFilter> = if filters.is_empty() {
            vec![RawFilter {
                can_id: 0,
                can_mask: 0,
            }]
        } else {
            filters
                .iter()
                .map(|entry| RawFilter {
                    can_id: entry.id,
                    can_mask: entry.mask,
                })
                .collect()
        };
        self.setsockopt(
            SOL_CAN_RAW,
            CAN_RAW_FILTER,
            raw.as_ptr().cast(),
            raw.len() * size_of::<RawFilter>(),
        )
    }

    fn send(&self, buf: &[u8]) -> io::Result<usize> {
        // SAFETY: `buf` is valid for `buf.len()` readable bytes.
        let rc = unsafe { libc::write(self.fd.as_raw_fd(), buf.as_ptr().cast(), buf.len()) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(rc as usize)
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        // SAFETY: `buf` is valid for `buf.len()` writable bytes.
        let rc = unsafe { libc::read(self.fd.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len()) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(rc as usize)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        let timeout = timeout.unwrap_or_default();
        let tv = libc::timeval {
            tv_sec: timeout.as_secs() as libc::time_t,
            tv_usec: timeout.subsec_micros() as libc::suseconds_t,
        };
        self.setsockopt(
            libc::SOL_SOCKET,
            libc::SO_RCVTIMEO,
            (&tv as *const libc::timeval).cast(),
            size_of::<libc::timeval>(),
        )
    }
}

impl AsRawFd for CanSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}
