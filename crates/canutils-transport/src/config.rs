use std::time::Duration;

/// Protocol family for CAN sockets (`PF_CAN`).
pub const PF_CAN: i32 = 29;

/// Raw CAN protocol (`CAN_RAW`).
pub const CAN_RAW: i32 = 1;

/// `SOCK_RAW`.
pub const SOCK_RAW: i32 = libc::SOCK_RAW;

/// How to create and tune an endpoint's socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Address family passed to `socket(2)`. Default: `PF_CAN`.
    pub family: i32,
    /// Socket type passed to `socket(2)`. Default: `SOCK_RAW`.
    pub socket_type: i32,
    /// Protocol passed to `socket(2)`. Default: `CAN_RAW`.
    pub protocol: i32,
    /// Deliver locally sent frames to other sockets on the host.
    /// `None` keeps the kernel default (enabled).
    pub loopback: Option<bool>,
    /// Deliver this socket's own frames back to it. `None` keeps the
    /// kernel default (disabled).
    pub recv_own_msgs: Option<bool>,
    /// Upper bound on a blocking `receive`. `None` blocks indefinitely.
    pub read_timeout: Option<Duration>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            family: PF_CAN,
            socket_type: SOCK_RAW,
            protocol: CAN_RAW,
            loopback: None,
            recv_own_msgs: None,
            read_timeout: None,
        }
    }
}
