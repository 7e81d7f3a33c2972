use std::io;
use std::time::Duration;

use canutils_frame::{decode_frame, FilterTable, Frame, FRAME_SIZE};
use tracing::{debug, info, trace};

use crate::channel::Channel;
use crate::config::EndpointConfig;
use crate::error::{Result, TransportError};

/// Large enough for a CAN FD record; anything past [`FRAME_SIZE`] is ignored.
const RECV_BUFFER_SIZE: usize = 72;

/// Lifecycle of an [`Endpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Channel open, not yet associated with an interface.
    Created,
    /// Associated with an interface; frames may be exchanged.
    Bound,
    /// Channel released.
    Closed,
}

/// One open channel bound to one named interface.
///
/// `send`, `receive` and `install_filters` are only valid once bound;
/// calling them earlier returns [`TransportError::NotBound`]. After
/// [`close`](Endpoint::close) every operation returns
/// [`TransportError::Closed`].
#[derive(Debug)]
pub struct Endpoint<C: Channel> {
    channel: Option<C>,
    state: EndpointState,
    interface: Option<String>,
    ifindex: u32,
    filters: FilterTable,
}

#[cfg(target_os = "linux")]
impl Endpoint<crate::socket::CanSocket> {
    /// Create a raw CAN socket as described by `config`.
    pub fn open(config: &EndpointConfig) -> Result<Self> {
        let socket = crate::socket::CanSocket::open(config)?;
        Self::with_channel(socket, config)
    }
}

impl<C: Channel> Endpoint<C> {
    /// Wrap an already created channel. The endpoint starts `Created`.
    pub fn with_channel(channel: C, config: &EndpointConfig) -> Result<Self> {
        if config.read_timeout.is_some() {
            channel
                .set_read_timeout(config.read_timeout)
                .map_err(|source| TransportError::SocketOption {
                    option: "SO_RCVTIMEO",
                    source,
                })?;
        }
        Ok(Self {
            channel: Some(channel),
            state: EndpointState::Created,
            interface: None,
            ifindex: 0,
            filters: FilterTable::accept_all(),
        })
    }

    /// Resolve `interface` and associate the channel with it.
    ///
    /// After binding, every frame the installed filter table accepts is
    /// delivered (all frames by default).
    pub fn bind(&mut self, interface: &str) -> Result<()> {
        match self.state {
            EndpointState::Created => {}
            EndpointState::Bound => {
                return Err(TransportError::AlreadyBound(
                    self.interface.clone().unwrap_or_default(),
                ))
            }
            EndpointState::Closed => return Err(TransportError::Closed),
        }
        let channel = self.channel.as_mut().ok_or(TransportError::Closed)?;
        let ifindex = channel.attach(interface)?;

        info!(interface, ifindex, "bound endpoint");
        self.interface = Some(interface.to_string());
        self.ifindex = ifindex;
        self.state = EndpointState::Bound;
        Ok(())
    }

    /// Replace the installed filter table in one step.
    ///
    /// An empty table restores accept-all.
    pub fn install_filters(&mut self, filters: FilterTable) -> Result<()> {
        let channel = self.bound_channel()?;
        channel
            .set_filters(&filters)
            .map_err(|source| TransportError::SocketOption {
                option: "CAN_RAW_FILTER",
                source,
            })?;
        for entry in &filters {
            debug!(%entry, "installed filter");
        }
        self.filters = filters;
        Ok(())
    }

    /// Encode and write one frame.
    ///
    /// Backpressure surfaces as [`TransportError::OutOfBuffers`] or
    /// [`TransportError::Interrupted`]; retrying is up to the caller.
    pub fn send(&mut self, frame: &Frame) -> Result<()> {
        let channel = self.bound_channel()?;
        let wire = frame.encode();
        let written = channel.send(&wire).map_err(map_send_error)?;
        if written != FRAME_SIZE {
            return Err(TransportError::ShortWrite {
                written,
                expected: FRAME_SIZE,
            });
        }
        trace!(%frame, "sent frame");
        Ok(())
    }

    /// Block until one accepted frame arrives.
    ///
    /// Frames rejected by the installed filter table are skipped.
    pub fn receive(&mut self) -> Result<Frame> {
        let channel = self.bound_channel()?;
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        loop {
            let n = match channel.recv(&mut buf) {
                Ok(0) => return Err(TransportError::TransportClosed { source: None }),
                Ok(n) => n,
                Err(err) => return Err(map_recv_error(err)),
            };
            let frame = decode_frame(&buf[..n])?;
            if self.filters.accepts(&frame) {
                trace!(%frame, "received frame");
                return Ok(frame);
            }
            trace!(%frame, "frame rejected by filter table");
        }
    }

    /// Wait up to `timeout` for the channel to accept a write.
    pub fn wait_writable(&self, timeout: Duration) -> Result<bool> {
        Ok(self.bound_channel()?.wait_writable(timeout)?)
    }

    /// Release the channel. Calling this more than once is a no-op.
    pub fn close(&mut self) {
        if self.channel.take().is_some() {
            debug!(interface = ?self.interface, "closed endpoint");
        }
        self.state = EndpointState::Closed;
    }

    pub fn state(&self) -> EndpointState {
        self.state
    }

    /// Interface name, once bound.
    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    /// Kernel interface index, once bound (0 before).
    pub fn ifindex(&self) -> u32 {
        self.ifindex
    }

    pub fn filters(&self) -> &FilterTable {
        &self.filters
    }

    fn bound_channel(&self) -> Result<&C> {
        match self.state {
            EndpointState::Created => Err(TransportError::NotBound),
            EndpointState::Closed => Err(TransportError::Closed),
            EndpointState::Bound => self.channel.as_ref().ok_or(TransportError::Closed),
        }
    }
}

fn map_send_error(err: io::Error) -> TransportError {
    if err.raw_os_error() == Some(libc::ENOBUFS) {
        return TransportError::OutOfBuffers;
    }
    match err.kind() {
        io::ErrorKind::Interrupted => TransportError::Interrupted,
        _ => TransportError::Io(err),
    }
}

fn map_recv_error(err: io::Error) -> TransportError {
    match err.kind() {
        io::ErrorKind::Interrupted => TransportError::Interrupted,
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::TimedOut,
        _ => TransportError::TransportClosed { source: Some(err) },
    }
}
