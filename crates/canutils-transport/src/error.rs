use canutils_frame::FrameError;

/// Errors that can occur in endpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The OS refused to create the requested socket.
    #[error(
        "transport unavailable (family {family}, type {socket_type}, protocol {protocol}): {source}"
    )]
    TransportUnavailable {
        family: i32,
        socket_type: i32,
        protocol: i32,
        source: std::io::Error,
    },

    /// The interface name did not resolve to an index.
    #[error("unknown interface {interface}: {source}")]
    UnknownInterface {
        interface: String,
        source: std::io::Error,
    },

    /// The interface resolved but the socket could not be bound to it.
    #[error("failed to bind to {interface}: {source}")]
    Bind {
        interface: String,
        source: std::io::Error,
    },

    /// A socket option could not be applied.
    #[error("failed to set {option}: {source}")]
    SocketOption {
        option: &'static str,
        source: std::io::Error,
    },

    /// The kernel transmit queue is full (`ENOBUFS`). Retryable.
    #[error("no buffer space available")]
    OutOfBuffers,

    /// A blocking call was interrupted by a signal. Retryable.
    #[error("interrupted")]
    Interrupted,

    /// The configured read timeout elapsed without a frame.
    #[error("receive timed out")]
    TimedOut,

    /// Fewer bytes than a full frame were written.
    #[error("short write ({written} of {expected} bytes)")]
    ShortWrite { written: usize, expected: usize },

    /// The channel reported end of stream or a fatal read error.
    #[error("transport closed{}", .source.as_ref().map(|e| format!(": {e}")).unwrap_or_default())]
    TransportClosed { source: Option<std::io::Error> },

    /// `send`/`receive` before `bind`.
    #[error("endpoint is not bound to an interface")]
    NotBound,

    /// `bind` on an endpoint that is already bound.
    #[error("endpoint is already bound to {0}")]
    AlreadyBound(String),

    /// Any operation after `close`.
    #[error("endpoint is closed")]
    Closed,

    /// A received datagram could not be decoded.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Other I/O error on the socket.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether the caller may retry the same operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::OutOfBuffers | Self::Interrupted)
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
