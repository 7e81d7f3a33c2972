/// Errors that can occur while building, encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Fewer bytes than a complete wire frame were supplied.
    #[error("malformed frame ({len} bytes, expected {expected})")]
    MalformedFrame { len: usize, expected: usize },

    /// A filter string could not be parsed.
    #[error("invalid filter \"{spec}\": {reason} (expected id:mask[:id:mask]...)")]
    InvalidFilterSyntax { spec: String, reason: String },

    /// A payload accessor reached past the 8-byte buffer.
    #[error("payload access out of range (offset {offset}, width {width})")]
    PayloadOutOfRange { offset: usize, width: usize },

    /// An I/O error occurred while reading or writing a frame stream.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
