use std::path::PathBuf;

/// Errors that can occur reading or writing interface attributes.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// No attribute directory exists for the interface.
    #[error("unknown interface {0}")]
    UnknownInterface(String),

    /// The requested bitrate is not in the supported table.
    #[error("invalid baudrate {0} (expected one of 10, 20, 50, 100, 125, 250, 500, 800, 1000)")]
    InvalidBitrate(String),

    /// An attribute held a value that could not be interpreted.
    #[error("unexpected value {value:?} in {path}")]
    Attribute { path: PathBuf, value: String },

    /// Reading or writing an attribute failed.
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, LinkError>;
