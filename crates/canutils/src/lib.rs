//! CAN interface utilities over raw CAN sockets.
//!
//! The `canutils` binary (feature `cli`) bundles four tools as
//! subcommands: `send`, `dump`, `echo` and `config`. The library side
//! re-exports the crates they are built from.
//!
//! # Crate Structure
//!
//! - [`frame`]: 16-byte wire codec, acceptance filters, dump-line formatting
//! - [`transport`]: raw CAN socket endpoint
//! - [`link`]: interface bitrate, bus state and control mode

/// Re-export frame types.
pub mod frame {
    pub use canutils_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use canutils_transport::*;
}

/// Re-export interface configuration types.
pub mod link {
    pub use canutils_link::*;
}
