//! Raw CAN socket endpoint.
//!
//! An [`Endpoint`] owns one channel bound to one named interface and
//! exchanges [`canutils_frame::Frame`]s over it:
//!
//! ```text
//! open → bind → (install_filters) → send | receive ... → close
//! ```
//!
//! On Linux the channel is a [`CanSocket`] (`PF_CAN`/`SOCK_RAW`/`CAN_RAW`).
//! Anything implementing [`Channel`] can stand in for it.

pub mod channel;
pub mod config;
pub mod endpoint;
pub mod error;

#[cfg(target_os = "linux")]
pub mod socket;

pub use channel::Channel;
pub use config::{EndpointConfig, CAN_RAW, PF_CAN, SOCK_RAW};
pub use endpoint::{Endpoint, EndpointState};
pub use error::{Result, TransportError};

#[cfg(target_os = "linux")]
pub use socket::CanSocket;

/// Endpoint over a raw CAN socket.
#[cfg(target_os = "linux")]
pub type CanEndpoint = Endpoint<CanSocket>;
