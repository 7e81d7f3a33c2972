//! Fixed-layout CAN frame codec, acceptance filters and frame formatting.
//!
//! Every frame travels as a 16-byte little-endian record:
//! - A 4-byte identifier word (value bits plus flags in bits 29..31)
//! - A 4-byte data length (0..=8)
//! - 8 payload bytes, of which only the first `data_length` are meaningful
//!
//! Filters, dump-line formatting and raw capture streams all build on the
//! [`Frame`] type defined here.

pub mod codec;
pub mod display;
pub mod error;
pub mod filter;
pub mod frame;
pub mod number;
pub mod reader;
pub mod writer;

pub use codec::{decode_frame, encode_frame, FRAME_SIZE};
pub use error::{FrameError, Result};
pub use filter::{FilterEntry, FilterTable};
pub use frame::{Frame, IdFlags, EXTENDED_ID_MASK, MAX_DATA_LENGTH, STANDARD_ID_MASK};
pub use number::{parse_c_ulong, parse_hex_u32};
pub use reader::FrameReader;
pub use writer::FrameWriter;
