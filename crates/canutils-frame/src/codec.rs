use bytes::{Buf, BufMut, BytesMut};

use crate::error::{FrameError, Result};
use crate::frame::{Frame, IdFlags, EXTENDED_ID_MASK, STANDARD_ID_MASK};

/// Wire size of a frame: identifier (4) + length (4) + payload (8).
pub const FRAME_SIZE: usize = 16;

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────┬──────────────┬──────────────────┐
/// │ Identifier (4B)  │ Length (4B)  │ Payload (8B)     │
/// │ LE, flags 29..31 │ LE, 0..=8    │ all 8 bytes      │
/// └──────────────────┴──────────────┴──────────────────┘
/// ```
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) {
    dst.reserve(FRAME_SIZE);
    dst.put_u32_le(frame.wire_identifier());
    dst.put_u32_le(u32::from(frame.data_length()));
    dst.put_slice(frame.payload());
}

/// Decode one frame from the front of `src`.
///
/// Bytes past [`FRAME_SIZE`] are ignored. The length word is clamped to 8.
pub fn decode_frame(src: &[u8]) -> Result<Frame> {
    if src.len() < FRAME_SIZE {
        return Err(FrameError::MalformedFrame {
            len: src.len(),
            expected: FRAME_SIZE,
        });
    }

    let mut buf = &src[..FRAME_SIZE];
    let word = buf.get_u32_le();
    let data_length = buf.get_u32_le().min(8) as u8;
    let mut payload = [0u8; 8];
    buf.copy_to_slice(&mut payload);

    let flags = IdFlags::from_bits_truncate(word);
    let extended = flags.contains(IdFlags::EXTENDED);
    let mask = if extended {
        EXTENDED_ID_MASK
    } else {
        STANDARD_ID_MASK
    };

    let mut frame = Frame::with_length(word & mask, data_length, payload);
    frame.set_extended(extended);
    frame.set_remote_request(flags.contains(IdFlags::REMOTE_REQUEST));
    Ok(frame)
}

impl Frame {
    /// Encode into a fixed-size wire record.
    pub fn encode(&self) -> [u8; FRAME_SIZE] {
        let mut buf = BytesMut::with_capacity(FRAME_SIZE);
        encode_frame(self, &mut buf);
        let mut out = [0u8; FRAME_SIZE];
        out.copy_from_slice(&buf);
        out
    }

    /// Decode from a wire record.
    pub fn decode(src: &[u8]) -> Result<Self> {
        decode_frame(src)
    }
}
