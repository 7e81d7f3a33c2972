use std::hash::{Hash, Hasher};

use bitflags::bitflags;
use bytes::{Buf, BufMut};

use crate::error::{FrameError, Result};

/// Valid identifier bits of a standard (11-bit) frame.
pub const STANDARD_ID_MASK: u32 = 0x0000_07FF;

/// Valid identifier bits of an extended (29-bit) frame.
pub const EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;

/// Maximum payload length of a classic CAN frame.
pub const MAX_DATA_LENGTH: u8 = 8;

bitflags! {
    /// Out-of-band flags carried in the top three bits of the identifier word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IdFlags: u32 {
        /// 29-bit extended addressing.
        const EXTENDED = 1 << 31;
        /// Remote transmission request.
        const REMOTE_REQUEST = 1 << 30;
        /// Accept-all marker. Only meaningful on a bind-time pseudo address.
        const ACCEPT_ALL = 1 << 29;
    }
}

/// A classic CAN frame.
///
/// The payload buffer is always 8 bytes; `data_length` says how many of
/// them are meaningful. Bytes past `data_length` are carried untouched but
/// take no part in equality or hashing.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    identifier: u32,
    is_extended: bool,
    is_remote_request: bool,
    data_length: u8,
    payload: [u8; 8],
}

impl Frame {
    /// Create a standard data frame. Data beyond 8 bytes is dropped.
    pub fn new(identifier: u32, data: &[u8]) -> Self {
        let len = data.len().min(MAX_DATA_LENGTH as usize);
        let mut payload = [0u8; 8];
        payload[..len].copy_from_slice(&data[..len]);
        Self {
            identifier,
            is_extended: false,
            is_remote_request: false,
            data_length: len as u8,
            payload,
        }
    }

    /// Create a frame from an explicit length and full payload buffer.
    ///
    /// A `data_length` above 8 is clamped to 8.
    pub fn with_length(identifier: u32, data_length: u8, payload: [u8; 8]) -> Self {
        Self {
            identifier,
            is_extended: false,
            is_remote_request: false,
            data_length: data_length.min(MAX_DATA_LENGTH),
            payload,
        }
    }

    /// Switch to 29-bit extended addressing.
    pub fn extended(mut self) -> Self {
        self.is_extended = true;
        self
    }

    /// Mark the frame as a remote transmission request.
    pub fn remote_request(mut self) -> Self {
        self.is_remote_request = true;
        self
    }

    pub fn set_extended(&mut self, extended: bool) {
        self.is_extended = extended;
    }

    pub fn set_remote_request(&mut self, remote_request: bool) {
        self.is_remote_request = remote_request;
    }

    /// The identifier as stored, before masking to the addressing width.
    pub fn identifier(&self) -> u32 {
        self.identifier
    }

    pub fn set_identifier(&mut self, identifier: u32) {
        self.identifier = identifier;
    }

    /// The identifier masked to 11 or 29 bits.
    pub fn masked_identifier(&self) -> u32 {
        self.identifier & self.id_mask()
    }

    /// Identifier mask for this frame's addressing mode.
    pub fn id_mask(&self) -> u32 {
        if self.is_extended {
            EXTENDED_ID_MASK
        } else {
            STANDARD_ID_MASK
        }
    }

    pub fn is_extended(&self) -> bool {
        self.is_extended
    }

    pub fn is_remote_request(&self) -> bool {
        self.is_remote_request
    }

    pub fn data_length(&self) -> u8 {
        self.data_length
    }

    /// Change the declared length, clamped to 8.
    pub fn set_data_length(&mut self, data_length: u8) {
        self.data_length = data_length.min(MAX_DATA_LENGTH);
    }

    /// The full 8-byte payload buffer.
    pub fn payload(&self) -> &[u8; 8] {
        &self.payload
    }

    /// The meaningful payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.payload[..self.data_length as usize]
    }

    /// Flags to OR into the identifier word on the wire.
    pub fn flags(&self) -> IdFlags {
        let mut flags = IdFlags::empty();
        flags.set(IdFlags::EXTENDED, self.is_extended);
        flags.set(IdFlags::REMOTE_REQUEST, self.is_remote_request);
        flags
    }

    /// Identifier word as transmitted: masked value bits plus flag bits.
    pub fn wire_identifier(&self) -> u32 {
        self.masked_identifier() | self.flags().bits()
    }

    /// The frame sent back by an echo responder: identifier + 1.
    ///
    /// The increment is not masked; encoding re-masks to the addressing width.
    pub fn echo_reply(&self) -> Self {
        let mut reply = *self;
        reply.identifier = self.identifier.wrapping_add(1);
        reply
    }

    pub fn read_u8(&self, offset: usize) -> Option<u8> {
        self.payload.get(offset).copied()
    }

    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        self.view(offset, 2).map(|mut buf| buf.get_u16_le())
    }

    pub fn read_u32(&self, offset: usize) -> Option<u32> {
        self.view(offset, 4).map(|mut buf| buf.get_u32_le())
    }

    pub fn read_u64(&self, offset: usize) -> Option<u64> {
        self.view(offset, 8).map(|mut buf| buf.get_u64_le())
    }

    pub fn write_u8(&mut self, offset: usize, value: u8) -> Result<()> {
        self.view_mut(offset, 1)?.put_u8(value);
        Ok(())
    }

    pub fn write_u16(&mut self, offset: usize, value: u16) -> Result<()> {
        self.view_mut(offset, 2)?.put_u16_le(value);
        Ok(())
    }

    pub fn write_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        self.view_mut(offset, 4)?.put_u32_le(value);
        Ok(())
    }

    pub fn write_u64(&mut self, offset: usize, value: u64) -> Result<()> {
        self.view_mut(offset, 8)?.put_u64_le(value);
        Ok(())
    }

    fn view(&self, offset: usize, width: usize) -> Option<&[u8]> {
        let end = offset.checked_add(width)?;
        self.payload.get(offset..end)
    }

    fn view_mut(&mut self, offset: usize, width: usize) -> Result<&mut [u8]> {
        let end = offset
            .checked_add(width)
            .ok_or(FrameError::PayloadOutOfRange { offset, width })?;
        self.payload
            .get_mut(offset..end)
            .ok_or(FrameError::PayloadOutOfRange { offset, width })
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
            && self.is_extended == other.is_extended
            && self.is_remote_request == other.is_remote_request
            && self.data() == other.data()
    }
}

impl Eq for Frame {}

impl Hash for Frame {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
        self.is_extended.hash(state);
        self.is_remote_request.hash(state);
        self.data().hash(state);
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new(0, &[])
    }
}
