//! One-line frame rendering for dump and echo output.
//!
//! ```text
//! <0x123> [2] ab cd
//! <0x01abcdef> [0] remote request
//! ```

use std::fmt;

use crate::frame::Frame;

/// Literal printed in place of payload bytes for remote requests.
pub const REMOTE_REQUEST_MARKER: &str = "remote request";

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_extended() {
            write!(f, "<0x{:08x}> ", self.masked_identifier())?;
        } else {
            write!(f, "<0x{:03x}> ", self.masked_identifier())?;
        }
        write!(f, "[{}] ", self.data_length())?;

        if self.is_remote_request() {
            return f.write_str(REMOTE_REQUEST_MARKER);
        }
        for byte in self.data() {
            write!(f, "{byte:02x} ")?;
        }
        Ok(())
    }
}

/// Render a frame as a dump line (without trailing newline).
pub fn format_frame(frame: &Frame) -> String {
    frame.to_string()
}

/// Space-separated lowercase hex of the meaningful payload bytes.
pub fn hex_payload(frame: &Frame) -> String {
    frame
        .data()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_frame_line() {
        let frame = Frame::new(0x123, &[0xAB, 0xCD]);
        assert_eq!(format_frame(&frame), "<0x123> [2] ab cd ");
    }

    #[test]
    fn standard_identifier_is_padded_and_masked() {
        let frame = Frame::new(0xF805, &[]);
        assert_eq!(format_frame(&frame), "<0x005> [0] ");
    }

    #[test]
    fn extended_remote_request_line() {
        let frame = Frame::new(0x1ABCDEF, &[]).extended().remote_request();
        assert_eq!(format_frame(&frame), "<0x01abcdef> [0] remote request");
    }

    #[test]
    fn remote_request_replaces_payload_bytes() {
        let frame = Frame::new(0x10, &[1, 2]).remote_request();
        let line = format_frame(&frame);
        assert_eq!(line, "<0x010> [2] remote request");
        assert!(!line.contains("01 02"));
    }

    #[test]
    fn only_declared_bytes_are_rendered() {
        let frame = Frame::with_length(0x1, 3, [0x0A, 0x0B, 0x0C, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(format_frame(&frame), "<0x001> [3] 0a 0b 0c ");
        assert_eq!(hex_payload(&frame), "0a 0b 0c");
    }
}
