use std::io::{ErrorKind, Read};

use crate::codec::{decode_frame, FRAME_SIZE};
use crate::error::{FrameError, Result};
use crate::frame::Frame;

/// Reads wire frames back-to-back from any `Read` stream.
///
/// Used for raw captures written by [`crate::FrameWriter`]. Handles
/// partial reads internally.
pub struct FrameReader<T> {
    inner: T,
    frames_read: u64,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            frames_read: 0,
        }
    }

    /// Read the next frame (blocking).
    ///
    /// Returns `Ok(None)` on a clean end of stream and
    /// `Err(FrameError::MalformedFrame)` when the stream ends mid-frame.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut record = [0u8; FRAME_SIZE];
        let mut filled = 0usize;

        while filled < FRAME_SIZE {
            match self.inner.read(&mut record[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        let frame = decode_frame(&record[..filled])?;
        self.frames_read += 1;
        Ok(Some(frame))
    }

    /// Number of frames decoded so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn wire(frames: &[Frame]) -> Vec<u8> {
        frames.iter().flat_map(|frame| frame.encode()).collect()
    }

    #[test]
    fn read_multiple_frames() {
        let frames = [
            Frame::new(1, b"one"),
            Frame::new(0x1234, b"two").extended(),
            Frame::new(3, &[]).remote_request(),
        ];
        let mut reader = FrameReader::new(Cursor::new(wire(&frames)));

        for expected in &frames {
            assert_eq!(reader.read_frame().unwrap().as_ref(), Some(expected));
        }
        assert!(reader.read_frame().unwrap().is_none());
        assert_eq!(reader.frames_read(), 3);
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire(&[Frame::new(4, b"slow")]),
            pos: 0,
        };
        let frames: Vec<Frame> = FrameReader::new(byte_reader)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(frames, vec![Frame::new(4, b"slow")]);
    }

    #[test]
    fn truncated_tail_is_malformed() {
        let mut bytes = wire(&[Frame::new(1, b"ok")]);
        bytes.extend_from_slice(&[0x01, 0x02, 0x03]);

        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert!(reader.read_frame().unwrap().is_some());
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::MalformedFrame { len: 3, .. }));
    }

    #[test]
    fn interrupted_reads_are_retried() {
        let reader = InterruptOnce {
            inner: Cursor::new(wire(&[Frame::new(9, b"x")])),
            interrupted: false,
        };
        let frames: Vec<Frame> = FrameReader::new(reader).collect::<Result<_>>().unwrap();
        assert_eq!(frames.len(), 1);
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptOnce {
        inner: Cursor<Vec<u8>>,
        interrupted: bool,
    }

    impl Read for InterruptOnce {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }
}
