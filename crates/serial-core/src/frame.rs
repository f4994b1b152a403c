//! Fixed-size raw payloads exchanged between the device and the TCP client.
//!
//! # Wire format
//!
//! There is no framing on either side of the bridge.  A single read of up to
//! [`FRAME_SIZE`] bytes is one message; the buffer size itself is the message
//! boundary.  No delimiter, no length prefix, no checksum.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ b0 b1 b2 ... b(len-1) │  unused (not sent)    │
//! └───────────────────────────────────────────────┘
//!  ◄──────── len ───────►
//!  ◄────────────────── FRAME_SIZE ───────────────►
//! ```
//!
//! A [`Frame`] remembers exactly how many bytes were read.  Only those bytes
//! are forwarded: a short read of 5 bytes becomes a 5-byte write on the other
//! side, never a 16-byte write padded with stale data.

use std::fmt;

use thiserror::Error;

/// Size in bytes of the relay buffer on both sides of the bridge.
pub const FRAME_SIZE: usize = 16;

/// Errors produced when building a [`Frame`] from a byte slice.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// A zero-length read is a signal (EOF or "no data"), never a payload.
    #[error("frame payload must not be empty")]
    Empty,

    /// The slice does not fit into one relay buffer.
    #[error("frame payload of {len} bytes exceeds the {max}-byte buffer")]
    TooLong { len: usize, max: usize },
}

/// One relay buffer worth of bytes, with its exact length.
///
/// `Frame` is `Copy`: moving it in and out of a mailbox is a plain 24-byte
/// memcpy with no allocation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    bytes: [u8; FRAME_SIZE],
    len: usize,
}

impl Frame {
    /// Copies `data` into a new frame.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Empty`] for an empty slice and
    /// [`FrameError::TooLong`] if `data` is longer than [`FRAME_SIZE`].
    pub fn new(data: &[u8]) -> Result<Self, FrameError> {
        if data.is_empty() {
            return Err(FrameError::Empty);
        }
        if data.len() > FRAME_SIZE {
            return Err(FrameError::TooLong {
                len: data.len(),
                max: FRAME_SIZE,
            });
        }

        let mut bytes = [0u8; FRAME_SIZE];
        bytes[..data.len()].copy_from_slice(data);
        Ok(Self {
            bytes,
            len: data.len(),
        })
    }

    /// The payload bytes, exactly as read.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Number of payload bytes (always `1..=FRAME_SIZE`).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`; present for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl TryFrom<&[u8]> for Frame {
    type Error = FrameError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        Frame::new(data)
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("len", &self.len)
            .field("bytes", &self.as_bytes())
            .finish()
    }
}

/// Renders the payload as text for log lines, replacing invalid UTF-8 and
/// escaping control characters such as a trailing newline.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = String::from_utf8_lossy(self.as_bytes());
        write!(f, "{}", text.escape_debug())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_keeps_exact_length() {
        // Arrange / Act
        let frame = Frame::new(b"hello").unwrap();

        // Assert
        assert_eq!(frame.len(), 5);
        assert_eq!(frame.as_bytes(), b"hello");
    }

    #[test]
    fn test_new_accepts_full_buffer() {
        let data = [0xAAu8; FRAME_SIZE];
        let frame = Frame::new(&data).unwrap();
        assert_eq!(frame.len(), FRAME_SIZE);
        assert_eq!(frame.as_bytes(), &data[..]);
    }

    #[test]
    fn test_new_rejects_empty_slice() {
        assert_eq!(Frame::new(&[]), Err(FrameError::Empty));
    }

    #[test]
    fn test_new_rejects_oversized_slice() {
        let data = [0u8; FRAME_SIZE + 1];
        assert_eq!(
            Frame::new(&data),
            Err(FrameError::TooLong {
                len: FRAME_SIZE + 1,
                max: FRAME_SIZE
            })
        );
    }

    #[test]
    fn test_frames_with_same_prefix_but_different_length_differ() {
        // The unused tail is zeroed, so only `len` distinguishes these two.
        let short = Frame::new(&[1, 2]).unwrap();
        let long = Frame::new(&[1, 2, 0]).unwrap();
        assert_ne!(short, long);
    }

    #[test]
    fn test_display_escapes_control_characters() {
        let frame = Frame::new(b">OUT:1,1\n").unwrap();
        assert_eq!(frame.to_string(), ">OUT:1,1\\n");
    }

    #[test]
    fn test_try_from_slice() {
        let data: &[u8] = b"abc";
        let frame = Frame::try_from(data).unwrap();
        assert_eq!(frame.as_ref(), b"abc");
    }
}
