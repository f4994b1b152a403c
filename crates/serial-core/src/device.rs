//! Contract for the byte-oriented device ("controller") transport.
//!
//! The service never looks inside the byte stream it relays.  All it needs
//! from a device is the four primitive operations below, each returning a
//! byte count or a failure.  Implementations live in the service crate
//! (character device, TCP emulator, in-memory mock).
//!
//! # Threading
//!
//! Methods take `&self` so one transport can be shared by the receiving and
//! the sending worker through an `Arc`.  Implementations provide their own
//! interior synchronisation.  Calls may block; callers run them off the async
//! executor.

use thiserror::Error;

/// Errors reported by a device transport or the channel wrapping it.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The channel could not be opened.
    #[error("failed to open device channel {channel} at {baud_rate} baud: {source}")]
    Open {
        channel: String,
        baud_rate: u32,
        #[source]
        source: std::io::Error,
    },

    /// The channel identifier does not name a usable transport.
    #[error("unsupported device channel: {0}")]
    UnsupportedChannel(String),

    /// An operation was attempted before `open` succeeded or after `close`.
    #[error("device channel is not open")]
    NotOpen,

    /// The service runs without a device (open failed at start-up).
    #[error("device channel unavailable")]
    Unavailable,

    /// A receive returned zero bytes.
    #[error("device returned no data")]
    NoData,

    /// The underlying read or write failed.
    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeviceError {
    /// `true` for outcomes that simply mean "nothing this cycle".
    pub fn is_idle(&self) -> bool {
        matches!(self, DeviceError::NoData | DeviceError::Unavailable)
    }
}

/// Byte-level device transport.
pub trait DeviceTransport: Send + Sync {
    /// Opens `channel` at `baud_rate`.
    fn open(&self, channel: &str, baud_rate: u32) -> Result<(), DeviceError>;

    /// Reads up to `buf.len()` bytes; `Ok(0)` means nothing was available.
    fn receive(&self, buf: &mut [u8]) -> Result<usize, DeviceError>;

    /// Writes `buf` once and returns how many bytes the device accepted.
    fn send(&self, buf: &[u8]) -> Result<usize, DeviceError>;

    /// Releases the channel.  Calling `close` twice is harmless.
    fn close(&self);
}
