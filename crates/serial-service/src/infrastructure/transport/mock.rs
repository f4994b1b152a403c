//! In-memory device transport for tests.
//!
//! # Why a mock transport?
//!
//! The real transports need a serial device node or a running controller
//! emulator.  `MockDeviceTransport` replaces them with two queues:
//!
//! - **inbound**: byte chunks the "device" will hand out, one per `receive`.
//! - **sent**: every buffer the service wrote, in order.
//!
//! # Usage in tests
//!
//! ```ignore
//! let transport = Arc::new(MockDeviceTransport::new());
//! transport.push_inbound(b">SW:0,1\n");
//!
//! // ... run the service ...
//!
//! assert_eq!(transport.sent_frames(), vec![b"LED1".to_vec()]);
//! ```
//!
//! # Failure flags
//!
//! `fail_open` makes `open` fail (degraded start-up).  `fail_send` makes
//! every `send` fail after recording nothing.  `send_limit` caps how many
//! bytes a `send` accepts, to exercise short writes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use serial_core::{DeviceError, DeviceTransport};

/// A device that records every call instead of touching hardware.
#[derive(Default)]
pub struct MockDeviceTransport {
    /// Chunks returned by successive `receive` calls.
    pub inbound: Mutex<VecDeque<Vec<u8>>>,
    /// Bytes accepted by each `send`, in call order.
    pub sent: Mutex<Vec<Vec<u8>>>,
    /// `(channel, baud_rate)` of every `open` call.
    pub opens: Mutex<Vec<(String, u32)>>,
    /// When `true`, `open` returns [`DeviceError::Open`].
    pub fail_open: bool,
    /// When `true`, `send` returns an I/O error.
    pub fail_send: bool,
    /// Maximum bytes a single `send` accepts.
    pub send_limit: Option<usize>,
    pub(crate) open: AtomicBool,
    pub(crate) closes: AtomicUsize,
}

impl MockDeviceTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose `open` always fails.
    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    /// Queues `bytes` to be returned by a later `receive`.
    pub fn push_inbound(&self, bytes: &[u8]) {
        lock(&self.inbound).push_back(bytes.to_vec());
    }

    /// Chunks not yet handed out by `receive`.
    pub fn pending_inbound(&self) -> usize {
        lock(&self.inbound).len()
    }

    /// Snapshot of everything written so far.
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        lock(&self.sent).clone()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl DeviceTransport for MockDeviceTransport {
    fn open(&self, channel: &str, baud_rate: u32) -> Result<(), DeviceError> {
        lock(&self.opens).push((channel.to_string(), baud_rate));
        if self.fail_open {
            return Err(DeviceError::Open {
                channel: channel.to_string(),
                baud_rate,
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Hands out the next queued chunk, truncated to `buf`; `Ok(0)` when empty.
    fn receive(&self, buf: &mut [u8]) -> Result<usize, DeviceError> {
        if !self.is_open() {
            return Err(DeviceError::NotOpen);
        }
        let Some(chunk) = lock(&self.inbound).pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        Ok(n)
    }

    fn send(&self, buf: &[u8]) -> Result<usize, DeviceError> {
        if !self.is_open() {
            return Err(DeviceError::NotOpen);
        }
        if self.fail_send {
            return Err(DeviceError::Io(std::io::Error::other("mock send failure")));
        }
        let n = self.send_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        lock(&self.sent).push(buf[..n].to_vec());
        Ok(n)
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_hands_out_chunks_in_order() {
        let mock = MockDeviceTransport::new();
        mock.open("mock", 9600).unwrap();
        mock.push_inbound(b"one");
        mock.push_inbound(b"two");

        let mut buf = [0u8; 16];
        let n = mock.receive(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"one");
        let n = mock.receive(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"two");
        assert_eq!(mock.receive(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_send_limit_truncates_and_records() {
        let mock = MockDeviceTransport {
            send_limit: Some(3),
            ..MockDeviceTransport::default()
        };
        mock.open("mock", 9600).unwrap();

        assert_eq!(mock.send(b"abcdef").unwrap(), 3);
        assert_eq!(mock.sent_frames(), vec![b"abc".to_vec()]);
    }

    #[test]
    fn test_calls_before_open_fail() {
        let mock = MockDeviceTransport::new();
        let mut buf = [0u8; 4];
        assert!(matches!(mock.receive(&mut buf), Err(DeviceError::NotOpen)));
        assert!(matches!(mock.send(b"x"), Err(DeviceError::NotOpen)));
    }

    #[test]
    fn test_failing_open_records_attempt() {
        let mock = MockDeviceTransport::failing_open();
        assert!(mock.open("/dev/ttyUSB1", 115_200).is_err());
        assert_eq!(
            *mock.opens.lock().unwrap(),
            vec![("/dev/ttyUSB1".to_string(), 115_200)]
        );
        assert!(!mock.is_open());
    }
}
