//! Device side of the bridge: a [`DeviceTransport`] plus the open/degraded
//! state around it.
//!
//! A failed open at start-up does not stop the service.  The channel is then
//! *degraded*: every receive and send reports [`DeviceError::Unavailable`],
//! the controller workers treat that as "nothing this cycle", and the TCP
//! side keeps working.
//!
//! All methods here may block inside the transport.  The workers call them
//! through `tokio::task::spawn_blocking`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serial_core::{DeviceError, DeviceTransport, Frame, FRAME_SIZE};
use tracing::{debug, info, warn};

use crate::domain::ControllerConfig;

pub struct DeviceChannel {
    transport: Arc<dyn DeviceTransport>,
    channel: String,
    available: AtomicBool,
}

impl DeviceChannel {
    /// Opens `config.channel` at `config.baud_rate` on `transport`.
    ///
    /// Never fails: an open error is logged and the channel comes up degraded.
    pub fn open(transport: Arc<dyn DeviceTransport>, config: &ControllerConfig) -> Self {
        let available = match transport.open(&config.channel, config.baud_rate) {
            Ok(()) => {
                info!(
                    channel = %config.channel,
                    baud_rate = config.baud_rate,
                    "device channel opened"
                );
                true
            }
            Err(e) => {
                warn!(
                    channel = %config.channel,
                    error = %e,
                    "device channel unavailable; continuing without it"
                );
                false
            }
        };

        Self {
            transport,
            channel: config.channel.clone(),
            available: AtomicBool::new(available),
        }
    }

    /// Whether the channel opened and has not been closed since.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// One receive of at most [`FRAME_SIZE`] bytes.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::Unavailable`] when degraded or closed.
    /// - [`DeviceError::NoData`] when the transport returned zero bytes.
    /// - Any transport failure, unchanged.
    pub fn receive_once(&self) -> Result<Frame, DeviceError> {
        if !self.is_available() {
            return Err(DeviceError::Unavailable);
        }

        let mut buf = [0u8; FRAME_SIZE];
        let n = self.transport.receive(&mut buf)?;
        if n == 0 {
            return Err(DeviceError::NoData);
        }
        // A transport cannot report more than the buffer it was handed.
        let n = n.min(FRAME_SIZE);
        Frame::new(&buf[..n])
            .map_err(|e| DeviceError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    /// One send of `frame`; returns the count the transport accepted.
    ///
    /// A short count is logged here and not retried.
    ///
    /// # Errors
    ///
    /// [`DeviceError::Unavailable`] when degraded or closed, otherwise any
    /// transport failure.
    pub fn send_once(&self, frame: &Frame) -> Result<usize, DeviceError> {
        if !self.is_available() {
            return Err(DeviceError::Unavailable);
        }

        let written = self.transport.send(frame.as_bytes())?;
        if written < frame.len() {
            warn!(
                written,
                expected = frame.len(),
                "short write to device; remainder discarded"
            );
        }
        Ok(written)
    }

    /// Releases the transport.  Only the first call reaches it.
    pub fn close(&self) {
        if self.available.swap(false, Ordering::AcqRel) {
            self.transport.close();
            info!(channel = %self.channel, "device channel closed");
        } else {
            debug!(channel = %self.channel, "device channel already closed");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
