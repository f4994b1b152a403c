//! Device transport over a character device node such as `/dev/ttyUSB1`.
//!
//! The node is opened read/write and used with plain blocking `read`/`write`
//! calls.  Line settings (including the baud rate) are left as the system
//! configured them; the requested rate is only logged.
//!
//! The open file is held as an `Arc<File>` so a receive blocked inside
//! `read` does not hold the lock that `send` and `close` need.  Closing drops
//! the service's reference; the descriptor is released once any in-flight
//! read returns.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use serial_core::{DeviceError, DeviceTransport};
use tracing::debug;

#[derive(Default)]
pub struct CharDeviceTransport {
    file: Mutex<Option<Arc<File>>>,
}

impl CharDeviceTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self) -> Result<Arc<File>, DeviceError> {
        self.file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(Arc::clone)
            .ok_or(DeviceError::NotOpen)
    }
}

impl DeviceTransport for CharDeviceTransport {
    fn open(&self, channel: &str, baud_rate: u32) -> Result<(), DeviceError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(channel)
            .map_err(|source| DeviceError::Open {
                channel: channel.to_string(),
                baud_rate,
                source,
            })?;
        debug!(channel, baud_rate, "character device opened with existing line settings");

        *self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::new(file));
        Ok(())
    }

    fn receive(&self, buf: &mut [u8]) -> Result<usize, DeviceError> {
        let file = self.handle()?;
        let n = (&*file).read(buf)?;
        Ok(n)
    }

    fn send(&self, buf: &[u8]) -> Result<usize, DeviceError> {
        let file = self.handle()?;
        let n = (&*file).write(buf)?;
        Ok(n)
    }

    fn close(&self) {
        self.file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }
}
