//! Device transport that talks to a controller emulator over TCP.
//!
//! Channel strings of the form `tcp://host:port` select this transport.  It
//! lets the whole service run on a development machine without hardware: the
//! emulator plays the part of the device node, byte for byte.
//!
//! Reads use a short socket timeout so an idle emulator looks like a device
//! with nothing to say (`Ok(0)`), not a blocked read.  End-of-stream means the
//! emulator went away and is reported as an I/O error.

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serial_core::{DeviceError, DeviceTransport};
use tracing::debug;

/// URI scheme that selects this transport.
pub const SCHEME: &str = "tcp://";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const READ_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Default)]
pub struct TcpEmulatorTransport {
    stream: Mutex<Option<Arc<TcpStream>>>,
}

impl TcpEmulatorTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self) -> Result<Arc<TcpStream>, DeviceError> {
        self.stream
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(Arc::clone)
            .ok_or(DeviceError::NotOpen)
    }
}

/// Resolves the `host:port` part of a `tcp://` channel string.
fn resolve(channel: &str) -> Result<SocketAddr, DeviceError> {
    let unsupported = || DeviceError::UnsupportedChannel(channel.to_string());
    let authority = channel.strip_prefix(SCHEME).ok_or_else(unsupported)?;
    authority
        .to_socket_addrs()
        .map_err(|_| unsupported())?
        .next()
        .ok_or_else(unsupported)
}

impl DeviceTransport for TcpEmulatorTransport {
    fn open(&self, channel: &str, baud_rate: u32) -> Result<(), DeviceError> {
        let addr = resolve(channel)?;
        let open_err = |source: std::io::Error| DeviceError::Open {
            channel: channel.to_string(),
            baud_rate,
            source,
        };

        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).map_err(open_err)?;
        stream.set_read_timeout(Some(READ_TIMEOUT)).map_err(open_err)?;
        stream.set_nodelay(true).map_err(open_err)?;
        debug!(%addr, baud_rate, "connected to controller emulator");

        *self.stream.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::new(stream));
        Ok(())
    }

    fn receive(&self, buf: &mut [u8]) -> Result<usize, DeviceError> {
        let stream = self.handle()?;
        match (&*stream).read(buf) {
            Ok(0) => Err(DeviceError::Io(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                "controller emulator closed the connection",
            ))),
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(0),
            Err(e) => Err(DeviceError::Io(e)),
        }
    }

    fn send(&self, buf: &[u8]) -> Result<usize, DeviceError> {
        let stream = self.handle()?;
        let n = (&*stream).write(buf)?;
        Ok(n)
    }

    fn close(&self) {
        let stream = self
            .stream
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(stream) = stream {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn emulator() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let channel = format!("tcp://{}", listener.local_addr().unwrap());
        (listener, channel)
    }

    #[test]
    fn test_open_rejects_channel_without_scheme() {
        let transport = TcpEmulatorTransport::new();
        let result = transport.open("127.0.0.1:10001", 115_200);
        assert!(matches!(result, Err(DeviceError::UnsupportedChannel(_))));
    }

    #[test]
    fn test_open_rejects_missing_port() {
        let transport = TcpEmulatorTransport::new();
        let result = transport.open("tcp://127.0.0.1", 115_200);
        assert!(matches!(result, Err(DeviceError::UnsupportedChannel(_))));
    }

    #[test]
    fn test_relays_bytes_both_ways() {
        // Arrange
        let (listener, channel) = emulator();
        let transport = TcpEmulatorTransport::new();
        transport.open(&channel, 115_200).unwrap();
        let (mut peer, _) = listener.accept().unwrap();

        // Act: emulator → service
        peer.write_all(b">SW:1,1\n").unwrap();
        let mut buf = [0u8; 16];
        let mut n = 0;
        for _ in 0..40 {
            n = transport.receive(&mut buf).unwrap();
            if n > 0 {
                break;
            }
        }

        // Assert
        assert_eq!(&buf[..n], b">SW:1,1\n");

        // Act: service → emulator
        assert_eq!(transport.send(b"LED0").unwrap(), 4);
        let mut back = [0u8; 4];
        peer.read_exact(&mut back).unwrap();
        assert_eq!(&back, b"LED0");
    }

    #[test]
    fn test_idle_emulator_reads_as_no_data() {
        let (listener, channel) = emulator();
        let transport = TcpEmulatorTransport::new();
        transport.open(&channel, 115_200).unwrap();
        let _peer = listener.accept().unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(transport.receive(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_emulator_hangup_is_an_io_error() {
        let (listener, channel) = emulator();
        let transport = TcpEmulatorTransport::new();
        transport.open(&channel, 115_200).unwrap();
        let (peer, _) = listener.accept().unwrap();
        drop(peer);

        let mut buf = [0u8; 16];
        let mut result = transport.receive(&mut buf);
        for _ in 0..40 {
            if !matches!(result, Ok(0)) {
                break;
            }
            result = transport.receive(&mut buf);
        }
        assert!(matches!(result, Err(DeviceError::Io(_))));
    }
}
