//! Device transport implementations.
//!
//! | Channel string        | Transport                |
//! |-----------------------|--------------------------|
//! | `tcp://host:port`     | [`TcpEmulatorTransport`] |
//! | anything else         | [`CharDeviceTransport`]  |
//!
//! [`MockDeviceTransport`] is never selected from configuration; tests build
//! it directly.

pub mod char_device;
pub mod mock;
pub mod tcp_emulator;

use std::sync::Arc;

use serial_core::DeviceTransport;

pub use char_device::CharDeviceTransport;
pub use mock::MockDeviceTransport;
pub use tcp_emulator::TcpEmulatorTransport;

/// Picks the transport for `channel`.  The transport is returned unopened.
pub fn transport_for_channel(channel: &str) -> Arc<dyn DeviceTransport> {
    if channel.starts_with(tcp_emulator::SCHEME) {
        Arc::new(TcpEmulatorTransport::new())
    } else {
        Arc::new(CharDeviceTransport::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_core::DeviceError;

    #[test]
    fn test_device_path_selects_char_device() {
        // A char device reports the missing node as an open failure.
        let transport = transport_for_channel("/dev/definitely-not-a-tty");
        let err = transport.open("/dev/definitely-not-a-tty", 9600).unwrap_err();
        assert!(matches!(err, DeviceError::Open { .. }));
    }

    #[test]
    fn test_tcp_scheme_selects_emulator() {
        // The emulator transport rejects a tcp:// string with no port before
        // touching the network.
        let transport = transport_for_channel("tcp://localhost");
        let err = transport.open("tcp://localhost", 9600).unwrap_err();
        assert!(matches!(err, DeviceError::UnsupportedChannel(_)));
    }
}
