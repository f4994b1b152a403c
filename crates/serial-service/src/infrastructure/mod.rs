//! Infrastructure layer for serial-service.
//!
//! Everything that touches the OS lives here: the TCP listener and client
//! halves, the device transports, signal handlers, and the config file.
//!
//! - **`socket_channel`** – listener plus the single active client.
//! - **`device_channel`** – a transport with open/degraded/closed state.
//! - **`transport`** – character device, TCP emulator and mock transports.
//! - **`signals`** – SIGINT/SIGTERM → exit request.
//! - **`config_file`** – TOML loading and validation.

pub mod config_file;
pub mod device_channel;
pub mod signals;
pub mod socket_channel;
pub mod transport;

pub use config_file::{load_config, ConfigError};
pub use device_channel::DeviceChannel;
pub use signals::spawn_signal_listener;
pub use socket_channel::{ReadOutcome, SocketChannel, SocketError};
pub use transport::transport_for_channel;
