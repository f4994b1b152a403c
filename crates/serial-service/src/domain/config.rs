//! Service configuration types.
//!
//! [`ServiceConfig`] is the single source of truth for runtime settings.  It
//! can be deserialised from a TOML file (see
//! `infrastructure::config_file`), built from defaults, and then overridden
//! field by field from the command line.
//!
//! ```toml
//! [interface]
//! listen_address = "127.0.0.1"
//! listen_port = 10000
//! backlog = 10
//!
//! [controller]
//! channel = "/dev/ttyUSB1"     # or "tcp://127.0.0.1:10001" for an emulator
//! baud_rate = 115200
//!
//! [runtime]
//! poll_interval_ms = 100
//! shutdown_grace_ms = 500
//! log_level = "info"
//! ```
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! reference set-up: listen on `127.0.0.1:10000`, device channel 1 at
//! 115200 baud, 100 ms polling.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Semantic problems found by [`ServiceConfig::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("poll_interval_ms must be greater than zero")]
    ZeroPollInterval,
    #[error("baud_rate must be greater than zero")]
    ZeroBaudRate,
    #[error("controller channel must not be empty")]
    EmptyChannel,
    #[error("listen_address must not be empty")]
    EmptyListenAddress,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub interface: InterfaceConfig,
    pub controller: ControllerConfig,
    pub runtime: RuntimeConfig,
}

/// TCP side: where the single interface client connects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterfaceConfig {
    /// IPv4 or IPv6 literal to listen on.  Host names are not resolved.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Pending-connection queue length passed to `listen`.
    #[serde(default = "default_backlog")]
    pub backlog: u32,
}

/// Device side: which channel to open and at what line speed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControllerConfig {
    /// Device node path, or `tcp://host:port` for a controller emulator.
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Worker cadence, shutdown budget and logging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    /// Period of every worker's polling loop, and of the lifecycle status poll.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How long shutdown waits for each worker before detaching it.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_listen_address() -> String {
    "127.0.0.1".to_string()
}
fn default_listen_port() -> u16 {
    10000
}
fn default_backlog() -> u32 {
    10
}
fn default_channel() -> String {
    "/dev/ttyUSB1".to_string()
}
fn default_baud_rate() -> u32 {
    115_200
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_shutdown_grace_ms() -> u64 {
    500
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            listen_port: default_listen_port(),
            backlog: default_backlog(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            log_level: default_log_level(),
        }
    }
}

impl ServiceConfig {
    /// Worker polling period.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.runtime.poll_interval_ms)
    }

    /// Per-worker join budget during shutdown.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.runtime.shutdown_grace_ms)
    }

    /// Checks value ranges that serde cannot express.
    ///
    /// The listen address itself is parsed at bind time, where a bad value is
    /// a fatal start-up error of its own.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.runtime.poll_interval_ms == 0 {
            return Err(ValidationError::ZeroPollInterval);
        }
        if self.controller.baud_rate == 0 {
            return Err(ValidationError::ZeroBaudRate);
        }
        if self.controller.channel.trim().is_empty() {
            return Err(ValidationError::EmptyChannel);
        }
        if self.interface.listen_address.trim().is_empty() {
            return Err(ValidationError::EmptyListenAddress);
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
