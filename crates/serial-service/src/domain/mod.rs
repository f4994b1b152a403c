//! Domain layer for serial-service.
//!
//! Plain configuration types with no I/O.  Reading the TOML file and the
//! command line happens in the outer layers, which then hand a finished
//! [`ServiceConfig`] inward.

pub mod config;

pub use config::{ControllerConfig, InterfaceConfig, RuntimeConfig, ServiceConfig, ValidationError};
