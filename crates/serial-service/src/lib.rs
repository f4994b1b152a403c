//! # serial-service
//!
//! Relays raw bytes between a device channel ("controller") and a single TCP
//! client ("interface").
//!
//! # Architecture overview
//!
//! ```text
//! TCP client (127.0.0.1:10000)
//!       ↕
//! serial-service  ← this crate
//!   domain/          ServiceConfig
//!   application/     relay workers, lifecycle controller
//!   infrastructure/  socket channel, device channel + transports,
//!                    signals, config file
//!       ↕
//! device node (/dev/ttyUSB1) or controller emulator (tcp://host:port)
//! ```
//!
//! Bytes are relayed unchanged in units of up to 16 bytes.  Each direction
//! has one single-slot mailbox; a frame that arrives while its mailbox is
//! full is dropped.

pub mod application;
pub mod domain;
pub mod infrastructure;
