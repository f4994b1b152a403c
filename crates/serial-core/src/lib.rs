//! # serial-core
//!
//! Building blocks shared by the serial service: the relay [`Frame`], the
//! single-slot [`Mailbox`], the lock-guarded status flags and the
//! [`DeviceTransport`] contract.
//!
//! This crate has no dependency on sockets, async runtimes or OS device APIs.
//!
//! # Architecture overview
//!
//! The serial service relays raw bytes between a device ("controller") and
//! one TCP client ("interface"):
//!
//! ```text
//!   device ──▶ ControllerRx ──▶ [to-interface mailbox]  ──▶ InterfaceTx ──▶ client
//!   device ◀── ControllerTx ◀── [to-controller mailbox] ◀── InterfaceRx ◀── client
//! ```
//!
//! - **`frame`** – the 16-byte relay buffer with its exact length.
//! - **`domain`** – mailboxes, client/system status and worker identities.
//! - **`device`** – the transport trait the device side is written against.

pub mod device;
pub mod domain;
pub mod frame;

pub use device::{DeviceError, DeviceTransport};
pub use domain::mailbox::{Mailbox, MailboxStats};
pub use domain::status::{ClientStatus, StatusCell, SystemStatus};
pub use domain::worker::WorkerTask;
pub use frame::{Frame, FrameError, FRAME_SIZE};
