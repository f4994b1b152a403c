//! Domain entities for the serial service.
//!
//! Everything in this module is plain data guarded by `std::sync::Mutex`.
//! There is no I/O, no async runtime and no socket type here, so these types
//! can be exercised from ordinary threads in tests.

pub mod mailbox;
pub mod status;
pub mod worker;

pub use mailbox::{Mailbox, MailboxStats};
pub use status::{ClientStatus, StatusCell, SystemStatus};
pub use worker::WorkerTask;
