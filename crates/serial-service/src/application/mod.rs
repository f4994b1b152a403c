//! Application layer for serial-service.
//!
//! - **`workers`** – the four relay workers and their shutdown report.
//! - **`lifecycle`** – start-up, accept/supervise loop, teardown.
//! - **`error`** – errors that stop the service.

pub mod error;
pub mod lifecycle;
pub mod workers;

pub use error::ServiceError;
pub use lifecycle::{ExitHandle, LifecycleController, StatusMonitor};
pub use workers::{Mailboxes, RelayContext, ShutdownReport, StepOutcome, WorkerSet};
