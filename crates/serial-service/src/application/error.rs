//! Errors that end the service.
//!
//! Device failures never appear here: the device side degrades instead of
//! stopping the process.

use thiserror::Error;

use crate::domain::ValidationError;
use crate::infrastructure::socket_channel::SocketError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    /// Bind failures at start-up; accept and read failures while running.
    #[error(transparent)]
    Socket(#[from] SocketError),
}
