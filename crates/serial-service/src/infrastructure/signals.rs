//! Termination signal handling.
//!
//! SIGINT and SIGTERM both request a graceful exit through an
//! [`ExitHandle`].  On non-Unix targets only Ctrl+C is available.
//!
//! The handlers are installed synchronously so a failure surfaces at
//! start-up.  Once installed, the default "terminate immediately" action no
//! longer applies; signals after the first are logged and otherwise ignored
//! while the shutdown runs.

use std::fmt;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::application::lifecycle::ExitHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => write!(f, "SIGINT"),
            TerminationSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

#[cfg(unix)]
struct SignalStreams {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalStreams {
    fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn next(&mut self) -> Option<TerminationSignal> {
        tokio::select! {
            received = self.interrupt.recv() => received.map(|()| TerminationSignal::Interrupt),
            received = self.terminate.recv() => received.map(|()| TerminationSignal::Terminate),
        }
    }
}

#[cfg(not(unix))]
struct SignalStreams;

#[cfg(not(unix))]
impl SignalStreams {
    fn install() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn next(&mut self) -> Option<TerminationSignal> {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Some(TerminationSignal::Interrupt),
            Err(e) => {
                warn!(error = %e, "failed to listen for Ctrl+C");
                None
            }
        }
    }
}

/// Installs the handlers and spawns a task that forwards signals to `exit`.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns the OS error if a handler cannot be registered.
pub fn spawn_signal_listener(exit: ExitHandle) -> std::io::Result<JoinHandle<()>> {
    let mut streams = SignalStreams::install()?;

    Ok(tokio::spawn(async move {
        while let Some(signal) = streams.next().await {
            if exit.request_exit(&signal.to_string()) {
                info!(%signal, "termination signal received; shutting down");
            } else {
                warn!(%signal, "termination signal received during shutdown; ignored");
            }
        }
    }))
}
