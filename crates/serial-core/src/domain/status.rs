//! Client and system status flags with their lock-guarded holder.
//!
//! # State machines
//!
//! ```text
//! ClientStatus:   Disconnected ──accept──▶ Connected
//!                      ▲                       │
//!                      └──── zero-length read ─┘
//!
//! SystemStatus:   Running ──termination request──▶ Exiting   (terminal)
//! ```
//!
//! Each status value lives in its own [`StatusCell`].  The cell's lock is held
//! only while the flag is read or written; callers never hold it across I/O
//! or while holding a mailbox lock.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Whether a TCP client is currently attached to the interface side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientStatus {
    #[default]
    Disconnected,
    Connected,
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientStatus::Disconnected => f.write_str("disconnected"),
            ClientStatus::Connected => f.write_str("connected"),
        }
    }
}

/// Whether the service keeps running or is tearing down.
///
/// `Exiting` is terminal: nothing moves the system back to `Running`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SystemStatus {
    #[default]
    Running,
    Exiting,
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemStatus::Running => f.write_str("running"),
            SystemStatus::Exiting => f.write_str("exiting"),
        }
    }
}

/// A status value behind its own mutex.
///
/// `S` is a small `Copy` enum, so every accessor copies the value out and
/// releases the lock before returning.
#[derive(Debug, Default)]
pub struct StatusCell<S: Copy> {
    value: Mutex<S>,
}

impl<S: Copy + PartialEq> StatusCell<S> {
    /// Creates a cell holding `initial`.
    pub fn new(initial: S) -> Self {
        Self {
            value: Mutex::new(initial),
        }
    }

    /// Current value.
    pub fn get(&self) -> S {
        *self.lock()
    }

    /// Stores `next` and returns the previous value.
    pub fn set(&self, next: S) -> S {
        std::mem::replace(&mut *self.lock(), next)
    }

    /// Stores `to` only if the current value is `from`.
    ///
    /// Returns `true` if this call performed the transition.  Used to make
    /// one-shot transitions (such as `Running → Exiting`) happen exactly once
    /// even when several notifications race.
    pub fn transition(&self, from: S, to: S) -> bool {
        let mut value = self.lock();
        if *value != from {
            return false;
        }
        *value = to;
        true
    }

    /// `true` if the current value equals `expected`.
    pub fn is(&self, expected: S) -> bool {
        *self.lock() == expected
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        self.value.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
