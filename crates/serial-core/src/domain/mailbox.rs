//! Single-slot handoff buffer between one producer and one consumer.
//!
//! # Semantics
//!
//! A [`Mailbox`] holds at most one [`Frame`].  There is no queue behind it:
//!
//! ```text
//!             try_deposit                      try_consume
//! producer ──────────────▶ [ slot | occupied ] ──────────────▶ consumer
//!              │                                   │
//!              └─ occupied? → dropped (counted)    └─ empty? → None
//! ```
//!
//! - A deposit into an occupied mailbox is *dropped*, not buffered.
//! - A consume from an empty mailbox is a no-op.
//! - Deposits and consumes therefore strictly alternate.
//!
//! Every operation takes the mailbox's own lock for the duration of one copy
//! and one flag update.  The lock is never held across I/O and never nested
//! with another lock, so callers cannot build a lock-ordering cycle through
//! this type.

use std::sync::{Mutex, MutexGuard};

use crate::frame::Frame;

/// Counters describing what happened to frames offered to a mailbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailboxStats {
    /// Frames accepted by `try_deposit`.
    pub deposited: u64,
    /// Frames handed out by `try_consume`.
    pub consumed: u64,
    /// Frames rejected because the slot was still occupied.
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Slot {
    payload: Option<Frame>,
    stats: MailboxStats,
}

/// A named single-slot, drop-on-full handoff buffer.
#[derive(Debug)]
pub struct Mailbox {
    name: &'static str,
    slot: Mutex<Slot>,
}

impl Mailbox {
    /// Creates an empty mailbox.  `name` only appears in log output.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Mutex::new(Slot::default()),
        }
    }

    /// The name given at construction.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stores `frame` if the slot is free.
    ///
    /// Returns `false` (and counts a drop) when the slot still holds an
    /// unconsumed frame.
    pub fn try_deposit(&self, frame: &Frame) -> bool {
        let mut slot = self.lock();
        if slot.payload.is_some() {
            slot.stats.dropped += 1;
            tracing::trace!(mailbox = self.name, "mailbox occupied; frame dropped");
            return false;
        }
        slot.payload = Some(*frame);
        slot.stats.deposited += 1;
        true
    }

    /// Takes the pending frame out of the slot, leaving it empty.
    pub fn try_consume(&self) -> Option<Frame> {
        let mut slot = self.lock();
        let frame = slot.payload.take()?;
        slot.stats.consumed += 1;
        Some(frame)
    }

    /// Snapshot of the occupancy flag.
    ///
    /// Only the single consumer can clear the flag and only the single
    /// producer can set it, so a producer that observes `false` may rely on
    /// its next deposit succeeding.
    pub fn is_occupied(&self) -> bool {
        self.lock().payload.is_some()
    }

    /// Snapshot of the delivery counters.
    pub fn stats(&self) -> MailboxStats {
        self.lock().stats
    }

    // The slot is plain data with no invariant spanning a panic, so a poisoned
    // lock is taken over instead of propagated.
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(data: &[u8]) -> Frame {
        Frame::new(data).unwrap()
    }

    #[test]
    fn test_new_mailbox_is_empty() {
        let mailbox = Mailbox::new("test");
        assert!(!mailbox.is_occupied());
        assert_eq!(mailbox.try_consume(), None);
    }

    #[test]
    fn test_deposit_then_consume_returns_identical_bytes() {
        // Arrange
        let mailbox = Mailbox::new("test");
        let original = frame(b"\x00\x01binary\xFF");

        // Act
        assert!(mailbox.try_deposit(&original));
        let consumed = mailbox.try_consume();

        // Assert
        assert_eq!(consumed, Some(original));
        assert_eq!(consumed.unwrap().as_bytes(), b"\x00\x01binary\xFF");
        assert!(!mailbox.is_occupied());
    }

    #[test]
    fn test_deposit_into_occupied_mailbox_is_dropped() {
        // Arrange
        let mailbox = Mailbox::new("test");
        assert!(mailbox.try_deposit(&frame(b"first")));

        // Act
        let accepted = mailbox.try_deposit(&frame(b"second"));

        // Assert: the first frame survives, the second is gone
        assert!(!accepted);
        assert_eq!(mailbox.try_consume(), Some(frame(b"first")));
        assert_eq!(mailbox.try_consume(), None);
    }

    #[test]
    fn test_consume_clears_occupied_flag_so_next_deposit_succeeds() {
        let mailbox = Mailbox::new("test");
        assert!(mailbox.try_deposit(&frame(b"a")));
        assert!(mailbox.try_consume().is_some());
        assert!(mailbox.try_deposit(&frame(b"b")));
        assert_eq!(mailbox.try_consume(), Some(frame(b"b")));
    }

    #[test]
    fn test_n_deposits_without_consumer_deliver_at_most_one() {
        // Arrange
        let mailbox = Mailbox::new("to-controller");
        let offered = 25;

        // Act
        let accepted = (0..offered)
            .filter(|i| mailbox.try_deposit(&frame(&[*i as u8])))
            .count();

        // Assert
        assert_eq!(accepted, 1);
        let stats = mailbox.stats();
        assert_eq!(stats.deposited, 1);
        assert_eq!(stats.dropped, offered - 1);
        assert_eq!(mailbox.try_consume(), Some(frame(&[0])));
    }

    #[test]
    fn test_stats_count_each_outcome() {
        let mailbox = Mailbox::new("test");
        mailbox.try_deposit(&frame(b"1"));
        mailbox.try_deposit(&frame(b"2"));
        mailbox.try_consume();
        mailbox.try_consume();

        assert_eq!(
            mailbox.stats(),
            MailboxStats {
                deposited: 1,
                consumed: 1,
                dropped: 1,
            }
        );
    }

    #[test]
    fn test_name_is_reported() {
        assert_eq!(Mailbox::new("to-interface").name(), "to-interface");
    }
}
