//! Concurrency tests for the single-slot mailbox.
//!
//! These run a real producer thread against a real consumer thread on one
//! shared [`Mailbox`], the same shape as ControllerRx / InterfaceTx in the
//! service, and check the handoff invariants from the outside:
//!
//! - every accepted deposit is consumed exactly once,
//! - consumes come out in deposit order (the slot strictly alternates),
//! - rejected deposits are counted as drops and never surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use serial_core::{Frame, Mailbox};

fn numbered(n: u32) -> Frame {
    Frame::new(&n.to_be_bytes()).expect("4 bytes fit in a frame")
}

fn number_of(frame: &Frame) -> u32 {
    let bytes: [u8; 4] = frame.as_bytes().try_into().expect("4-byte frame");
    u32::from_be_bytes(bytes)
}

#[test]
fn test_producer_and_consumer_threads_pair_every_accepted_deposit() {
    // Arrange
    let mailbox = Arc::new(Mailbox::new("to-interface"));
    let producer_done = Arc::new(AtomicBool::new(false));
    let offered: u32 = 20_000;

    // Act: the producer offers frames as fast as it can, without checking
    // occupancy first, so a large share of them must be dropped.
    let producer = {
        let mailbox = Arc::clone(&mailbox);
        let done = Arc::clone(&producer_done);
        thread::spawn(move || {
            let mut accepted = Vec::new();
            for n in 0..offered {
                if mailbox.try_deposit(&numbered(n)) {
                    accepted.push(n);
                }
            }
            done.store(true, Ordering::SeqCst);
            accepted
        })
    };

    let consumer = {
        let mailbox = Arc::clone(&mailbox);
        let done = Arc::clone(&producer_done);
        thread::spawn(move || {
            let mut received = Vec::new();
            loop {
                match mailbox.try_consume() {
                    Some(frame) => received.push(number_of(&frame)),
                    None if done.load(Ordering::SeqCst) => {
                        // Producer finished; drain whatever is left once.
                        if let Some(frame) = mailbox.try_consume() {
                            received.push(number_of(&frame));
                        }
                        break;
                    }
                    None => thread::yield_now(),
                }
            }
            received
        })
    };

    let accepted = producer.join().expect("producer panicked");
    let received = consumer.join().expect("consumer panicked");

    // Assert
    assert_eq!(
        received, accepted,
        "every accepted deposit must be consumed exactly once, in order"
    );
    let stats = mailbox.stats();
    assert_eq!(stats.deposited, accepted.len() as u64);
    assert_eq!(stats.consumed, received.len() as u64);
    assert_eq!(stats.deposited + stats.dropped, u64::from(offered));
    assert!(!mailbox.is_occupied());
}

#[test]
fn test_producer_that_checks_occupancy_never_drops() {
    // The workers only read their source when the destination is free.
    // With that discipline in place, nothing offered is ever dropped.
    let mailbox = Arc::new(Mailbox::new("to-controller"));
    let total: u32 = 2_000;

    let producer = {
        let mailbox = Arc::clone(&mailbox);
        thread::spawn(move || {
            let mut n = 0;
            while n < total {
                if mailbox.is_occupied() {
                    thread::yield_now();
                    continue;
                }
                assert!(mailbox.try_deposit(&numbered(n)), "slot was observed free");
                n += 1;
            }
        })
    };

    let consumer = {
        let mailbox = Arc::clone(&mailbox);
        thread::spawn(move || {
            let mut received = Vec::with_capacity(total as usize);
            while received.len() < total as usize {
                match mailbox.try_consume() {
                    Some(frame) => received.push(number_of(&frame)),
                    None => thread::yield_now(),
                }
            }
            received
        })
    };

    producer.join().expect("producer panicked");
    let received = consumer.join().expect("consumer panicked");

    assert_eq!(received, (0..total).collect::<Vec<_>>());
    assert_eq!(mailbox.stats().dropped, 0);
}
