//! Criterion benchmarks for the mailbox hot path.
//!
//! Every relayed frame passes through one deposit and one consume, each taking
//! the mailbox lock once.  These numbers bound the per-frame overhead the
//! bridge adds on top of the device and socket I/O.
//!
//! Run with:
//! ```bash
//! cargo bench --package serial-core --bench mailbox_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serial_core::{Frame, Mailbox, FRAME_SIZE};

fn bench_deposit_consume(c: &mut Criterion) {
    let mailbox = Mailbox::new("bench");
    let frame = Frame::new(&[0x5Au8; FRAME_SIZE]).unwrap();

    c.bench_function("mailbox_deposit_then_consume", |b| {
        b.iter(|| {
            mailbox.try_deposit(black_box(&frame));
            black_box(mailbox.try_consume())
        })
    });
}

fn bench_deposit_when_full(c: &mut Criterion) {
    let mailbox = Mailbox::new("bench");
    let frame = Frame::new(b"occupied").unwrap();
    mailbox.try_deposit(&frame);

    c.bench_function("mailbox_deposit_dropped", |b| {
        b.iter(|| black_box(mailbox.try_deposit(black_box(&frame))))
    });
}

fn bench_occupancy_check(c: &mut Criterion) {
    let mailbox = Mailbox::new("bench");

    c.bench_function("mailbox_is_occupied", |b| {
        b.iter(|| black_box(mailbox.is_occupied()))
    });
}

criterion_group!(
    benches,
    bench_deposit_consume,
    bench_deposit_when_full,
    bench_occupancy_check
);
criterion_main!(benches);
