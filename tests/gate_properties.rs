/*!
 * Tiered Gate Property Tests
 * Stamp monotonicity, validation semantics, and writer preference under load
 */

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tierlock::TieredGate;

#[test]
fn test_stamp_total_order_over_writer_epochs() {
    const WRITERS: usize = 4;
    const CYCLES: usize = 250;

    let gate = Arc::new(TieredGate::new());

    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                let mut stamps = Vec::with_capacity(CYCLES);
                for _ in 0..CYCLES {
                    drop(gate.acquire_write());
                    stamps.push(gate.stamp());
                }
                stamps
            })
        })
        .collect();

    for handle in handles {
        let stamps = handle.join().unwrap();
        // Each writer observes its own stamps strictly increasing.
        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    }

    // Every completed write cycle advanced the sequence by exactly two.
    assert_eq!(gate.stamp(), (WRITERS * CYCLES * 2) as u64);
}

#[test]
fn test_validate_rejects_stamps_from_before_a_write() {
    let gate = Arc::new(TieredGate::new());
    let stamp = gate.try_optimistic_read();
    assert!(gate.validate(stamp));

    let gate_clone = Arc::clone(&gate);
    thread::spawn(move || {
        drop(gate_clone.acquire_write());
    })
    .join()
    .unwrap();

    assert!(!gate.validate(stamp));
}

#[test]
fn test_optimistic_readers_with_concurrent_writers() {
    const READERS: usize = 6;
    const DURATION: Duration = Duration::from_millis(200);

    let gate = Arc::new(TieredGate::new());
    let stop = Arc::new(AtomicBool::new(false));
    let validated = Arc::new(AtomicU64::new(0));
    let invalidated = Arc::new(AtomicU64::new(0));

    let mut handles = vec![];

    for _ in 0..READERS {
        let gate = Arc::clone(&gate);
        let stop = Arc::clone(&stop);
        let validated = Arc::clone(&validated);
        let invalidated = Arc::clone(&invalidated);
        handles.push(thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let stamp = gate.try_optimistic_read();
                if stamp.is_valid() && gate.validate(stamp) {
                    validated.fetch_add(1, Ordering::Relaxed);
                } else {
                    invalidated.fetch_add(1, Ordering::Relaxed);
                }
            }
        }));
    }

    let writer_gate = Arc::clone(&gate);
    let writer_stop = Arc::clone(&stop);
    handles.push(thread::spawn(move || {
        while !writer_stop.load(Ordering::Relaxed) {
            drop(writer_gate.acquire_write());
            thread::sleep(Duration::from_micros(200));
        }
    }));

    thread::sleep(DURATION);
    stop.store(true, Ordering::Relaxed);
    for handle in handles {
        handle.join().unwrap();
    }

    let ok = validated.load(Ordering::Relaxed);
    let stale = invalidated.load(Ordering::Relaxed);
    println!("optimistic reads: {} validated, {} invalidated", ok, stale);
    // Readers must make progress between write cycles.
    assert!(ok > 0);
}

#[test]
fn test_writer_wait_is_bounded_under_sustained_reads() {
    const READERS: usize = 8;
    // Generous ceiling: writer preference makes the actual wait a few reader
    // critical sections, but schedulers vary.
    const WRITER_DEADLINE: Duration = Duration::from_secs(5);

    let gate = Arc::new(TieredGate::new());
    let stop = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let gate = Arc::clone(&gate);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let _read = gate.acquire_read();
                    thread::sleep(Duration::from_micros(50));
                }
            })
        })
        .collect();

    // Let the read load establish itself.
    thread::sleep(Duration::from_millis(50));

    let start = Instant::now();
    drop(gate.acquire_write());
    let waited = start.elapsed();

    stop.store(true, Ordering::Relaxed);
    for handle in readers {
        handle.join().unwrap();
    }

    println!("writer acquired after {:?} under sustained read load", waited);
    assert!(
        waited < WRITER_DEADLINE,
        "writer starved for {:?}",
        waited
    );
}

#[test]
fn test_read_guard_snapshot_consistency() {
    // Two values updated only under the write tier; pessimistic readers must
    // never observe them out of sync.
    const WRITES: usize = 500;

    let gate = Arc::new(TieredGate::new());
    let a = Arc::new(AtomicU64::new(0));
    let b = Arc::new(AtomicU64::new(0));
    let stop = Arc::new(AtomicBool::new(false));

    let mut handles = vec![];
    for _ in 0..4 {
        let gate = Arc::clone(&gate);
        let a = Arc::clone(&a);
        let b = Arc::clone(&b);
        let stop = Arc::clone(&stop);
        handles.push(thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let _read = gate.acquire_read();
                let seen_a = a.load(Ordering::Acquire);
                let seen_b = b.load(Ordering::Acquire);
                assert_eq!(seen_a, seen_b, "torn read under the read tier");
            }
        }));
    }

    for i in 1..=WRITES {
        let _write = gate.acquire_write();
        a.store(i as u64, Ordering::Release);
        b.store(i as u64, Ordering::Release);
    }

    stop.store(true, Ordering::Relaxed);
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(a.load(Ordering::Relaxed), WRITES as u64);
}
