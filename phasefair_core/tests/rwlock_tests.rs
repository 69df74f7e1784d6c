mod common;

use common::{stress_threads, wait_until};
use phasefair_core::{AcquireError, Phase, PhaseFairRwLock};
use std::{
    sync::{mpsc, Arc},
    thread,
    time::Duration,
};

#[test]
fn read_and_write_through_guards() {
    let lock = PhaseFairRwLock::new(String::from("a"));
    {
        let r1 = lock.read();
        let r2 = lock.read();
        assert_eq!(&*r1, "a");
        assert_eq!(&*r2, "a");
        assert_eq!(lock.snapshot().readers_running, 2);
    }
    lock.write().push('b');
    assert_eq!(&*lock.read(), "ab");
    assert!(lock.snapshot().is_idle());
    assert_eq!(lock.into_inner(), "ab");
}

#[test]
fn try_variants_report_why_they_failed() {
    let lock = PhaseFairRwLock::new(0u32);

    let w = lock.write();
    assert_eq!(lock.try_read().unwrap_err(), AcquireError::WouldBlock);
    assert_eq!(lock.try_write().unwrap_err(), AcquireError::WouldBlock);
    assert_eq!(
        lock.try_read_for(Duration::from_millis(10)).unwrap_err(),
        AcquireError::TimedOut
    );
    assert_eq!(
        lock.try_write_for(Duration::from_millis(10)).unwrap_err(),
        AcquireError::TimedOut
    );
    drop(w);

    let r = lock.try_read().expect("free lock should admit a reader");
    assert!(lock.try_write().is_err());
    drop(r);

    *lock.try_write_for(Duration::from_millis(10)).unwrap() = 7;
    assert_eq!(*lock.try_read_for(Duration::ZERO).unwrap(), 7);
}

#[test]
fn get_mut_and_default() {
    let mut lock: PhaseFairRwLock<Vec<u8>> = PhaseFairRwLock::default();
    lock.get_mut().push(1);
    assert_eq!(*lock.read(), vec![1]);
}

#[test]
fn debug_shows_state_not_data() {
    let lock = PhaseFairRwLock::new("secret");
    let _r = lock.read();
    let dbg = format!("{lock:?}");
    assert!(dbg.contains("readers_running: 1"), "{dbg}");
    assert!(!dbg.contains("secret"));
}

#[test]
fn guard_drop_wakes_blocked_writer() {
    let lock = Arc::new(PhaseFairRwLock::new(0));
    let (done_tx, done_rx) = mpsc::channel();

    let r = lock.read();
    let writer = {
        let l = Arc::clone(&lock);
        thread::spawn(move || {
            *l.write() += 1;
            done_tx.send(()).unwrap();
        })
    };
    wait_until("writer to queue", || {
        lock.snapshot().phase == Phase::ReadingWritersWaiting
    });
    assert!(done_rx.try_recv().is_err());

    drop(r);
    done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    writer.join().unwrap();
    assert_eq!(*lock.read(), 1);
}

/// N threads doing K guarded increments each end at exactly N x K.
#[test]
fn counter_correctness() {
    for &(threads, iterations) in &[(1usize, 1u64), (3, 333), (stress_threads(), 5_000)] {
        let counter = Arc::new(PhaseFairRwLock::new(0u64));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let c = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..iterations {
                        *c.write() += 1;
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*counter.read(), threads as u64 * iterations);
    }
}
