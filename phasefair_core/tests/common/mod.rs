#![allow(dead_code)]

use std::{
    thread,
    time::{Duration, Instant},
};

/// Poll `cond` until it holds; panics after a generous grace period.
pub fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let start = Instant::now();
    while !cond() {
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "timed out waiting for {what}"
        );
        thread::sleep(Duration::from_millis(1));
    }
}

/// Thread count for stress tests: enough to contend, bounded for CI boxes.
pub fn stress_threads() -> usize {
    num_cpus::get().clamp(2, 8)
}
