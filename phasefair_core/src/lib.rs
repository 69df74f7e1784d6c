//! Phase-fair reader/writer lock.
//!
//! Many readers or one writer at a time, with two guarantees on top of
//! mutual exclusion:
//!   - writers are served strictly in arrival order,
//!   - once a writer waits, no reader that arrives later gets in before it,
//!     so readers cannot starve writers (and a writer release lets the
//!     readers that queued meanwhile in before the next writer).
//!
//! [`RawPhaseFairLock`] exposes explicit lock/unlock calls, including
//! non-blocking and bounded-time attempts. [`PhaseFairRwLock`] wraps a value
//! and hands out RAII guards.
//!
//! ```
//! use phasefair_core::PhaseFairRwLock;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let counter = Arc::new(PhaseFairRwLock::new(0u64));
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let c = Arc::clone(&counter);
//!         thread::spawn(move || {
//!             for _ in 0..100 {
//!                 *c.write() += 1;
//!             }
//!         })
//!     })
//!     .collect();
//! for h in handles {
//!     h.join().unwrap();
//! }
//! assert_eq!(*counter.read(), 400);
//! ```

pub mod constants;
pub mod errors;
pub mod helpers;
pub mod raw_lock;
pub mod rwlock;
mod state;
pub mod telemetry;
pub mod types;
mod wait_queue;

pub use errors::AcquireError;
pub use raw_lock::RawPhaseFairLock;
pub use rwlock::{PhaseFairRwLock, ReadGuard, WriteGuard};
pub use types::{LockSnapshot, Phase};

use once_cell::sync::OnceCell;

// ---- logging bootstraper -------------------------------------------------
/// Install `env_logger` once per process unless the host already set a logger.
///
/// Opt-in: nothing in this crate calls it, so the process logger stays the
/// host's choice. Binaries call it at startup.
pub fn ensure_logging() {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_init(|| {
        // Fallback: plain env_logger (built without timestamps), RUST_LOG driven.
        let _ = env_logger::builder()
            .is_test(std::env::var("RUST_TEST_THREADS").is_ok())
            .try_init();
    });
}
