//! Deadline helpers shared by the bounded-wait operations

use std::time::{Duration, Instant};

/// Absolute deadline `timeout` from now.
///
/// Returns `None` when the deadline is not representable (e.g. `Duration::MAX`),
/// which callers treat as "wait forever".
#[inline]
pub fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

#[inline]
pub fn expired(deadline: Option<Instant>) -> bool {
    match deadline {
        Some(d) => Instant::now() >= d,
        None => false,
    }
}
