//! Phase-fair reader/writer lock without protected data.
//!
//! Any number of readers may hold the lock together, or one writer alone.
//! Once a writer queues, readers already inside may finish but no new
//! reader gets in until that writer has had its turn, so a steady stream
//! of readers cannot starve writers. Writers are served in arrival order.
//!
//! The lock is a monitor: one mutex guards all bookkeeping, readers share
//! one condition variable and every queued writer sleeps on its own, so a
//! release wakes exactly the writer whose turn it is.
use crate::constants::{METRIC_ACQUIRE_TIMEOUTS, METRIC_READ_CONTENDED, METRIC_WRITE_CONTENDED};
use crate::helpers::{deadline_after, expired};
use crate::state::LockState;
use crate::types::{LockSnapshot, Phase};
use log::debug;
use metrics::counter;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt;
use std::time::{Duration, Instant};

pub struct RawPhaseFairLock {
    state: Mutex<LockState>,
    readers: Condvar,
}

/// Block on `cond` while `condition` holds, giving up at `deadline` (`None` = never).
#[inline]
fn wait_while_until<F>(
    cond: &Condvar,
    guard: &mut MutexGuard<'_, LockState>,
    deadline: Option<Instant>,
    condition: F,
) where
    F: FnMut(&mut LockState) -> bool,
{
    // The predicate is re-checked by the callers: a wakeup racing the
    // deadline may report a timeout although the condition was met.
    match deadline {
        Some(deadline) => {
            let _ = cond.wait_while_until(guard, condition, deadline);
        }
        None => cond.wait_while(guard, condition),
    }
}

impl RawPhaseFairLock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LockState::new()),
            readers: Condvar::new(),
        }
    }

    // ---- shared ------------------------------------------------------------

    /// Acquire a **shared** (read) lock, blocking until the next reading phase
    /// if a writer holds the lock or is queued.
    pub fn read_lock(&self) {
        let mut state = self.state.lock();
        if !state.try_admit_reader() {
            let ticket = state.register_waiting_reader();
            counter!(METRIC_READ_CONTENDED).increment(1);
            self.readers
                .wait_while(&mut state, |s| !s.reader_admitted(ticket));
        }
        state.check_invariants();
    }

    /// Acquire a shared lock only if that needs no waiting.
    pub fn try_read_lock(&self) -> bool {
        let mut state = self.state.lock();
        let admitted = state.try_admit_reader();
        state.check_invariants();
        admitted
    }

    /// Acquire a shared lock, waiting at most `timeout`.
    /// Returns `false` (with no trace left in the lock) on expiry.
    pub fn try_read_lock_for(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if state.try_admit_reader() {
            state.check_invariants();
            return true;
        }

        let deadline = deadline_after(timeout);
        let ticket = state.register_waiting_reader();
        counter!(METRIC_READ_CONTENDED).increment(1);
        wait_while_until(&self.readers, &mut state, deadline, |s| {
            !s.reader_admitted(ticket)
        });

        let admitted = state.reader_admitted(ticket);
        if !admitted {
            state.withdraw_waiting_reader(ticket);
            counter!(METRIC_ACQUIRE_TIMEOUTS).increment(1);
            debug!("[READ] gave up after {:?} in phase {}", timeout, state.phase());
        }
        state.check_invariants();
        admitted
    }

    /// Release a shared lock held by the caller.
    pub fn read_unlock(&self) {
        let mut state = self.state.lock();
        state.release_read();
        state.check_invariants();
    }

    // ---- exclusive ---------------------------------------------------------

    /// Acquire an **exclusive** (write) lock.
    /// Queues behind earlier writers and waits for running readers to drain.
    pub fn write_lock(&self) {
        let mut state = self.state.lock();
        if state.try_take_free() {
            state.check_invariants();
            return;
        }

        let (id, node) = state.enqueue_writer();
        counter!(METRIC_WRITE_CONTENDED).increment(1);
        node.wake()
            .wait_while(&mut state, |s| !s.is_queue_head(id));

        state.announce_writer();
        node.wake().wait_while(&mut state, |s| !s.handed_off());

        state.take_handoff(id);
        state.check_invariants();
    }

    /// Acquire an exclusive lock only if it is free *and* no writer is queued.
    pub fn try_write_lock(&self) -> bool {
        let mut state = self.state.lock();
        let taken = state.try_take_without_queueing();
        state.check_invariants();
        taken
    }

    /// Acquire an exclusive lock, waiting at most `timeout`.
    ///
    /// On expiry the writer leaves the queue, the phase is repaired (readers
    /// held back only by this writer are let in) and `false` is returned.
    pub fn try_write_lock_for(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if state.try_take_free() {
            state.check_invariants();
            return true;
        }

        let deadline = deadline_after(timeout);
        let (id, node) = state.enqueue_writer();
        counter!(METRIC_WRITE_CONTENDED).increment(1);

        wait_while_until(node.wake(), &mut state, deadline, |s| !s.is_queue_head(id));
        let gave_up = state.gives_up_at_head(id, expired(deadline));
        if !gave_up {
            state.announce_writer();
            wait_while_until(node.wake(), &mut state, deadline, |s| !s.handed_off());
        }

        if gave_up || !state.handed_off() {
            state.abandon_writer(id, &self.readers);
            counter!(METRIC_ACQUIRE_TIMEOUTS).increment(1);
            debug!("[WRITE] gave up after {:?} in phase {}", timeout, state.phase());
            state.check_invariants();
            return false;
        }

        state.take_handoff(id);
        state.check_invariants();
        true
    }

    /// Release the exclusive lock held by the caller.
    ///
    /// Waiting readers are admitted first (as one batch); otherwise the lock
    /// is handed to the oldest queued writer.
    pub fn write_unlock(&self) {
        let mut state = self.state.lock();
        state.release_write(&self.readers);
        state.check_invariants();
    }

    /// Release whichever lock the caller holds, judged by the current phase.
    pub fn unlock(&self) {
        let mut state = self.state.lock();
        if state.phase() == Phase::Writing {
            state.release_write(&self.readers);
        } else {
            state.release_read();
        }
        state.check_invariants();
    }

    // ---- diagnostics -------------------------------------------------------

    pub fn snapshot(&self) -> LockSnapshot {
        self.state.lock().snapshot()
    }
}

impl Default for RawPhaseFairLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RawPhaseFairLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawPhaseFairLock")
            .field("state", &self.snapshot())
            .finish()
    }
}

impl Drop for RawPhaseFairLock {
    fn drop(&mut self) {
        // `&mut self`: no thread can still be parked on a wait node.
        let snap = self.state.get_mut().snapshot();
        debug_assert_eq!(snap.queued_writers, 0, "lock dropped with queued writers");
        debug!("[DROP] reclaiming {} pooled wait nodes", snap.pooled_nodes);
    }
}
