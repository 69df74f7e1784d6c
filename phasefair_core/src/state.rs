//! Bookkeeping guarded by the monitor mutex and every phase transition.
//!
//! Nothing in here blocks: the raw lock owns the waits, this module decides
//! who may proceed and whom to wake. Invariants (checked in debug builds by
//! [`LockState::check_invariants`] whenever the monitor mutex is handed back):
//!   - `Reading` => no writer queued, no reader waiting
//!   - `ReadingWritersWaiting` | `Handoff` => writer queue non-empty
//!   - `ReadingWritersWaiting` => at least one reader running
//!   - readers running => phase is `Reading` or `ReadingWritersWaiting`
//!   - the writer queue is a finite chain ending at its tail

use crate::constants::{METRIC_READER_BATCHES, METRIC_WRITER_HANDOFFS};
use crate::types::{LockSnapshot, Phase};
use crate::wait_queue::{NodeId, WaitNode, WaitQueue};
#[cfg(feature = "trace")]
use log::trace;
use metrics::counter;
use parking_lot::Condvar;
use std::sync::Arc;

pub(crate) struct LockState {
    phase: Phase,
    readers_running: usize,
    readers_waiting: usize,
    /// Bumped every time a batch of waiting readers is admitted.
    read_epoch: u64,
    writers: WaitQueue,
}

impl LockState {
    pub(crate) fn new() -> Self {
        Self {
            phase: Phase::Reading,
            readers_running: 0,
            readers_waiting: 0,
            read_epoch: 0,
            writers: WaitQueue::new(),
        }
    }

    #[inline]
    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    fn set_phase(&mut self, next: Phase) {
        #[cfg(feature = "trace")]
        trace!("[PHASE] {} -> {}", self.phase, next);
        self.phase = next;
    }

    // ---- readers -----------------------------------------------------------

    /// Admit a reader right away if the lock is in the pure reading phase.
    #[inline]
    pub(crate) fn try_admit_reader(&mut self) -> bool {
        if self.phase == Phase::Reading {
            self.readers_running += 1;
            true
        } else {
            false
        }
    }

    /// Register a blocked reader; returns the epoch it has to wait past.
    pub(crate) fn register_waiting_reader(&mut self) -> u64 {
        debug_assert_ne!(self.phase, Phase::Reading);
        self.readers_waiting += 1;
        self.read_epoch
    }

    /// Has the batch containing a reader registered at `ticket` been admitted?
    #[inline]
    pub(crate) fn reader_admitted(&self, ticket: u64) -> bool {
        self.read_epoch != ticket
    }

    /// A waiting reader gave up before its batch was admitted.
    pub(crate) fn withdraw_waiting_reader(&mut self, ticket: u64) {
        debug_assert!(!self.reader_admitted(ticket));
        debug_assert!(self.readers_waiting > 0);
        self.readers_waiting -= 1;
    }

    /// Move every waiting reader into the running set in one step and wake them.
    fn admit_waiting_readers(&mut self, readers: &Condvar) {
        if self.readers_waiting == 0 {
            return;
        }
        self.readers_running += self.readers_waiting;
        self.readers_waiting = 0;
        self.read_epoch = self.read_epoch.wrapping_add(1);
        counter!(METRIC_READER_BATCHES).increment(1);
        readers.notify_all();
    }

    pub(crate) fn release_read(&mut self) {
        debug_assert!(
            self.phase.admits_running_readers(),
            "read release in phase {}",
            self.phase
        );
        debug_assert!(self.readers_running > 0, "read release without a reader");
        self.readers_running -= 1;
        if self.readers_running == 0 && self.phase == Phase::ReadingWritersWaiting {
            self.hand_off();
        }
    }

    // ---- writers -----------------------------------------------------------

    /// Uncontended write: only from the pure reading phase with nobody inside.
    #[inline]
    pub(crate) fn try_take_free(&mut self) -> bool {
        if self.phase == Phase::Reading && self.readers_running == 0 {
            debug_assert!(self.writers.is_empty());
            self.set_phase(Phase::Writing);
            true
        } else {
            false
        }
    }

    /// Like [`try_take_free`](Self::try_take_free) but never overtakes a queued writer.
    pub(crate) fn try_take_without_queueing(&mut self) -> bool {
        self.writers.is_empty() && self.try_take_free()
    }

    pub(crate) fn enqueue_writer(&mut self) -> (NodeId, Arc<WaitNode>) {
        self.writers.enqueue()
    }

    #[inline]
    pub(crate) fn is_queue_head(&self, id: NodeId) -> bool {
        self.writers.is_head(id)
    }

    /// Called by the head writer: stop admitting new readers.
    pub(crate) fn announce_writer(&mut self) {
        debug_assert!(!self.writers.is_empty());
        if self.phase == Phase::Reading {
            debug_assert!(self.readers_running > 0, "free lock should have been taken directly");
            self.set_phase(Phase::ReadingWritersWaiting);
        }
    }

    #[inline]
    pub(crate) fn handed_off(&self) -> bool {
        self.phase == Phase::Handoff
    }

    /// Whether a bounded writer, woken at `id`'s turn or by its deadline,
    /// has to leave the queue. A handoff already addressed to the head is
    /// taken even past the deadline: abandoning it would leave the lock in
    /// HANDOFF with no owner.
    pub(crate) fn gives_up_at_head(&self, id: NodeId, deadline_passed: bool) -> bool {
        !self.is_queue_head(id) || (deadline_passed && !self.handed_off())
    }

    /// The head writer was handed the lock: become the owner and retire its node.
    pub(crate) fn take_handoff(&mut self, id: NodeId) {
        debug_assert_eq!(self.phase, Phase::Handoff);
        debug_assert!(self.writers.is_head(id), "handoff taken by a non-head writer");
        self.set_phase(Phase::Writing);
        self.writers.pop_front();
        self.writers.recycle(id);
    }

    /// A queued writer timed out: unlink it and repair the phase.
    pub(crate) fn abandon_writer(&mut self, id: NodeId, readers: &Condvar) {
        let was_head = self.writers.unlink(id);
        self.writers.recycle(id);
        if !was_head {
            return;
        }
        debug_assert_ne!(self.phase, Phase::Handoff, "head writer abandoned a handoff");
        if self.writers.is_empty() {
            if self.phase == Phase::ReadingWritersWaiting {
                self.set_phase(Phase::Reading);
                self.admit_waiting_readers(readers);
            }
        } else {
            // the new head has to announce itself
            self.writers.notify_head();
        }
    }

    /// Waiting readers win over queued writers; otherwise hand off to the head.
    pub(crate) fn release_write(&mut self, readers: &Condvar) {
        debug_assert_eq!(self.phase, Phase::Writing, "write release without the write lock");
        debug_assert_eq!(self.readers_running, 0);
        if self.readers_waiting > 0 {
            let next = if self.writers.is_empty() {
                Phase::Reading
            } else {
                Phase::ReadingWritersWaiting
            };
            self.set_phase(next);
            self.admit_waiting_readers(readers);
        } else if !self.writers.is_empty() {
            self.hand_off();
        } else {
            self.set_phase(Phase::Reading);
        }
    }

    fn hand_off(&mut self) {
        debug_assert!(!self.writers.is_empty());
        self.set_phase(Phase::Handoff);
        counter!(METRIC_WRITER_HANDOFFS).increment(1);
        self.writers.notify_head();
    }

    // ---- diagnostics -------------------------------------------------------

    pub(crate) fn snapshot(&self) -> LockSnapshot {
        LockSnapshot {
            phase: self.phase,
            readers_running: self.readers_running,
            readers_waiting: self.readers_waiting,
            queued_writers: self.writers.len(),
            pooled_nodes: self.writers.pooled(),
            idle_nodes: self.writers.idle(),
        }
    }

    pub(crate) fn check_invariants(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        match self.phase {
            Phase::Reading => {
                assert!(self.writers.is_empty(), "writer queued in reading phase");
                assert_eq!(self.readers_waiting, 0, "reader left waiting in reading phase");
            }
            Phase::ReadingWritersWaiting => {
                assert!(!self.writers.is_empty(), "writers-waiting phase with empty queue");
                assert!(self.readers_running > 0, "writers-waiting phase with no reader to drain");
            }
            Phase::Handoff => {
                assert!(!self.writers.is_empty(), "handoff with empty queue");
            }
            Phase::Writing => {}
        }
        if self.readers_running > 0 {
            assert!(
                self.phase.admits_running_readers(),
                "{} readers running in phase {}",
                self.readers_running,
                self.phase
            );
        }
        self.writers.check_invariants();
    }
}
