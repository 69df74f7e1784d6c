//! Shared data types: the lock phase and its diagnostic snapshot

use std::fmt;

/// Coarse-grained mode of the lock; drives every admission decision.
///
/// Usual cycle: `Reading -> ReadingWritersWaiting -> Handoff -> Writing -> Reading`.
/// Shortcuts:
///   - `Reading -> Writing` when a writer arrives and no reader runs,
///   - `Writing -> Handoff` when a writer releases, another writer is queued
///     and no reader waits,
///   - `ReadingWritersWaiting -> Reading` when the only queued writer gives up.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No writer queued. Readers are admitted immediately.
    Reading,
    /// Readers still running, at least one writer queued. New readers block.
    ReadingWritersWaiting,
    /// The head writer was signalled and is taking ownership.
    Handoff,
    /// One writer holds the lock.
    Writing,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Reading => "reading",
            Phase::ReadingWritersWaiting => "reading, writers waiting",
            Phase::Handoff => "handoff",
            Phase::Writing => "writing",
        }
    }

    /// Phases in which running readers may exist.
    #[inline]
    pub fn admits_running_readers(self) -> bool {
        matches!(self, Phase::Reading | Phase::ReadingWritersWaiting)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of the lock bookkeeping, taken under the monitor mutex.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LockSnapshot {
    pub phase: Phase,
    pub readers_running: usize,
    pub readers_waiting: usize,
    pub queued_writers: usize,
    /// Wait nodes ever allocated by this lock.
    pub pooled_nodes: usize,
    /// Wait nodes currently parked on the free-list.
    pub idle_nodes: usize,
}

impl LockSnapshot {
    /// Same lock-visible state, ignoring how large the node pool has grown.
    pub fn same_state(&self, other: &LockSnapshot) -> bool {
        self.phase == other.phase
            && self.readers_running == other.readers_running
            && self.readers_waiting == other.readers_waiting
            && self.queued_writers == other.queued_writers
    }

    /// True when nobody holds or waits for the lock.
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Reading
            && self.readers_running == 0
            && self.readers_waiting == 0
            && self.queued_writers == 0
    }
}
