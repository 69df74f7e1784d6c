//! FIFO queue of waiting writers backed by a recycling node pool.
//!
//! Every blocked writer owns one [`WaitNode`] carrying its private wake
//! signal, so a release can wake exactly the head of the queue instead of
//! broadcasting to all writers. Nodes live in a slab addressed by
//! [`NodeId`]; the queue links slots through `next` indices with separate
//! head/tail, which keeps append and head removal O(1). Removing an
//! interior node (a timed-out writer) is a scan from the head.
//!
//! Retired slots go onto a free-list and are handed out again before the
//! slab grows. A slot's node is an `Arc` so the waiting thread can keep
//! its condition variable while the slab itself is borrowed by the monitor
//! mutex guard.

use crate::constants::{INITIAL_POOL_CAPACITY, METRIC_LABEL_LOCK, METRIC_POOLED_NODES};
use log::debug;
use metrics::gauge;
use parking_lot::Condvar;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(0);

/// Stable handle of a slot in the node pool.
pub(crate) type NodeId = usize;

/// Private wake channel of one waiting writer.
#[derive(Default)]
pub(crate) struct WaitNode {
    wake: Condvar,
}

impl WaitNode {
    #[inline]
    pub(crate) fn wake(&self) -> &Condvar {
        &self.wake
    }
}

struct Slot {
    node: Arc<WaitNode>,
    next: Option<NodeId>,
    linked: bool,
}

pub(crate) struct WaitQueue {
    slots: Vec<Slot>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    free: Vec<NodeId>,
    len: usize,
    /// Labels this pool's gauge; each lock owns one queue.
    instance: u64,
}

impl WaitQueue {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::with_capacity(INITIAL_POOL_CAPACITY),
            head: None,
            tail: None,
            free: Vec::with_capacity(INITIAL_POOL_CAPACITY),
            len: 0,
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Claim a node (recycled if possible) and append it at the tail.
    ///
    /// Returns the node's id and a shared handle on its wake signal.
    pub(crate) fn enqueue(&mut self) -> (NodeId, Arc<WaitNode>) {
        let id = self.claim();
        let slot = &mut self.slots[id];
        slot.next = None;
        slot.linked = true;
        let node = Arc::clone(&slot.node);

        match self.tail {
            Some(tail) => {
                debug_assert!(self.head.is_some());
                self.slots[tail].next = Some(id);
            }
            None => {
                debug_assert!(self.head.is_none());
                self.head = Some(id);
            }
        }
        self.tail = Some(id);
        self.len += 1;
        (id, node)
    }

    fn claim(&mut self) -> NodeId {
        if let Some(id) = self.free.pop() {
            return id;
        }
        let id = self.slots.len();
        self.slots.push(Slot {
            node: Arc::new(WaitNode::default()),
            next: None,
            linked: false,
        });
        debug!(
            "[POOL] lock #{} wait-node pool grew to {} nodes",
            self.instance,
            self.slots.len()
        );
        gauge!(METRIC_POOLED_NODES, METRIC_LABEL_LOCK => self.instance.to_string())
            .set(self.slots.len() as f64);
        id
    }

    #[inline]
    pub(crate) fn is_head(&self, id: NodeId) -> bool {
        self.head == Some(id)
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Wake the writer at the head of the queue, if any.
    pub(crate) fn notify_head(&self) -> bool {
        match self.head {
            Some(head) => self.slots[head].node.wake.notify_one(),
            None => false,
        }
    }

    /// Unlink the head. The node is *not* recycled.
    pub(crate) fn pop_front(&mut self) -> Option<NodeId> {
        let id = self.head?;
        self.head = self.slots[id].next.take();
        if self.head.is_none() {
            self.tail = None;
        }
        self.slots[id].linked = false;
        self.len -= 1;
        Some(id)
    }

    /// Unlink `id` wherever it sits in the queue.
    ///
    /// Returns `true` if it was the head. Unlinking a node that is not
    /// queued is a no-op.
    pub(crate) fn unlink(&mut self, id: NodeId) -> bool {
        if !self.slots[id].linked {
            return false;
        }
        if self.head == Some(id) {
            self.pop_front();
            return true;
        }

        let mut cursor = self.head;
        while let Some(prev) = cursor {
            let next = self.slots[prev].next;
            if next == Some(id) {
                self.slots[prev].next = self.slots[id].next.take();
                if self.tail == Some(id) {
                    self.tail = Some(prev);
                }
                self.slots[id].linked = false;
                self.len -= 1;
                return false;
            }
            cursor = next;
        }
        debug_assert!(false, "linked wait node {id} is unreachable from the head");
        false
    }

    /// Return an unlinked node to the free-list.
    pub(crate) fn recycle(&mut self, id: NodeId) {
        debug_assert!(!self.slots[id].linked, "recycling queued wait node {id}");
        debug_assert!(!self.free.contains(&id), "wait node {id} recycled twice");
        self.free.push(id);
    }

    /// Nodes ever allocated.
    #[inline]
    pub(crate) fn pooled(&self) -> usize {
        self.slots.len()
    }

    /// Nodes parked on the free-list.
    #[inline]
    pub(crate) fn idle(&self) -> usize {
        self.free.len()
    }

    /// Finite, acyclic chain from head whose last element is `tail`.
    pub(crate) fn check_invariants(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        let mut seen = 0usize;
        let mut last = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            assert!(seen < self.slots.len(), "cycle in writer queue");
            assert!(self.slots[id].linked, "unlinked node {id} reachable from head");
            seen += 1;
            last = Some(id);
            cursor = self.slots[id].next;
        }
        assert_eq!(seen, self.len, "writer queue length out of sync");
        assert_eq!(last, self.tail, "writer queue tail out of sync");
        assert_eq!(self.head.is_none(), self.tail.is_none());
    }

    #[cfg(test)]
    fn node(&self, id: NodeId) -> &Arc<WaitNode> {
        &self.slots[id].node
    }

    #[cfg(test)]
    fn ids(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.slots[id].next;
        }
        out
    }
}
