use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use super::Ring;
use crate::invariants::{debug_assert_reservation_fits, debug_assert_rseq_monotonic};
use crate::semaphore::Semaphore;

/// The part of a writer's state visible to its successor in the hand-off
/// chain. Published into `Ring::writer` by `swap_writer`.
pub(super) struct WriterNode {
    /// End of this writer's reservation window. Written once by the owning
    /// writer at the end of `reserve`, read once by the successor after it
    /// acquires `reserve`; the semaphore acquire/release pair provides the
    /// happens-before edge, so `Relaxed` ordering on the atomic itself is
    /// sufficient.
    next: AtomicI64,
    /// Released by the next writer once it has read `next`, satisfied at
    /// construction (count 1) so the first `reserve` call does not block.
    ready: Semaphore,
    /// Released once `next` is safe to read; acquired by the successor.
    reserve: Semaphore,
    /// Released once this writer's commit has fully landed; acquired by the
    /// successor's own `commit`, so commits land in reservation order.
    commit: Semaphore,
}

/// A single producer's handle for reserving and committing windows of
/// sequence numbers on a [`Ring`].
///
/// Not meant to be shared: `reserve` and `commit` calls on the same `Writer`
/// must come from one logical producer, one at a time.
pub struct Writer {
    ring: Arc<Ring>,
    node: Arc<WriterNode>,
    prev: Option<Arc<WriterNode>>,
    seq: i64,
    end: i64,
}

impl Writer {
    pub(super) fn new(ring: Arc<Ring>) -> Self {
        Self {
            ring,
            node: Arc::new(WriterNode {
                next: AtomicI64::new(0),
                ready: Semaphore::new(1),
                reserve: Semaphore::new(0),
                commit: Semaphore::new(0),
            }),
            prev: None,
            seq: -1,
            end: -1,
        }
    }

    /// Reserves the next `n` sequence numbers, blocking until any readers
    /// still occupying those slots have moved past them.
    ///
    /// Returns the first sequence number in the reserved window; the window
    /// spans `[seq, seq + n)`.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the ring's capacity.
    pub fn reserve(&mut self, n: i64) -> i64 {
        assert!(
            n <= self.ring.mask() + 1,
            "reservation of {n} exceeds ring capacity {}",
            self.ring.mask() + 1
        );
        debug_assert_reservation_fits!(n, self.ring.mask());

        // Wait for whoever is currently reading our previous `next` value
        // (if any) to finish, so we can safely overwrite it below.
        self.node.ready.acquire();

        let prev = self.ring.swap_writer(Arc::clone(&self.node));
        let seq = match &prev {
            None => self.ring.rseq.load(Ordering::Acquire),
            Some(prev_node) => {
                prev_node.reserve.acquire_spin();
                prev_node.next.load(Ordering::Relaxed)
            }
        };
        let next = seq + n;

        self.node.next.store(next, Ordering::Relaxed);
        self.node.reserve.release_handoff();

        if next > self.end {
            self.end = self.ring.wait_readers(next);
        }

        if self.ring.config.enable_metrics {
            self.ring
                .metrics
                .reservations
                .fetch_add(1, Ordering::Relaxed);
        }

        self.seq = seq;
        self.prev = prev;
        seq
    }

    /// Commits the window reserved by the most recent `reserve` call, making
    /// it visible to readers once every earlier reservation has also
    /// committed.
    pub fn commit(&mut self) {
        if let Some(prev) = self.prev.take() {
            prev.commit.acquire();
            prev.ready.release_handoff();
        }

        let committed = self.node.next.load(Ordering::Relaxed);
        let old_rseq = self.ring.rseq.swap(committed, Ordering::AcqRel);
        debug_assert_rseq_monotonic!(old_rseq, committed);

        if self.ring.clear_writer(&self.node) {
            self.node.reserve.set_count(0);
            self.node.ready.set_count(1);
        } else {
            self.node.commit.release_handoff();
        }

        if self.ring.config.enable_metrics {
            self.ring.metrics.commits.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// The first sequence number returned by the most recent `reserve` call.
    pub fn seq(&self) -> i64 {
        self.seq
    }
}
