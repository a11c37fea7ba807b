//! An unbounded, append-only, multi-reader sequence built from linked
//! fixed-capacity segments.
//!
//! A `Stream<T>` hands out a strictly increasing sequence number to every
//! pushed value; readers walk forward through `Entry` handles, blocking on
//! not-yet-committed slots and never on segments that are already full and
//! linked.

mod entry;
mod segment;

pub use entry::Entry;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use segment::Segment;

use crate::config::StreamConfig;
use crate::invariants::{debug_assert_segment_start_aligned, debug_assert_wseq_monotonic};
use crate::metrics::StreamMetrics;

struct TailState<T> {
    segment: Arc<Segment<T>>,
    /// Set once `done()` is called; further allocation beyond the current
    /// tail's capacity is refused instead of happening silently.
    done: bool,
}

/// An unbounded append-only stream of committed values.
///
/// A `Stream` is always held behind an `Arc` (constructed via
/// [`Stream::new`] or [`Stream::with_config`]) because each [`Segment`]
/// holds a weak back-reference to it, established at construction time via
/// `Arc::new_cyclic`.
pub struct Stream<T> {
    /// The very first segment ever allocated, retained so [`Stream::head`]
    /// can always reach absolute index 0 regardless of how far `tail` has
    /// since advanced.
    head: Arc<Segment<T>>,
    tail: RwLock<TailState<T>>,
    /// Next sequence number to assign. Monotonically increasing.
    wseq: AtomicI64,
    self_weak: Weak<Stream<T>>,
    config: StreamConfig,
    metrics: StreamMetricsCell,
}

#[derive(Default)]
struct StreamMetricsCell {
    segments_allocated: AtomicI64,
    entries_committed: AtomicI64,
}

impl<T> Stream<T> {
    /// Creates a new stream with default configuration.
    pub fn new() -> Arc<Self> {
        Self::with_config(StreamConfig::default())
    }

    /// Creates a new stream with custom configuration.
    pub fn with_config(config: StreamConfig) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Stream<T>>| {
            let segment = Segment::new(0, config.segment_capacity, weak.clone());
            Stream {
                head: Arc::clone(&segment),
                tail: RwLock::new(TailState {
                    segment,
                    done: false,
                }),
                wseq: AtomicI64::new(0),
                self_weak: weak.clone(),
                config,
                metrics: StreamMetricsCell::default(),
            }
        })
    }

    /// Commits `value` as the next entry and returns its handle, or `None`
    /// if the stream has already been marked [`Stream::done`].
    ///
    /// A push racing a concurrent `done()` may itself return either way;
    /// callers must tolerate a refusal even immediately after a successful
    /// push.
    pub fn push(&self, value: T) -> Option<Entry<T>> {
        let (segment, done) = {
            let tail = self.tail.read().expect("stream tail lock poisoned");
            (Arc::clone(&tail.segment), tail.done)
        };
        if done {
            return None;
        }
        let global = self.claim_seq();
        // Walking past `segment`'s capacity may allocate further segments,
        // which takes the tail write lock, so the read lock above must
        // already be released by the time we get here.
        let relative = global - segment.start;
        let entry = segment.entry(relative);
        entry.commit_value(value);
        if self.config.enable_metrics {
            self.metrics
                .entries_committed
                .fetch_add(1, Ordering::Relaxed);
        }
        Some(entry)
    }

    /// Blocks until the very first entry pushed to the stream is committed,
    /// and returns it.
    pub fn head(&self) -> Entry<T> {
        self.head
            .wait(0)
            .expect("index 0 is always within the first segment's capacity")
    }

    /// Blocks until the next entry past every entry pushed so far is
    /// committed, and returns it. Returns `None` once the stream is marked
    /// done with nothing further to wait for.
    pub fn next(&self) -> Option<Entry<T>> {
        let tail = self.tail.read().expect("stream tail lock poisoned");
        let segment = Arc::clone(&tail.segment);
        drop(tail);
        let global = self.wseq.load(Ordering::Acquire);
        let relative = global - segment.start;
        segment.wait(relative)
    }

    /// Reserves the next global sequence number without committing a value.
    ///
    /// Used by [`Entry::push`] so it can resume the walk from a nearby
    /// segment instead of re-reading the stream's tail.
    pub(super) fn claim_seq(&self) -> i64 {
        let global = self.wseq.fetch_add(1, Ordering::AcqRel);
        debug_assert_wseq_monotonic!(global, global + 1);
        global
    }

    /// Returns the highest sequence number assigned so far, or `-1` if
    /// nothing has been pushed yet.
    pub fn seq(&self) -> i64 {
        self.wseq.load(Ordering::Acquire) - 1
    }

    /// Returns the number of entries ever pushed to this stream.
    pub fn len(&self) -> i64 {
        self.wseq.load(Ordering::Acquire)
    }

    /// Returns `true` if no entry has ever been pushed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Marks the stream as finished: no further pushes are accepted, and any
    /// reader currently blocked waiting on the next entry past the last one
    /// committed is woken with `None`.
    ///
    /// Idempotent: calling this more than once has no additional effect.
    pub fn done(&self) {
        let mut tail = self.tail.write().expect("stream tail lock poisoned");
        if tail.done {
            return;
        }
        tail.done = true;
        tail.segment.done();
    }

    /// Returns `true` if [`Stream::done`] has been called.
    pub fn is_done(&self) -> bool {
        self.tail.read().expect("stream tail lock poisoned").done
    }

    /// Returns a snapshot of this stream's metrics.
    pub fn metrics(&self) -> StreamMetrics {
        StreamMetrics {
            segments_allocated: self.metrics.segments_allocated.load(Ordering::Relaxed) as u64,
            entries_committed: self.metrics.entries_committed.load(Ordering::Relaxed) as u64,
        }
    }

    /// Allocates (or returns the already-allocated) segment following `from`.
    ///
    /// Called by [`Segment::make_next`] when a reader or writer walks past
    /// the end of a segment with no forward link yet.
    pub(super) fn make_next(&self, from: &Segment<T>) -> Option<Arc<Segment<T>>> {
        let mut tail = self.tail.write().expect("stream tail lock poisoned");
        if let Some(existing) = from.raw_next() {
            return Some(existing);
        }
        if tail.done {
            return None;
        }
        let start = from.start + from.capacity();
        debug_assert_segment_start_aligned!(start, self.config.segment_capacity);
        let next = Segment::new(start, self.config.segment_capacity, self.self_weak.clone());
        from.set_next(Arc::clone(&next));
        tail.segment = Arc::clone(&next);
        if self.config.enable_metrics {
            self.metrics
                .segments_allocated
                .fetch_add(1, Ordering::Relaxed);
        }
        Some(next)
    }
}
