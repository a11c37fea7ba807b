//! Fixed-capacity segment ("chunk"), the unit of allocation in a [`super::Stream`].
//!
//! A segment is a contiguous array of slots plus a forward link to the next
//! segment, published exactly once (null -> non-null, never rewritten). The
//! forward link doubles as an end-of-chunk wake chain: the first waiter that
//! observes the link (or `done()`) re-releases the semaphore before
//! returning, propagating the wakeup to whichever waiter parked after it.
//!
//! ## Why the forward link is a raw `AtomicPtr` and the stream's tail is not
//!
//! `next` is set at most once per segment and never reassigned afterwards, so
//! a reader that loads the pointer and then bumps the pointee's strong count
//! can never race a concurrent *drop* of that same value: nobody ever
//! replaces it. [`super::Stream`]'s tail pointer does not have that property
//! (it is reassigned every `segment_capacity` pushes), so it is guarded by an
//! `RwLock` instead: the write lock serializes allocation, and a read lock
//! (cheap and uncontended in the common case) is all the hot append/read
//! paths need. See `DESIGN.md` for the full rationale.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::{Arc, Weak};

use super::entry::Entry;
use super::Stream;
use crate::invariants::debug_assert_link_not_yet_set;
use crate::semaphore::Semaphore;

pub(super) struct Slot<T> {
    value: UnsafeCell<MaybeUninit<T>>,
    /// Readiness semaphore. 0 until committed, then permanently >= 1: both
    /// `wait()` and `try()` re-release immediately after a successful
    /// acquire, so the count never drains back to 0 once set.
    ready: Semaphore,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            value: UnsafeCell::new(MaybeUninit::uninit()),
            ready: Semaphore::new(0),
        }
    }
}

pub(super) struct Segment<T> {
    pub(super) start: i64,
    pub(super) stream: Weak<Stream<T>>,
    slots: Box<[Slot<T>]>,
    next: AtomicPtr<Segment<T>>,
    /// End-of-chunk semaphore: released once a forward link is published, or
    /// once by `done()` with no forward link at true end-of-stream.
    chunk_sem: Semaphore,
}

// SAFETY: slot values are written by at most one producer (the committer)
// before the readiness semaphore is released, and read only by threads that
// have observed that release (directly via `wait`, or via a `try` that
// checked the count). The semaphore's internal mutex provides the
// happens-before edge.
unsafe impl<T: Send> Send for Segment<T> {}
unsafe impl<T: Send> Sync for Segment<T> {}

impl<T> Segment<T> {
    pub(super) fn new(start: i64, capacity: usize, stream: Weak<Stream<T>>) -> Arc<Self> {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, Slot::new);
        Arc::new(Self {
            start,
            stream,
            slots: slots.into_boxed_slice(),
            next: AtomicPtr::new(std::ptr::null_mut()),
            chunk_sem: Semaphore::new(0),
        })
    }

    pub(super) fn capacity(&self) -> i64 {
        self.slots.len() as i64
    }

    /// Non-blocking read of the forward link. Safe to call concurrently with
    /// `set_next` (monotonic publish) because the pointer is only ever
    /// assigned once.
    pub(super) fn raw_next(&self) -> Option<Arc<Segment<T>>> {
        let ptr = self.next.load(Ordering::Acquire);
        if ptr.is_null() {
            None
        } else {
            // SAFETY: `ptr` was produced by `Arc::into_raw` in `set_next` and
            // is never invalidated: the owning strong count is only dropped
            // by this segment's own `Drop`, which cannot run while a caller
            // holds a live reference to `self` to make this call.
            unsafe {
                Arc::increment_strong_count(ptr);
                Some(Arc::from_raw(ptr))
            }
        }
    }

    /// Publishes `next` as the forward link. Single-writer: only called by
    /// `Stream::make_next` while holding the stream's tail lock.
    pub(super) fn set_next(&self, next: Arc<Segment<T>>) {
        debug_assert_link_not_yet_set!(self.next.load(Ordering::Relaxed));
        let ptr = Arc::into_raw(next).cast_mut();
        self.next.store(ptr, Ordering::Release);
        self.chunk_sem.release(); // unblock the first waiter
    }

    /// Marks this segment as the last one, waking anybody waiting on the
    /// forward link without ever setting one.
    pub(super) fn done(&self) {
        self.chunk_sem.release();
    }

    /// Ensures a next segment exists (allocating lazily through the stream if
    /// necessary) and returns it. Never blocks.
    fn make_next(self: &Arc<Self>) -> Option<Arc<Segment<T>>> {
        if let Some(next) = self.raw_next() {
            return Some(next);
        }
        self.stream.upgrade()?.make_next(self)
    }

    /// Blocks until a next segment is available (forward link published) or
    /// the stream is marked done with no further segment.
    fn wait_next(self: &Arc<Self>) -> Option<Arc<Segment<T>>> {
        if let Some(next) = self.raw_next() {
            return Some(next);
        }
        self.chunk_sem.acquire();
        self.chunk_sem.release(); // unblock the next waiter in the chain
        self.raw_next()
    }

    /// Returns the entry at the given segment-relative index, allocating
    /// forward segments as needed. Never blocks.
    pub(super) fn entry(self: &Arc<Self>, index: i64) -> Entry<T> {
        let mut seg = Arc::clone(self);
        let mut idx = index;
        loop {
            let cap = seg.capacity();
            if idx < cap {
                return Entry::new(seg, idx as usize);
            }
            let next = seg
                .make_next()
                .expect("stream must still accept writes while assigning a reserved index");
            seg = next;
            idx -= cap;
        }
    }

    /// Blocks until the entry at the given segment-relative index is ready.
    /// Returns `None` at end-of-stream.
    pub(super) fn wait(self: &Arc<Self>, index: i64) -> Option<Entry<T>> {
        let mut seg = Arc::clone(self);
        let mut idx = index;
        loop {
            let cap = seg.capacity();
            if idx < cap {
                let slot = &seg.slots[idx as usize];
                slot.ready.acquire();
                slot.ready.release(); // unblock the next waiter
                return Some(Entry::new(seg, idx as usize));
            }
            seg = seg.wait_next()?;
            idx -= cap;
        }
    }

    /// Non-blocking counterpart to `wait`: returns the entry only if it is
    /// already ready, without allocating or waiting.
    pub(super) fn try_entry(self: &Arc<Self>, index: i64) -> Option<Entry<T>> {
        let mut seg = Arc::clone(self);
        let mut idx = index;
        loop {
            let cap = seg.capacity();
            if idx < cap {
                return (seg.slots[idx as usize].ready.count() > 0)
                    .then(|| Entry::new(Arc::clone(&seg), idx as usize));
            }
            seg = seg.raw_next()?;
            idx -= cap;
        }
    }

    pub(super) fn is_ready(&self, index: usize) -> bool {
        self.slots[index].ready.count() > 0
    }

    pub(super) fn value_ptr(&self, index: usize) -> *const T {
        self.slots[index].value.get().cast()
    }

    /// Writes `value` into the slot and publishes readiness. Called exactly
    /// once, immediately after a producer reserves this slot.
    pub(super) fn commit(&self, index: usize, value: T) {
        let slot = &self.slots[index];
        // SAFETY: single-writer; the caller reserved this index via
        // `Stream::push`'s `wseq` fetch-add, which hands out each index
        // exactly once.
        unsafe {
            (*slot.value.get()).write(value);
        }
        slot.ready.release();
    }
}

impl<T> Drop for Segment<T> {
    fn drop(&mut self) {
        let ptr = *self.next.get_mut();
        if !ptr.is_null() {
            // SAFETY: balances the single `Arc::into_raw` performed in
            // `set_next`; this runs at most once, when the segment itself is
            // being dropped.
            unsafe {
                drop(Arc::from_raw(ptr));
            }
        }
        for slot in self.slots.iter_mut() {
            if slot.ready.count() > 0 {
                // SAFETY: readiness > 0 implies `commit` wrote this slot.
                unsafe {
                    slot.value.get_mut().assume_init_drop();
                }
            }
        }
    }
}
