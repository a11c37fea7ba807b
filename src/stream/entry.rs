//! A handle to a single slot in a [`super::Stream`].
//!
//! There is no nil-entry special case: call sites that need "no entry yet"
//! use `Option<Entry<T>>` instead.

use std::sync::Arc;

use super::segment::Segment;

/// A handle to one committed (or not-yet-committed) slot in a stream.
///
/// Cloning an `Entry` is cheap (an `Arc` bump) and yields another handle to
/// the same slot.
pub struct Entry<T> {
    segment: Arc<Segment<T>>,
    index: usize,
}

impl<T> Entry<T> {
    pub(super) fn new(segment: Arc<Segment<T>>, index: usize) -> Self {
        Self { segment, index }
    }

    /// The entry's absolute sequence number within its stream.
    pub fn seq(&self) -> i64 {
        self.segment.start + self.index as i64
    }

    /// How many entries have been pushed to the stream since this one.
    ///
    /// Returns `0` if the owning stream has already been dropped.
    pub fn age(&self) -> i64 {
        self.segment
            .stream
            .upgrade()
            .map_or(0, |stream| stream.seq() - self.seq())
    }

    /// Returns a reference to the committed value, or `None` if this entry
    /// has not been committed yet.
    pub fn value(&self) -> Option<&T> {
        self.segment.is_ready(self.index).then(|| {
            // SAFETY: `is_ready` observed the readiness semaphore count > 0,
            // which happens-after the `commit` that initialized this slot.
            unsafe { &*self.segment.value_ptr(self.index) }
        })
    }

    /// Blocks until the entry one past this one is committed, returning it.
    ///
    /// Returns `None` at end-of-stream.
    pub fn next(&self) -> Option<Entry<T>> {
        self.segment.wait(self.index as i64 + 1)
    }

    /// Non-blocking counterpart to [`Entry::next`]: returns the next entry
    /// only if it is already committed.
    pub fn try_next(&self) -> Option<Entry<T>> {
        self.segment.try_entry(self.index as i64 + 1)
    }

    /// Commits `value` to the stream's next slot and returns its entry.
    ///
    /// Equivalent to `stream.push(value)`, except the segment walk starts
    /// from this entry's own segment instead of the stream's current tail,
    /// useful when a caller already holds a nearby entry (e.g. is walking
    /// the stream sequentially) and wants to skip the tail lock.
    ///
    /// # Panics
    ///
    /// Panics if the owning stream has already been dropped or marked done.
    pub fn push(&self, value: T) -> Entry<T> {
        let stream = self
            .segment
            .stream
            .upgrade()
            .expect("stream dropped while an entry into it is still live");
        let global = stream.claim_seq();
        let relative = global - self.segment.start;
        let entry = self.segment.entry(relative);
        entry.commit_value(value);
        entry
    }

    pub(super) fn commit_value(&self, value: T) {
        self.segment.commit(self.index, value);
    }
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            segment: Arc::clone(&self.segment),
            index: self.index,
        }
    }
}
