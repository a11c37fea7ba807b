use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use super::Ring;

/// Sentinel stored in a reader's sequence cell once it has been closed,
/// excluding it from the ring's slowest-reader scan.
const CLOSED: i64 = -2;

/// A single consumer's cursor into a [`Ring`].
///
/// Not meant to be shared: `next` calls on the same `Reader` must come from
/// one logical consumer, one at a time. Multiple readers may independently
/// track the same ring.
pub struct Reader {
    ring: Arc<Ring>,
    seq: Arc<AtomicI64>,
    end: i64,
}

impl Reader {
    pub(super) fn new(ring: Arc<Ring>) -> Self {
        let seq = Arc::new(AtomicI64::new(ring.rseq.load(Ordering::Acquire) - 1));
        ring.register_reader(&seq);
        Self { ring, seq, end: -1 }
    }

    /// The highest sequence number known to be committed as of the last
    /// `next` call.
    pub fn batch(&self) -> i64 {
        self.end
    }

    /// Marks this reader closed, excluding it from the ring's
    /// slowest-reader accounting so writers no longer wait on it.
    pub fn close(&self) {
        self.seq.store(CLOSED, Ordering::Release);
    }

    /// The ring's index mask.
    pub fn mask(&self) -> i64 {
        self.ring.mask()
    }

    /// Advances to the next sequence number, blocking until a writer has
    /// committed it.
    ///
    /// # Panics
    ///
    /// Panics, and closes this reader, if it fell far enough behind that the
    /// next slot has already been overwritten by a writer (i.e. more than
    /// `mask + 1` sequence numbers behind the current commit point).
    pub fn next(&mut self) -> i64 {
        let seq = self.seq.load(Ordering::Relaxed) + 1;
        let min = self.ring.rseq.load(Ordering::Acquire) - self.ring.mask();
        if seq < min {
            self.seq.store(CLOSED, Ordering::Release);
            if self.ring.config.enable_metrics {
                self.ring
                    .metrics
                    .reader_overruns
                    .fetch_add(1, Ordering::Relaxed);
            }
            panic!("reader sequence {seq} too old, writer already past {min}");
        }
        self.seq.store(seq, Ordering::Release);
        if seq >= self.end {
            self.end = self.ring.wait_writers(seq);
        }
        seq
    }
}
