//! A bounded, power-of-two sequencer shared by one writer chain and many
//! readers.
//!
//! A `Ring` hands out contiguous windows of sequence numbers to writers (via
//! [`Writer`]) and gates those windows on the slowest live reader (via
//! [`Reader`]), but never stores any data itself. Callers index their own
//! external buffer with `seq & mask`.

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

use std::sync::atomic::{AtomicI64, AtomicPtr, Ordering};
use std::sync::{Arc, Mutex};

use writer::WriterNode;

use crate::backoff::Backoff;
use crate::config::RingConfig;
use crate::error::RingError;
use crate::invariants::debug_assert_reader_gate_respected;
use crate::metrics::RingMetrics;

/// Wrapper that pads its contents to a full cache line (plus headroom for
/// adjacent-line prefetch) to prevent false sharing between the writer
/// hand-off pointer and the reader-gated commit sequence.
#[repr(align(128))]
struct CacheAligned<T> {
    value: T,
}

impl<T> CacheAligned<T> {
    const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> std::ops::Deref for CacheAligned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T> std::ops::DerefMut for CacheAligned<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.value
    }
}

/// A bounded sequencer with `1 << size_bits` slots.
pub struct Ring {
    mask: i64,
    readers: Mutex<Vec<Arc<AtomicI64>>>,
    writer: CacheAligned<AtomicPtr<WriterNode>>,
    rseq: CacheAligned<AtomicI64>,
    config: RingConfig,
    metrics: RingMetricsCell,
}

#[derive(Default)]
struct RingMetricsCell {
    reservations: AtomicI64,
    commits: AtomicI64,
    reader_waits: AtomicI64,
    reader_overruns: AtomicI64,
}

impl Ring {
    /// Creates a new ring with default configuration (1024 slots).
    pub fn new() -> Arc<Self> {
        Self::with_config(RingConfig::default())
    }

    /// Creates a new ring with custom configuration.
    pub fn with_config(config: RingConfig) -> Arc<Self> {
        Arc::new(Self {
            mask: config.mask(),
            readers: Mutex::new(Vec::new()),
            writer: CacheAligned::new(AtomicPtr::new(std::ptr::null_mut())),
            rseq: CacheAligned::new(AtomicI64::new(0)),
            config,
            metrics: RingMetricsCell::default(),
        })
    }

    /// Creates a new ring with `size` slots, returning an error instead of
    /// panicking if `size` is not a power of two.
    pub fn try_new(size: i64) -> Result<Arc<Self>, RingError> {
        if size <= 0 || (size as u64).count_ones() != 1 {
            return Err(RingError::NotPowerOfTwo { size });
        }
        let size_bits = size.trailing_zeros() as u8;
        Ok(Self::with_config(RingConfig::new(size_bits, false)))
    }

    /// The ring's index mask (`size - 1`).
    pub fn mask(&self) -> i64 {
        self.mask
    }

    /// Creates a new writer bound to this ring.
    ///
    /// A `Writer` is meant to be owned by a single producer thread for its
    /// whole lifetime: `reserve`/`commit` calls on the same instance must not
    /// overlap or race each other.
    pub fn new_writer(self: &Arc<Self>) -> Writer {
        Writer::new(Arc::clone(self))
    }

    /// Creates a new reader bound to this ring, starting just behind the
    /// ring's current commit point.
    pub fn new_reader(self: &Arc<Self>) -> Reader {
        Reader::new(Arc::clone(self))
    }

    /// Returns a snapshot of this ring's metrics.
    pub fn metrics(&self) -> RingMetrics {
        RingMetrics {
            reservations: self.metrics.reservations.load(Ordering::Relaxed) as u64,
            commits: self.metrics.commits.load(Ordering::Relaxed) as u64,
            reader_waits: self.metrics.reader_waits.load(Ordering::Relaxed) as u64,
            reader_overruns: self.metrics.reader_overruns.load(Ordering::Relaxed) as u64,
        }
    }

    fn register_reader(&self, seq: &Arc<AtomicI64>) {
        self.readers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::clone(seq));
    }

    /// Swaps `node` in as the current writer, returning whoever held that
    /// slot before (if any). Ownership of the old node's strong count
    /// transfers to the caller.
    fn swap_writer(&self, node: Arc<WriterNode>) -> Option<Arc<WriterNode>> {
        let new_ptr = Arc::into_raw(node).cast_mut();
        let old_ptr = self.writer.swap(new_ptr, Ordering::AcqRel);
        if old_ptr.is_null() {
            None
        } else {
            // SAFETY: `old_ptr` was published by a prior `swap_writer` via
            // `Arc::into_raw`; the swap we just performed atomically removed
            // it from the slot, transferring its strong count to us.
            Some(unsafe { Arc::from_raw(old_ptr) })
        }
    }

    /// Clears the writer slot if it still holds `expect`, reclaiming the
    /// strong count that `swap_writer` donated to the slot.
    fn clear_writer(&self, expect: &Arc<WriterNode>) -> bool {
        let expect_ptr = Arc::as_ptr(expect).cast_mut();
        match self.writer.compare_exchange(
            expect_ptr,
            std::ptr::null_mut(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(old) => {
                // SAFETY: balances the `Arc::into_raw` that published `old`
                // into the slot; the CAS just removed it, so reclaiming the
                // strong count here (rather than leaking it) is correct.
                unsafe { drop(Arc::from_raw(old)) };
                true
            }
            Err(_) => false,
        }
    }

    fn min_reader_seq(&self, max: i64) -> i64 {
        let readers = self.readers.lock().unwrap_or_else(|e| e.into_inner());
        let mut min = max;
        for seq in readers.iter() {
            let seq = seq.load(Ordering::Acquire);
            if seq < min && seq != -2 {
                min = seq;
            }
        }
        min
    }

    /// Blocks until every live reader has advanced far enough that `seq`
    /// would not overrun the slowest one, returning the furthest sequence
    /// currently safe to write up to.
    fn wait_readers(&self, seq: i64) -> i64 {
        let mut backoff = Backoff::new();
        loop {
            let max = self.min_reader_seq(seq) + self.mask;
            if seq > max {
                if self.config.enable_metrics {
                    self.metrics.reader_waits.fetch_add(1, Ordering::Relaxed);
                }
                backoff.snooze();
                continue;
            }
            debug_assert_reader_gate_respected!(seq, max - self.mask, self.mask);
            return max;
        }
    }

    /// Blocks until at least `seq` has been committed, returning the highest
    /// committed sequence.
    fn wait_writers(&self, seq: i64) -> i64 {
        let mut backoff = Backoff::new();
        loop {
            let max = self.rseq.load(Ordering::Acquire) - 1;
            if max >= seq {
                return max;
            }
            backoff.snooze();
        }
    }
}

impl Drop for Ring {
    fn drop(&mut self) {
        let ptr = *self.writer.get_mut();
        if !ptr.is_null() {
            // SAFETY: balances whichever `swap_writer` last published into
            // the slot; nobody else can observe `self.writer` once we have
            // `&mut self`.
            unsafe { drop(Arc::from_raw(ptr)) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_writer_single_reader_sees_every_seq() {
        let ring = Ring::with_config(RingConfig::new(4, false)); // 16 slots
        let mut writer = ring.new_writer();
        let mut reader = ring.new_reader();

        for _ in 0..100 {
            let seq = writer.reserve(1);
            writer.commit();
            assert_eq!(reader.next(), seq);
        }
    }

    #[test]
    fn try_new_rejects_non_power_of_two() {
        assert!(matches!(
            Ring::try_new(3),
            Err(RingError::NotPowerOfTwo { size: 3 })
        ));
        assert!(Ring::try_new(8).is_ok());
    }

    #[test]
    fn reader_batch_reports_writer_progress() {
        let ring = Ring::with_config(RingConfig::new(4, false));
        let mut writer = ring.new_writer();
        let mut reader = ring.new_reader();

        let seq = writer.reserve(5);
        writer.commit();
        assert_eq!(reader.next(), seq);
        assert!(reader.batch() >= seq + 4);
    }

    #[test]
    #[should_panic(expected = "reservation")]
    fn reserve_larger_than_ring_panics() {
        let ring = Ring::with_config(RingConfig::new(2, false)); // 4 slots
        let mut writer = ring.new_writer();
        writer.reserve(5);
    }
}
