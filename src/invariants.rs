//! Debug assertion macros for stream/ring invariants.
//!
//! Only active under `#[cfg(debug_assertions)]`, so there is zero overhead in
//! release builds. They document the exact invariant being checked and where.

// =============================================================================
// INV-SEG-01: Segment start alignment
// =============================================================================

/// `start` must be a non-negative multiple of the segment capacity.
///
/// Used in: `Stream::make_next` after computing a new segment's `start`.
macro_rules! debug_assert_segment_start_aligned {
    ($start:expr, $capacity:expr) => {
        debug_assert!(
            $start >= 0 && $start % ($capacity as i64) == 0,
            "INV-SEG-01 violated: segment start {} is not a multiple of capacity {}",
            $start,
            $capacity
        )
    };
}

// =============================================================================
// INV-SEG-02: Forward link publishes at most once
// =============================================================================

/// The forward link transitions null -> non-null exactly once.
///
/// Used in: `Segment::set_next` before the `compare_exchange`.
macro_rules! debug_assert_link_not_yet_set {
    ($current:expr) => {
        debug_assert!(
            $current.is_null(),
            "INV-SEG-02 violated: forward link already set"
        )
    };
}

// =============================================================================
// INV-STR-01: wseq is monotone
// =============================================================================

/// `wseq` (the stream's next-index-to-assign counter) only increases.
///
/// Used in: `Stream::push` after `fetch_add`.
macro_rules! debug_assert_wseq_monotonic {
    ($old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "INV-STR-01 violated: wseq decreased from {} to {}",
            $old,
            $new
        )
    };
}

// =============================================================================
// INV-RNG-01: Reservation fits the ring
// =============================================================================

/// A single reservation must never exceed the ring's capacity.
///
/// Used in: `Writer::reserve` before swapping onto the writer-tail.
macro_rules! debug_assert_reservation_fits {
    ($n:expr, $mask:expr) => {
        debug_assert!(
            ($n as i64) <= $mask + 1,
            "INV-RNG-01 violated: reservation {} exceeds ring capacity {}",
            $n,
            $mask + 1
        )
    };
}

// =============================================================================
// INV-RNG-02: rseq is monotone
// =============================================================================

/// `rseq` (highest fully committed reservation end) only increases.
///
/// Used in: `Writer::commit` after storing `next` into `ring.rseq`.
macro_rules! debug_assert_rseq_monotonic {
    ($old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "INV-RNG-02 violated: rseq decreased from {} to {}",
            $old,
            $new
        )
    };
}

// =============================================================================
// INV-RNG-03: reader gating, no writer races more than mask+1 ahead of the
// slowest live reader
// =============================================================================

/// After `waitReaders` returns, `next` must not exceed `min_reader_seq + mask + 1`.
///
/// Used in: `Ring::wait_readers` just before returning.
macro_rules! debug_assert_reader_gate_respected {
    ($next:expr, $min_reader_seq:expr, $mask:expr) => {
        debug_assert!(
            $next <= $min_reader_seq + $mask + 1,
            "INV-RNG-03 violated: writer at {} outruns reader gate {} (mask {})",
            $next,
            $min_reader_seq,
            $mask
        )
    };
}

pub(crate) use debug_assert_link_not_yet_set;
pub(crate) use debug_assert_reader_gate_respected;
pub(crate) use debug_assert_reservation_fits;
pub(crate) use debug_assert_rseq_monotonic;
pub(crate) use debug_assert_segment_start_aligned;
pub(crate) use debug_assert_wseq_monotonic;
