/// Optional metrics for monitoring a [`crate::stream::Stream`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamMetrics {
    /// Number of segments allocated.
    pub segments_allocated: u64,
    /// Number of entries successfully committed.
    pub entries_committed: u64,
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Optional metrics for monitoring a [`crate::ring::Ring`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RingMetrics {
    /// Number of reservations completed.
    pub reservations: u64,
    /// Number of commits completed.
    pub commits: u64,
    /// Number of times a writer had to wait for slow readers.
    pub reader_waits: u64,
    /// Number of readers closed due to overrun.
    pub reader_overruns: u64,
}

impl RingMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}
