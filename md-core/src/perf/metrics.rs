//! Lock-Free Performance Metrics
//!
//! Cache-aligned atomic counters for zero-overhead tracking on the shard
//! hot path. All counters use relaxed ordering for maximum performance —
//! this is a cheaper, allocation-free companion to `monitoring::metrics`'
//! Prometheus counters, meant to be read by a shard's own status command
//! without crossing into the Prometheus registry's locking.

use std::sync::atomic::{AtomicU64, Ordering};

/// Cache-aligned metrics structure
///
/// Each metric is an atomic counter on its own cache line to prevent
/// false sharing between CPU cores.
#[repr(C, align(64))]
pub struct Metrics {
    /// Wire frames received (TCP + UDP combined)
    pub frames_received: AtomicU64,

    /// Padding to next cache line
    _padding1: [u8; 56],

    /// Book-mutation operations applied
    pub records_applied: AtomicU64,

    /// Padding to next cache line
    _padding2: [u8; 56],

    /// Sequence gaps detected
    pub gaps_detected: AtomicU64,

    /// Padding to next cache line
    _padding3: [u8; 56],

    /// ResendReq frames sent
    pub resends_sent: AtomicU64,

    /// Padding to next cache line
    _padding4: [u8; 56],

    /// Total apply latency in nanoseconds (cumulative)
    pub total_latency_ns: AtomicU64,

    /// Padding to next cache line
    _padding5: [u8; 56],
}

impl Metrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            frames_received: AtomicU64::new(0),
            _padding1: [0; 56],
            records_applied: AtomicU64::new(0),
            _padding2: [0; 56],
            gaps_detected: AtomicU64::new(0),
            _padding3: [0; 56],
            resends_sent: AtomicU64::new(0),
            _padding4: [0; 56],
            total_latency_ns: AtomicU64::new(0),
            _padding5: [0; 56],
        }
    }

    /// Increment frames-received counter
    #[inline(always)]
    pub fn inc_frames(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment records-applied counter
    #[inline(always)]
    pub fn inc_records(&self) {
        self.records_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment gaps-detected counter
    #[inline(always)]
    pub fn inc_gaps(&self) {
        self.gaps_detected.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment resends-sent counter
    #[inline(always)]
    pub fn inc_resends(&self) {
        self.resends_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Add latency measurement
    #[inline(always)]
    pub fn add_latency(&self, latency_ns: u64) {
        self.total_latency_ns
            .fetch_add(latency_ns, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            records_applied: self.records_applied.load(Ordering::Relaxed),
            gaps_detected: self.gaps_detected.load(Ordering::Relaxed),
            resends_sent: self.resends_sent.load(Ordering::Relaxed),
            total_latency_ns: self.total_latency_ns.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.frames_received.store(0, Ordering::Relaxed);
        self.records_applied.store(0, Ordering::Relaxed);
        self.gaps_detected.store(0, Ordering::Relaxed);
        self.resends_sent.store(0, Ordering::Relaxed);
        self.total_latency_ns.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub records_applied: u64,
    pub gaps_detected: u64,
    pub resends_sent: u64,
    pub total_latency_ns: u64,
}

impl MetricsSnapshot {
    /// Calculate average apply latency per record
    pub fn avg_latency_ns(&self) -> f64 {
        if self.records_applied > 0 {
            self.total_latency_ns as f64 / self.records_applied as f64
        } else {
            0.0
        }
    }

    /// Calculate gap rate (gaps per frame received)
    pub fn gap_rate(&self) -> f64 {
        if self.frames_received > 0 {
            self.gaps_detected as f64 / self.frames_received as f64
        } else {
            0.0
        }
    }
}

/// Cache-aligned wrapper for any type
///
/// Useful for ensuring types are on their own cache line.
#[repr(C, align(64))]
pub struct CacheAligned<T> {
    inner: T,
}

impl<T> CacheAligned<T> {
    /// Create new cache-aligned value
    pub const fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Get reference to inner value
    pub fn get(&self) -> &T {
        &self.inner
    }

    /// Get mutable reference to inner value
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Unwrap the inner value
    pub fn into_inner(self) -> T {
        self.inner
    }
}
