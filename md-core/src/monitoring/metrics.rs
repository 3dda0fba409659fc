//! Prometheus metrics for book mutation and the subscriber pipeline.
//!
//! Mirrors the teacher's per-domain metric struct layout (one struct per
//! concern, all registered into a shared [`prometheus::Registry`]), but the
//! domains themselves are book updates and link health rather than trading
//! activity.

use anyhow::{Context, Result};
use prometheus::{
    Gauge, GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry,
};

/// Counters for book-mutation operations, labeled by operation name so a
/// single vec covers `addOrder`/`modifyOrder`/`reduceOrder`/`cancelOrder`/
/// `addTrade`/`pxLevel`/`l1Update` without one field per variant.
pub struct BookMetrics {
    /// Mutating operations applied, by operation name.
    pub operations_total: IntCounterVec,
    /// NDP rescales that overflowed `i64` and were rejected.
    pub ndp_overflows_total: IntCounter,
    /// Order books currently live across all shards.
    pub order_books: IntGauge,
    /// Resting orders currently live across all shards.
    pub orders_live: IntGauge,
}

impl BookMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let operations_total = IntCounterVec::new(
            Opts::new(
                "md_book_operations_total",
                "Book-mutation operations applied, by operation",
            ),
            &["op"],
        )?;
        let ndp_overflows_total = IntCounter::new(
            "md_book_ndp_overflows_total",
            "Value rescales rejected for NDP overflow",
        )?;
        let order_books = IntGauge::new(
            "md_book_order_books",
            "Order books currently live across all shards",
        )?;
        let orders_live = IntGauge::new(
            "md_book_orders_live",
            "Resting orders currently live across all shards",
        )?;

        registry.register(Box::new(operations_total.clone()))?;
        registry.register(Box::new(ndp_overflows_total.clone()))?;
        registry.register(Box::new(order_books.clone()))?;
        registry.register(Box::new(orders_live.clone()))?;

        Ok(Self {
            operations_total,
            ndp_overflows_total,
            order_books,
            orders_live,
        })
    }
}

/// Per-link subscriber health, labeled by channel id so one set of metrics
/// covers every configured link.
pub struct SubscriberMetrics {
    /// Whether a link is in `LinkState::Live` (1) or not (0).
    pub link_live: IntGaugeVec,
    /// Decoded frames received, by link and transport (`tcp`/`udp`).
    pub frames_received_total: IntCounterVec,
    /// Sequence gaps detected, by link.
    pub sequence_gaps_total: IntCounterVec,
    /// Records missed across all detected gaps, by link — the `n` in
    /// `MissedUpdates{venue, n}`.
    pub missed_records_total: IntCounterVec,
    /// ResendReq frames sent, by link.
    pub resend_requests_total: IntCounterVec,
    /// Reconnects triggered (manual, saturation, or gap-exceeded), by link.
    pub reconnects_total: IntCounterVec,
    /// Current UDP-during-snapshot queue depth, by link.
    pub queue_depth: IntGaugeVec,
}

impl SubscriberMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let link_live = IntGaugeVec::new(
            Opts::new("md_subscriber_link_live", "Link is in the Live state"),
            &["link"],
        )?;
        let frames_received_total = IntCounterVec::new(
            Opts::new(
                "md_subscriber_frames_received_total",
                "Decoded frames received, by transport",
            ),
            &["link", "transport"],
        )?;
        let sequence_gaps_total = IntCounterVec::new(
            Opts::new(
                "md_subscriber_sequence_gaps_total",
                "Sequence gaps detected",
            ),
            &["link"],
        )?;
        let missed_records_total = IntCounterVec::new(
            Opts::new(
                "md_subscriber_missed_records_total",
                "Records missed across all detected gaps",
            ),
            &["link"],
        )?;
        let resend_requests_total = IntCounterVec::new(
            Opts::new(
                "md_subscriber_resend_requests_total",
                "ResendReq frames sent",
            ),
            &["link"],
        )?;
        let reconnects_total = IntCounterVec::new(
            Opts::new("md_subscriber_reconnects_total", "Reconnects triggered"),
            &["link"],
        )?;
        let queue_depth = IntGaugeVec::new(
            Opts::new(
                "md_subscriber_queue_depth",
                "UDP frames queued pending EndOfSnapshot cutover",
            ),
            &["link"],
        )?;

        registry.register(Box::new(link_live.clone()))?;
        registry.register(Box::new(frames_received_total.clone()))?;
        registry.register(Box::new(sequence_gaps_total.clone()))?;
        registry.register(Box::new(missed_records_total.clone()))?;
        registry.register(Box::new(resend_requests_total.clone()))?;
        registry.register(Box::new(reconnects_total.clone()))?;
        registry.register(Box::new(queue_depth.clone()))?;

        Ok(Self {
            link_live,
            frames_received_total,
            sequence_gaps_total,
            missed_records_total,
            resend_requests_total,
            reconnects_total,
            queue_depth,
        })
    }
}

/// Latency/throughput of wire decode and book application, the hot path a
/// shard spends nearly all its time in.
pub struct PerformanceMetrics {
    /// Time to decode a wire frame into a [`crate::wire::Frame`].
    pub frame_decode_latency_ns: Histogram,
    /// Time to apply a decoded frame's effect to an order book.
    pub book_apply_latency_ns: Histogram,
    /// Frames applied per second, sampled by whoever drains the channel.
    pub frames_per_second: Gauge,
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let frame_decode_latency_ns = Histogram::with_opts(
            HistogramOpts::new(
                "md_perf_frame_decode_latency_ns",
                "Wire frame decode latency in nanoseconds",
            )
            .buckets(vec![
                50.0, 100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0, 10_000.0,
            ]),
        )?;
        let book_apply_latency_ns = Histogram::with_opts(
            HistogramOpts::new(
                "md_perf_book_apply_latency_ns",
                "Order book mutation latency in nanoseconds",
            )
            .buckets(vec![
                50.0, 100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0, 10_000.0,
            ]),
        )?;
        let frames_per_second = Gauge::new(
            "md_perf_frames_per_second",
            "Frames applied per second, most recent sample",
        )?;

        registry.register(Box::new(frame_decode_latency_ns.clone()))?;
        registry.register(Box::new(book_apply_latency_ns.clone()))?;
        registry.register(Box::new(frames_per_second.clone()))?;

        Ok(Self {
            frame_decode_latency_ns,
            book_apply_latency_ns,
            frames_per_second,
        })
    }
}

/// Process-level health: resource use plus a catch-all error counter.
pub struct SystemMetrics {
    /// Errors logged, by kind (mirrors [`crate::core::MdError`] variant names).
    pub errors_total: IntCounterVec,
    /// CPU usage percent, sampled periodically.
    pub cpu_usage_percent: GaugeVec,
    /// Resident memory in bytes.
    pub memory_usage_bytes: IntGauge,
    /// Process uptime in seconds.
    pub uptime_seconds: IntGauge,
}

impl SystemMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let errors_total = IntCounterVec::new(
            Opts::new("md_system_errors_total", "Errors logged, by kind"),
            &["kind"],
        )?;
        let cpu_usage_percent = GaugeVec::new(
            Opts::new("md_system_cpu_usage_percent", "CPU usage percent, by shard"),
            &["shard"],
        )?;
        let memory_usage_bytes =
            IntGauge::new("md_system_memory_usage_bytes", "Resident memory in bytes")?;
        let uptime_seconds = IntGauge::new("md_system_uptime_seconds", "Process uptime in seconds")?;

        registry.register(Box::new(errors_total.clone()))?;
        registry.register(Box::new(cpu_usage_percent.clone()))?;
        registry.register(Box::new(memory_usage_bytes.clone()))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        Ok(Self {
            errors_total,
            cpu_usage_percent,
            memory_usage_bytes,
            uptime_seconds,
        })
    }
}

/// Owns the Prometheus [`Registry`] and every metric struct registered into
/// it. One instance per process, shared via `Arc` with the metrics HTTP
/// server and every shard/subscriber task that records against it.
pub struct MetricsRegistry {
    registry: Registry,
    book: BookMetrics,
    subscriber: SubscriberMetrics,
    performance: PerformanceMetrics,
    system: SystemMetrics,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let book = BookMetrics::new(&registry).context("registering book metrics")?;
        let subscriber =
            SubscriberMetrics::new(&registry).context("registering subscriber metrics")?;
        let performance =
            PerformanceMetrics::new(&registry).context("registering performance metrics")?;
        let system = SystemMetrics::new(&registry).context("registering system metrics")?;

        Ok(Self {
            registry,
            book,
            subscriber,
            performance,
            system,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn book(&self) -> &BookMetrics {
        &self.book
    }

    pub fn subscriber(&self) -> &SubscriberMetrics {
        &self.subscriber
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance
    }

    pub fn system(&self) -> &SystemMetrics {
        &self.system
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_metrics_record_operations_by_label() {
        let registry = MetricsRegistry::new().unwrap();
        registry
            .book()
            .operations_total
            .with_label_values(&["addOrder"])
            .inc();
        registry.book().order_books.set(4);
        assert_eq!(
            registry
                .book()
                .operations_total
                .with_label_values(&["addOrder"])
                .get(),
            1
        );
        assert_eq!(registry.book().order_books.get(), 4);
    }

    #[test]
    fn subscriber_metrics_track_per_link_gaps_and_queue_depth() {
        let registry = MetricsRegistry::new().unwrap();
        registry
            .subscriber()
            .sequence_gaps_total
            .with_label_values(&["ch1"])
            .inc();
        registry
            .subscriber()
            .missed_records_total
            .with_label_values(&["ch1"])
            .inc_by(7);
        registry.subscriber().queue_depth.with_label_values(&["ch1"]).set(42);

        assert_eq!(
            registry
                .subscriber()
                .sequence_gaps_total
                .with_label_values(&["ch1"])
                .get(),
            1
        );
        assert_eq!(
            registry
                .subscriber()
                .missed_records_total
                .with_label_values(&["ch1"])
                .get(),
            7
        );
        assert_eq!(
            registry.subscriber().queue_depth.with_label_values(&["ch1"]).get(),
            42
        );
    }

    #[test]
    fn performance_metrics_observe_latencies() {
        let registry = MetricsRegistry::new().unwrap();
        registry.performance().frame_decode_latency_ns.observe(120.0);
        registry.performance().frames_per_second.set(50_000.0);
        assert_eq!(registry.performance().frame_decode_latency_ns.get_sample_count(), 1);
        assert_eq!(registry.performance().frames_per_second.get(), 50_000.0);
    }

    #[test]
    fn system_metrics_count_errors_by_kind() {
        let registry = MetricsRegistry::new().unwrap();
        registry
            .system()
            .errors_total
            .with_label_values(&["Malformed"])
            .inc();
        registry.system().uptime_seconds.set(120);
        assert_eq!(
            registry.system().errors_total.with_label_values(&["Malformed"]).get(),
            1
        );
        assert_eq!(registry.system().uptime_seconds.get(), 120);
    }

    #[test]
    fn all_metric_families_are_registered_once() {
        let registry = MetricsRegistry::new().unwrap();
        let families = registry.registry().gather();
        assert!(!families.is_empty());
    }
}
