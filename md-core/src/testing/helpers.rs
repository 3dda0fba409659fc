//! Test helper utilities for creating test data and assertions
//!
//! Provides convenient builders for order book fixtures, channel configs,
//! and latency assertions, used across unit tests in this crate.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::book::{OBSide, Order, OrderBook, PxLevel};
use crate::core::{InstrumentKey, Ndp, SegmentId, Side, Value, VenueId};
use crate::monitoring::MetricsRegistry;
use crate::subscriber::ChannelConfig;

/// Build an `InstrumentKey` from plain strings, for tests that don't care
/// about the fixed-length encoding.
pub fn test_key(venue: &str, segment: &str, id: &str) -> InstrumentKey {
    InstrumentKey::new(
        VenueId::new(venue),
        SegmentId::new(segment),
        crate::core::InstrumentId::new(id),
    )
}

/// An empty order book with 2-decimal price/quantity scale, ready for
/// `addOrder`/`pxLevel` mutations in a test.
pub fn test_order_book(venue: &str, segment: &str, id: &str) -> OrderBook {
    let ndp = Ndp::new(2).unwrap();
    OrderBook::new(test_key(venue, segment, id), ndp, ndp)
}

/// A `Value` at 2 decimal places, e.g. `value_2dp(10050)` for $100.50.
pub fn value_2dp(raw: i64) -> Value {
    Value::new(raw)
}

/// A resting order with a generated id, for populating a `PxLevel` in tests
/// that don't care about order identity.
pub fn test_order(side: Side, price: i64, qty: i64) -> Order {
    Order::new(format!("O{}", price), side, Value::new(price), Value::new(qty), 0)
}

/// A price level at `price` holding a single order of `qty`.
pub fn test_px_level(price: i64, qty: i64) -> PxLevel {
    let mut level = PxLevel::new(Value::new(price));
    level.qty = Value::new(qty);
    level.n_orders = 1;
    level
}

/// An empty book side, for tests exercising `OBSide` directly.
pub fn test_side(side: Side) -> OBSide {
    OBSide::new(side)
}

/// A channel config pointed at loopback, for subscriber link tests that
/// don't actually connect.
pub fn test_channel(id: &str, base_port: u16) -> ChannelConfig {
    let addr = |port: u16| -> SocketAddr { format!("127.0.0.1:{port}").parse().unwrap() };
    ChannelConfig {
        id: id.to_string(),
        tcp_primary: addr(base_port),
        tcp_backup: addr(base_port + 1),
        udp_primary: addr(base_port + 2),
        udp_backup: addr(base_port + 3),
        resend_primary: addr(base_port),
        resend_backup: addr(base_port + 1),
        username: "user".to_string(),
        password: "pass".to_string(),
        enabled: true,
    }
}

/// A freshly registered metrics registry, for tests that record against it
/// without standing up the HTTP server.
pub fn test_metrics() -> Arc<MetricsRegistry> {
    Arc::new(MetricsRegistry::new().expect("failed to create test metrics registry"))
}

/// Assert that an operation completes within expected latency
pub fn assert_within_latency<F>(max_latency: Duration, operation: F, operation_name: &str)
where
    F: FnOnce(),
{
    let start = Instant::now();
    operation();
    let elapsed = start.elapsed();

    assert!(
        elapsed <= max_latency,
        "{} took {:?}, expected <= {:?}",
        operation_name,
        elapsed,
        max_latency
    );
}

/// Measure operation latency
pub fn measure_latency<F, R>(operation: F) -> (R, Duration)
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let result = operation();
    let elapsed = start.elapsed();
    (result, elapsed)
}

/// Measure average latency over multiple runs
pub fn measure_average_latency<F>(iterations: usize, mut operation: F) -> Duration
where
    F: FnMut(),
{
    let start = Instant::now();
    for _ in 0..iterations {
        operation();
    }
    let total = start.elapsed();
    total / iterations as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_book_is_empty_and_keyed() {
        let book = test_order_book("XNAS", "EQ", "AAPL");
        assert_eq!(book.key.venue.as_str(), "XNAS");
        assert!(book.bids.is_empty());
        assert!(book.asks.is_empty());
    }

    #[test]
    fn test_order_and_px_level_builders() {
        let order = test_order(Side::Buy, 10050, 100);
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.price, Value::new(10050));

        let level = test_px_level(10050, 100);
        assert_eq!(level.qty, Value::new(100));
        assert_eq!(level.n_orders, 1);
    }

    #[test]
    fn test_channel_fixture_is_well_formed() {
        let channel = test_channel("ch1", 40000);
        assert!(channel.enabled);
        assert_eq!(channel.tcp_primary.port(), 40000);
        assert_eq!(channel.udp_primary.port(), 40002);
    }

    #[test]
    fn test_assert_within_latency() {
        assert_within_latency(
            Duration::from_millis(10),
            || {
                let _x = 1 + 1;
            },
            "fast operation",
        );
    }

    #[test]
    fn test_measure_latency() {
        let (result, latency) = measure_latency(|| {
            std::thread::sleep(Duration::from_millis(1));
            42
        });

        assert_eq!(result, 42);
        assert!(latency >= Duration::from_millis(1));
    }

    #[test]
    fn test_measure_average_latency() {
        let avg = measure_average_latency(10, || {
            let _x = (0..100).sum::<i32>();
        });

        assert!(avg < Duration::from_millis(1));
    }
}
