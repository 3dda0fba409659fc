//! Performance utilities for the shard hot path
//!
//! - **CPU affinity**: pin each shard's worker thread to an isolated core
//! - **Lock-free metrics**: cache-aligned atomic counters, read without
//!   touching the Prometheus registry
//! - **Object pools**: pre-allocated pools for zero-allocation decode/apply

pub mod cpu;
pub mod metrics;
pub mod pools;

// Re-exports for convenience
pub use cpu::{num_cores, pin_to_core};
pub use metrics::{CacheAligned, Metrics, MetricsSnapshot};
pub use pools::{ObjectPool, PoolGuard, PoolStats};
