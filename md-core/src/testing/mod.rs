//! Shared test fixtures: order book builders, channel configs, and
//! latency-assertion helpers used across this crate's unit tests.

pub mod helpers;

pub use helpers::*;
