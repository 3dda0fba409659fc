//! Market data engine: a sharded, multi-venue, multi-instrument order book
//! with L1/L2/L3 state, fed by a UDP/TCP multicast subscriber pipeline.
//!
//! ## Architecture
//! - **Sharded ownership** — each `Shard` owns a disjoint set of
//!   instruments/order books on its own thread; cross-shard calls go
//!   through a bounded channel, never a shared lock on book state.
//! - **Fixed-point arithmetic** — prices/quantities are `Value`s (an `i64`
//!   mantissa plus an `Ndp` scale), never floats, on the decode/apply hot
//!   path.
//! - **Wire-compatible, allocation-light decode** — `zerocopy` POD records
//!   read directly out of received bytes.
//!
//! ## Core Modules
//! - `core`: fixed-point `Value`, venue/instrument identifiers, error types
//! - `wire`: frame header, per-record-type POD bodies, encode/decode
//! - `book`: `Order`/`PxLevel`/`OBSide`/`OrderBook`, L1 derivation, combinations
//! - `instrument`, `venue`: reference data and per-venue tick/order indices
//! - `shard`: one OS thread per shard, routing instrument/book ownership
//! - `library`: the global (non-owning) index tying shards together
//! - `broadcast`: re-encodes applied records onto the outbound wire format
//! - `subscriber`: UDP/TCP link state machine, gap detection, resend
//! - `config`: TOML configuration tree and channel CSV loading
//! - `monitoring`: Prometheus metrics, alerting, `/metrics` HTTP server
//! - `perf`: CPU affinity, lock-free counters, object pools
//! - `utils`: logging setup

pub mod core;
pub mod wire;

pub mod book;
pub mod instrument;
pub mod venue;

pub mod shard;

pub mod library;

pub mod broadcast;
pub mod subscriber;

pub mod config;
pub mod monitoring;
pub mod perf;
pub mod utils;

#[cfg(test)]
pub mod testing;

pub use core::{MdError, Ndp, NdpError, Value};
pub use library::Library;
pub use shard::Shard;
pub use wire::Frame;

pub use anyhow::{Error, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::book::{OBSide, Order, OrderBook, PxLevel};
    pub use crate::core::{
        FixedId, InstrumentId, InstrumentKey, MdError, Ndp, SegmentId, Side, SymKey, Value,
        VenueId,
    };
    pub use crate::instrument::Instrument;
    pub use crate::library::Library;
    pub use crate::shard::Shard;
    pub use crate::venue::Venue;
    pub use crate::wire::{decode, encode, Frame};

    pub use crate::{Error, Result};
}
