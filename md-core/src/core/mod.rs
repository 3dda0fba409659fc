//! Core zero-overhead types shared by every layer of the book and
//! subscriber pipeline:
//! - `value`: fixed-point `Value`/`Ndp` arithmetic
//! - `identifiers`: fixed-length venue/segment/instrument ids and keys
//! - `errors`: domain error types (`MdError`, `NdpError`)
//!
//! All types favor `Copy` semantics and fixed-size representations so that
//! hot-path book mutations allocate nothing beyond the containers that
//! already own `Order`/`PxLevel` state.

pub mod errors;
pub mod identifiers;
pub mod value;

#[cfg(test)]
mod rescale_proptest;

pub use errors::{MdError, NdpError};
pub use identifiers::{
    DateTime, FixedId, InstrumentId, InstrumentKey, JulianDay, OrderIdScope, PutCall, Side,
    SegmentId, SymKey, SymSrc, UniKey, VenueId,
};
pub use value::{Ndp, Value};
