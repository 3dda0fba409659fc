//! Fixed-length symbolic identifiers and composite keys
//!
//! `VenueId`/`SegmentId`/`InstrumentId` are 8-byte ASCII, zero-padded,
//! `Copy` newtypes so book/instrument/venue lookups never allocate.

use std::fmt;

const ID_LEN: usize = 8;

/// An 8-byte, zero-padded ASCII identifier.
///
/// Shared representation for [`VenueId`], [`SegmentId`] and [`InstrumentId`]
/// — they differ only in the newtype wrapping them, which keeps a
/// `VenueId` from being accidentally compared to an `InstrumentId`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixedId([u8; ID_LEN]);

impl FixedId {
    pub fn new(s: &str) -> Self {
        let mut bytes = [0u8; ID_LEN];
        let src = s.as_bytes();
        let n = src.len().min(ID_LEN);
        bytes[..n].copy_from_slice(&src[..n]);
        Self(bytes)
    }

    pub fn as_str(&self) -> &str {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(ID_LEN);
        std::str::from_utf8(&self.0[..end]).unwrap_or("")
    }

    pub fn as_bytes(&self) -> [u8; ID_LEN] {
        self.0
    }

    pub fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }
}

impl fmt::Debug for FixedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for FixedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

macro_rules! fixed_id_newtype {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub FixedId);

        impl $name {
            pub fn new(s: &str) -> Self {
                Self(FixedId::new(s))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:?})"), self.0.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

fixed_id_newtype!(VenueId);
fixed_id_newtype!(SegmentId);
fixed_id_newtype!(InstrumentId);

/// Primary key of an `Instrument`: which venue, which segment, which id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentKey {
    pub venue: VenueId,
    pub segment: SegmentId,
    pub id: InstrumentId,
}

impl InstrumentKey {
    pub fn new(venue: VenueId, segment: SegmentId, id: InstrumentId) -> Self {
        Self { venue, segment, id }
    }
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.venue, self.segment, self.id)
    }
}

/// Symbology source an instrument can be looked up by (ISIN, RIC, CUSIP...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymSrc {
    Isin,
    Ric,
    Cusip,
    Sedol,
    Other(u8),
}

/// Lookup key into the library's symbology index: `(id, src)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymKey {
    pub id: String,
    pub src: SymSrc,
}

impl SymKey {
    pub fn new(id: impl Into<String>, src: SymSrc) -> Self {
        Self { id: id.into(), src }
    }
}

/// Put/call flag for an option derivative descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PutCall {
    Put,
    Call,
}

/// Union key used to resolve derivatives: underlying instrument key plus
/// maturity, and (for options) put/call and strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniKey {
    pub underlying: InstrumentKey,
    pub maturity: JulianDay,
    pub put_call: Option<PutCall>,
    pub strike: Option<crate::core::value::Value>,
}

/// Days since the Julian epoch — the date component of [`DateTime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JulianDay(pub i32);

/// Julian-day + seconds-of-day + nanoseconds timestamp.
///
/// Kept as three plain integer fields (not `std::time::SystemTime`) so it
/// round-trips exactly through the wire format and is `Copy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DateTime {
    pub julian_day: i32,
    pub sec: u32,
    pub nsec: u32,
}

impl DateTime {
    pub const NULL: DateTime = DateTime {
        julian_day: 0,
        sec: 0,
        nsec: 0,
    };

    pub fn new(julian_day: i32, sec: u32, nsec: u32) -> Self {
        Self {
            julian_day,
            sec,
            nsec,
        }
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

/// Market side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    Buy = 0,
    Sell = 1,
}

impl Side {
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Which per-shard order index a venue's order IDs are looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderIdScope {
    /// Single global index keyed by `order_id` alone.
    Venue,
    /// Index keyed by `(order_book_key, order_id)`, one per shard.
    OrderBook,
    /// Index keyed by `(order_book_key, side, order_id)`, one per shard.
    ObSide,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_id_round_trips_short_string() {
        let v = VenueId::new("XTKS");
        assert_eq!(v.as_str(), "XTKS");
    }

    #[test]
    fn fixed_id_truncates_long_string() {
        let v = VenueId::new("TOOLONGVENUEID");
        assert_eq!(v.as_str().len(), 8);
    }

    #[test]
    fn instrument_key_display() {
        let key = InstrumentKey::new(
            VenueId::new("XTKS"),
            SegmentId::new("0"),
            InstrumentId::new("SYM1"),
        );
        assert_eq!(format!("{}", key), "XTKS/0/SYM1");
    }

    #[test]
    fn side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }
}
