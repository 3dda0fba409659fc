//! Fixed-point `Value`/`Ndp` arithmetic
//!
//! Every price and quantity in the book is an `i64` magnitude scaled by a
//! per-book, per-kind number-of-decimal-places (`Ndp`). Two sentinel values
//! carry meta-meaning instead of a magnitude: `Value::NULL` ("absent") and
//! `Value::RESET` ("explicit reset-to-null in a delta").

use crate::core::errors::NdpError;
use std::fmt;

/// Number of decimal places scaling a [`Value`] to its real magnitude.
///
/// Valid range is `0..=18` — above that an `i64` cannot represent even a
/// single unit scaled up, so rescaling targets outside this range are
/// rejected at construction rather than only at rescale time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Ndp(u8);

impl Ndp {
    pub const MAX: u8 = 18;

    #[inline]
    pub const fn new(ndp: u8) -> Result<Self, NdpError> {
        if ndp > Self::MAX {
            Err(NdpError::NdpOutOfRange { ndp })
        } else {
            Ok(Self(ndp))
        }
    }

    /// Construct without range validation. Only use for constants known at
    /// compile time to be in range.
    #[inline]
    pub const fn new_unchecked(ndp: u8) -> Self {
        debug_assert!(ndp <= Self::MAX);
        Self(ndp)
    }

    #[inline(always)]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Ndp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// i64 fixed-point magnitude scaled by a book-carried [`Ndp`].
///
/// `null` (`i64::MIN`) means "absent" — a three-state merge treats it as
/// "leave unchanged". `reset` (`i64::MIN + 1`) means "explicitly clear to
/// null" in a delta record. All other values are ordinary scaled integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Value(pub i64);

impl Value {
    pub const NULL: Value = Value(i64::MIN);
    pub const RESET: Value = Value(i64::MIN + 1);
    pub const ZERO: Value = Value(0);

    #[inline(always)]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[inline(always)]
    pub const fn is_null(self) -> bool {
        self.0 == Self::NULL.0
    }

    #[inline(always)]
    pub const fn is_reset(self) -> bool {
        self.0 == Self::RESET.0
    }

    /// True for any value that is neither `null` nor `reset` — i.e. an
    /// actual magnitude, including zero.
    #[inline(always)]
    pub const fn is_value(self) -> bool {
        !self.is_null() && !self.is_reset()
    }

    #[inline(always)]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Rescale this value from `old_ndp` to `new_ndp`.
    ///
    /// Sentinels pass through unchanged. A nonzero value that crosses NDPs
    /// without losing precision round-trips exactly; a magnitude that would
    /// overflow `i64` at the new scale returns [`NdpError::NdpOverflow`]
    /// rather than silently truncating.
    pub fn rescale(self, old_ndp: Ndp, new_ndp: Ndp) -> Result<Value, NdpError> {
        if !self.is_value() || old_ndp == new_ndp {
            return Ok(self);
        }
        let delta = new_ndp.get() as i32 - old_ndp.get() as i32;
        let scaled = if delta > 0 {
            (self.0 as i128).checked_mul(10i128.pow(delta as u32))
        } else {
            Some((self.0 as i128) / 10i128.pow((-delta) as u32))
        };
        match scaled {
            Some(v) if v >= i64::MIN as i128 + 2 && v <= i64::MAX as i128 => Ok(Value(v as i64)),
            _ => Err(NdpError::NdpOverflow {
                old_value: self.0,
                old_ndp: old_ndp.get(),
                new_ndp: new_ndp.get(),
            }),
        }
    }

    /// Notional = price * qty, computed in a common high-precision
    /// intermediate rather than either side's NDP, then reduced back to
    /// `out_ndp` (typically the book's price NDP).
    pub fn notional(price: Value, price_ndp: Ndp, qty: Value, qty_ndp: Ndp, out_ndp: Ndp) -> Value {
        if !price.is_value() || !qty.is_value() {
            return Value::ZERO;
        }
        let raw = price.0 as i128 * qty.0 as i128;
        // raw is scaled at (price_ndp + qty_ndp); reduce to out_ndp.
        let combined_ndp = price_ndp.get() as i32 + qty_ndp.get() as i32;
        let delta = out_ndp.get() as i32 - combined_ndp;
        let scaled = if delta >= 0 {
            raw.saturating_mul(10i128.pow(delta as u32))
        } else {
            raw / 10i128.pow((-delta) as u32)
        };
        Value(scaled.clamp(i64::MIN as i128 + 2, i64::MAX as i128) as i64)
    }

    /// Three-state merge used throughout L1 ingestion: `null` leaves the
    /// existing value unchanged, `reset` clears it to `null`, anything else
    /// replaces it.
    #[inline]
    pub fn merge(self, incoming: Value) -> Value {
        if incoming.is_null() {
            self
        } else if incoming.is_reset() {
            Value::NULL
        } else {
            incoming
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else if self.is_reset() {
            write!(f, "reset")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ndp(n: u8) -> Ndp {
        Ndp::new(n).unwrap()
    }

    #[test]
    fn sentinels_pass_through_rescale() {
        assert_eq!(Value::NULL.rescale(ndp(2), ndp(4)).unwrap(), Value::NULL);
        assert_eq!(Value::RESET.rescale(ndp(2), ndp(4)).unwrap(), Value::RESET);
    }

    #[test]
    fn rescale_up_then_down_round_trips() {
        let v = Value::new(10000); // 100.00 at ndp=2
        let up = v.rescale(ndp(2), ndp(4)).unwrap();
        assert_eq!(up, Value::new(1_000_000)); // 100.0000
        let back = up.rescale(ndp(4), ndp(2)).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn rescale_overflow_is_rejected() {
        let v = Value::new(i64::MAX / 10 + 1);
        assert!(v.rescale(ndp(0), ndp(1)).is_err());
    }

    #[test]
    fn merge_semantics() {
        let existing = Value::new(42);
        assert_eq!(existing.merge(Value::NULL), existing);
        assert_eq!(existing.merge(Value::RESET), Value::NULL);
        assert_eq!(existing.merge(Value::new(7)), Value::new(7));
    }

    #[test]
    fn notional_common_intermediate() {
        // price=100.00 (ndp=2), qty=10 (ndp=0) -> notional 1000.00 at ndp=2
        let price = Value::new(10000);
        let qty = Value::new(10);
        let nv = Value::notional(price, ndp(2), qty, ndp(0), ndp(2));
        assert_eq!(nv, Value::new(100_000));
    }
}
