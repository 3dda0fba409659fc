//! Domain-specific error types for order book and subscriber operations
//!
//! These error types provide precise information about failures in book
//! mutation and link handling, enabling proper error handling and alerting.

use std::fmt;

/// Errors that can occur while converting or rescaling a [`crate::core::value::Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NdpError {
    /// Rescaling across NDPs produced a magnitude outside the representable
    /// range of `i64`.
    NdpOverflow {
        /// Value before rescaling
        old_value: i64,
        /// NDP the value was stored at
        old_ndp: u8,
        /// NDP the value was being rescaled to
        new_ndp: u8,
    },
    /// An `Ndp` outside `0..=18` was supplied.
    NdpOutOfRange {
        /// The rejected NDP
        ndp: u8,
    },
}

impl fmt::Display for NdpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NdpError::NdpOverflow {
                old_value,
                old_ndp,
                new_ndp,
            } => write!(
                f,
                "NDP rescale overflow: {} @ ndp={} does not fit at ndp={}",
                old_value, old_ndp, new_ndp
            ),
            NdpError::NdpOutOfRange { ndp } => {
                write!(f, "NDP {} is out of range (must be 0..=18)", ndp)
            }
        }
    }
}

impl std::error::Error for NdpError {}

/// Errors surfaced by book-mutation operations (`addOrder`, `modifyOrder`,
/// `reduceOrder`, `cancelOrder`, `pxLevel`, ...).
///
/// These are never thrown across a shard boundary (§7 propagation policy):
/// a mutation that fails becomes a logged event and a `None`/skipped
/// operation, not a panic or an `Err` that unwinds the shard thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MdError {
    /// No order with this id exists in the relevant order-ID index.
    OrderNotFound {
        /// The order id that was looked up
        order_id: String,
    },
    /// An order's `px_level` back-reference is null — an internal
    /// consistency violation, not a caller error.
    NoPxLevel {
        /// The order id whose back-reference was null
        order_id: String,
    },
    /// No order book exists for the requested key.
    NoOrderBook {
        /// Human-readable rendering of the requested key
        key: String,
    },
    /// Rescaling a `Value`/`PxLevel`/`Order` across an NDP change overflowed.
    NdpOverflow(NdpError),
    /// A record or call referenced a venue ID the library does not know.
    UnknownVenue {
        /// The rejected venue id
        venue_id: String,
    },
    /// `OrderBook::map` was asked to route into a venue-mapping chain that
    /// does not exist or would be cyclic.
    UnknownVenueMapping {
        /// The input order book's key
        in_key: String,
        /// The requested output order book's key
        out_key: String,
    },
    /// A wire frame failed validation (`bodyLen` mismatch, unknown type).
    Malformed {
        /// Description of what failed validation
        reason: String,
    },
}

impl fmt::Display for MdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MdError::OrderNotFound { order_id } => {
                write!(f, "order not found: {}", order_id)
            }
            MdError::NoPxLevel { order_id } => {
                write!(f, "order {} has no px_level back-reference", order_id)
            }
            MdError::NoOrderBook { key } => write!(f, "no order book for key {}", key),
            MdError::NdpOverflow(e) => write!(f, "{}", e),
            MdError::UnknownVenue { venue_id } => write!(f, "unknown venue: {}", venue_id),
            MdError::UnknownVenueMapping { in_key, out_key } => write!(
                f,
                "no venue mapping from {} to {}",
                in_key, out_key
            ),
            MdError::Malformed { reason } => write!(f, "malformed frame: {}", reason),
        }
    }
}

impl MdError {
    /// Variant name, used as the `kind` label on [`crate::monitoring::SystemMetrics::errors_total`].
    pub fn kind(&self) -> &'static str {
        match self {
            MdError::OrderNotFound { .. } => "OrderNotFound",
            MdError::NoPxLevel { .. } => "NoPxLevel",
            MdError::NoOrderBook { .. } => "NoOrderBook",
            MdError::NdpOverflow(_) => "NdpOverflow",
            MdError::UnknownVenue { .. } => "UnknownVenue",
            MdError::UnknownVenueMapping { .. } => "UnknownVenueMapping",
            MdError::Malformed { .. } => "Malformed",
        }
    }
}

impl std::error::Error for MdError {}

impl From<NdpError> for MdError {
    fn from(e: NdpError) -> Self {
        MdError::NdpOverflow(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_not_found_display() {
        let err = MdError::OrderNotFound {
            order_id: "O1".into(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("O1"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn ndp_overflow_display_and_conversion() {
        let ndp_err = NdpError::NdpOverflow {
            old_value: i64::MAX,
            old_ndp: 2,
            new_ndp: 8,
        };
        let md_err: MdError = ndp_err.into();
        match md_err {
            MdError::NdpOverflow(_) => {}
            _ => panic!("expected NdpOverflow variant"),
        }
    }
}
