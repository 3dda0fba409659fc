//! A single resting order inside a [`super::px_level::PxLevel`].

use crate::core::{Side, Value};

/// A resting order. Ownership lives in exactly one [`super::px_level::PxLevel`]'s
/// `orders` vector; every other reference (venue order-id index, shard
/// routing) is non-owning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: String,
    pub side: Side,
    pub price: Value,
    pub qty: Value,
    /// Rank within its level. `0` is unranked/FIFO-assigned; see
    /// [`super::px_level::PxLevel::add_order`].
    pub rank: u16,
    pub flags: u8,
}

impl Order {
    pub fn new(id: impl Into<String>, side: Side, price: Value, qty: Value, flags: u8) -> Self {
        Self {
            id: id.into(),
            side,
            price,
            qty,
            rank: 0,
            flags,
        }
    }
}
