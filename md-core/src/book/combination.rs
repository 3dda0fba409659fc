//! Multi-leg synthetic books: a normal [`OrderBook`] plus the leg
//! descriptors that define it. Otherwise indistinguishable from a plain
//! book to the rest of the API, so it `Deref`s straight through.

use std::ops::{Deref, DerefMut};

use crate::book::order_book::OrderBook;
use crate::core::{InstrumentKey, Ndp, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leg {
    pub instrument: InstrumentKey,
    pub side: Side,
    pub ratio: i32,
}

pub struct Combination {
    pub legs: Vec<Leg>,
    pub book: OrderBook,
}

impl Combination {
    pub fn new(key: InstrumentKey, px_ndp: Ndp, qty_ndp: Ndp, legs: Vec<Leg>) -> Self {
        Self {
            legs,
            book: OrderBook::new(key, px_ndp, qty_ndp),
        }
    }
}

impl Deref for Combination {
    type Target = OrderBook;
    fn deref(&self) -> &OrderBook {
        &self.book
    }
}

impl DerefMut for Combination {
    fn deref_mut(&mut self) -> &mut OrderBook {
        &mut self.book
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InstrumentId, SegmentId, VenueId};

    #[test]
    fn combination_derefs_to_order_book() {
        let key = InstrumentKey::new(VenueId::new("XTKS"), SegmentId::new("0"), InstrumentId::new("SPREAD1"));
        let leg_key = InstrumentKey::new(VenueId::new("XTKS"), SegmentId::new("0"), InstrumentId::new("LEG1"));
        let combo = Combination::new(
            key,
            Ndp::new(2).unwrap(),
            Ndp::new(0).unwrap(),
            vec![Leg {
                instrument: leg_key,
                side: Side::Buy,
                ratio: 1,
            }],
        );
        assert_eq!(combo.legs.len(), 1);
        assert_eq!(combo.book.key, key);
    }
}
