//! Venues, their per-segment trading-session state, tick-size tables, and
//! the per-shard order-id index a venue's `OrderIdScope` selects.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::core::{DateTime, FixedId, InstrumentKey, OrderIdScope, SegmentId, Side, Value, VenueId};

#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub id: SegmentId,
    pub session: u8,
    pub stamp: DateTime,
}

/// Piecewise tick-size schedule: each entry is the tick size effective from
/// its price onward, up to the next entry's price.
#[derive(Debug, Clone)]
pub struct TickSizeTable {
    pub id: FixedId,
    steps: BTreeMap<i64, i64>,
}

impl TickSizeTable {
    pub fn new(id: FixedId) -> Self {
        Self {
            id,
            steps: BTreeMap::new(),
        }
    }

    pub fn add_tick_size(&mut self, from_price: Value, tick_size: Value) {
        self.steps.insert(from_price.raw(), tick_size.raw());
    }

    pub fn reset(&mut self) {
        self.steps.clear();
    }

    pub fn tick_size_at(&self, price: Value) -> Option<Value> {
        self.steps.range(..=price.raw()).next_back().map(|(_, &t)| Value::new(t))
    }
}

pub struct Venue {
    pub id: VenueId,
    pub order_id_scope: OrderIdScope,
    pub segments: HashMap<SegmentId, Segment>,
    pub tick_size_tables: HashMap<FixedId, TickSizeTable>,
    pub ref_data_loaded: bool,
}

impl Venue {
    pub fn new(id: VenueId, order_id_scope: OrderIdScope) -> Self {
        Self {
            id,
            order_id_scope,
            segments: HashMap::new(),
            tick_size_tables: HashMap::new(),
            ref_data_loaded: false,
        }
    }

    /// Updates the per-segment trading session state, returning the
    /// previous state so the caller can decide whether a broadcast is
    /// warranted (the library always broadcasts, but tests want to
    /// observe the transition).
    pub fn trading_session(&mut self, segment: SegmentId, session: u8, stamp: DateTime) -> Segment {
        let entry = self.segments.entry(segment).or_insert(Segment {
            id: segment,
            session: 0,
            stamp: DateTime::NULL,
        });
        let prev = *entry;
        entry.session = session;
        entry.stamp = stamp;
        prev
    }

    pub fn add_tick_size_table(&mut self, table: TickSizeTable) {
        self.tick_size_tables.insert(table.id, table);
    }
}

/// Per-shard, per-venue order-id index. Which variant is active is fixed at
/// venue creation by [`OrderIdScope`] and never changes afterward.
pub enum OrderIndex {
    /// `Venue` scope: a single global index keyed by `orderID` alone.
    Venue(HashMap<String, (InstrumentKey, Side)>),
    /// `OrderBook` scope: keyed by `(orderBookKey, orderID)`.
    OrderBook(HashMap<(InstrumentKey, String), Side>),
    /// `ObSide` scope: keyed by `(orderBookKey, side, orderID)`.
    ObSide(HashSet<(InstrumentKey, Side, String)>),
}

impl OrderIndex {
    pub fn new(scope: OrderIdScope) -> Self {
        match scope {
            OrderIdScope::Venue => OrderIndex::Venue(HashMap::new()),
            OrderIdScope::OrderBook => OrderIndex::OrderBook(HashMap::new()),
            OrderIdScope::ObSide => OrderIndex::ObSide(HashSet::new()),
        }
    }

    pub fn insert(&mut self, book: InstrumentKey, side: Side, id: &str) {
        match self {
            OrderIndex::Venue(m) => {
                m.insert(id.to_string(), (book, side));
            }
            OrderIndex::OrderBook(m) => {
                m.insert((book, id.to_string()), side);
            }
            OrderIndex::ObSide(s) => {
                s.insert((book, side, id.to_string()));
            }
        }
    }

    pub fn remove(&mut self, book: InstrumentKey, side: Side, id: &str) {
        match self {
            OrderIndex::Venue(m) => {
                m.remove(id);
            }
            OrderIndex::OrderBook(m) => {
                m.remove(&(book, id.to_string()));
            }
            OrderIndex::ObSide(s) => {
                s.remove(&(book, side, id.to_string()));
            }
        }
    }

    /// Resolves which book (and, for `Venue` scope, which side) an order
    /// id lives in, given the book the caller already believes it is in
    /// (exact for `OrderBook`/`ObSide` scope, ignored for `Venue` scope).
    pub fn locate(&self, book: InstrumentKey, side: Option<Side>, id: &str) -> Option<(InstrumentKey, Side)> {
        match self {
            OrderIndex::Venue(m) => m.get(id).copied(),
            OrderIndex::OrderBook(m) => {
                let side = m.get(&(book, id.to_string()))?;
                Some((book, *side))
            }
            OrderIndex::ObSide(s) => {
                let side = side?;
                if s.contains(&(book, side, id.to_string())) {
                    Some((book, side))
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InstrumentId, SegmentId as Seg};

    fn key() -> InstrumentKey {
        InstrumentKey::new(VenueId::new("XTKS"), Seg::new("0"), InstrumentId::new("SYM1"))
    }

    #[test]
    fn tick_size_table_picks_the_step_at_or_below_price() {
        let mut tbl = TickSizeTable::new(FixedId::new("T1"));
        tbl.add_tick_size(Value::new(0), Value::new(1));
        tbl.add_tick_size(Value::new(1000), Value::new(5));
        assert_eq!(tbl.tick_size_at(Value::new(500)), Some(Value::new(1)));
        assert_eq!(tbl.tick_size_at(Value::new(1500)), Some(Value::new(5)));
    }

    #[test]
    fn order_index_venue_scope_ignores_book_on_lookup() {
        let mut idx = OrderIndex::new(OrderIdScope::Venue);
        idx.insert(key(), Side::Buy, "o1");
        assert_eq!(idx.locate(key(), None, "o1"), Some((key(), Side::Buy)));
    }

    #[test]
    fn order_index_obside_scope_requires_matching_side() {
        let mut idx = OrderIndex::new(OrderIdScope::ObSide);
        idx.insert(key(), Side::Buy, "o1");
        assert!(idx.locate(key(), Some(Side::Sell), "o1").is_none());
        assert!(idx.locate(key(), Some(Side::Buy), "o1").is_some());
    }

    #[test]
    fn trading_session_returns_previous_state() {
        let mut venue = Venue::new(VenueId::new("XTKS"), OrderIdScope::OrderBook);
        let seg = Seg::new("0");
        let prev = venue.trading_session(seg, 2, DateTime::new(0, 100, 0));
        assert_eq!(prev.session, 0);
        let prev2 = venue.trading_session(seg, 3, DateTime::new(0, 200, 0));
        assert_eq!(prev2.session, 2);
    }
}
