//! A tradable product and the order books it has across venues/segments.
//!
//! `OrderBook` storage itself lives in the owning [`crate::shard::Shard`]'s
//! flat `order_books` map, keyed by [`InstrumentKey`] — `Instrument` holds
//! only the (non-owning) set of keys that belong to it, the way the
//! out-chain and underlying/derivative links are non-owning elsewhere in
//! this crate. This keeps every `OrderBook` single-owned by its shard
//! instead of also being reachable through its `Instrument`.

use std::collections::BTreeMap;

use crate::core::{DateTime, InstrumentId, InstrumentKey, JulianDay, Ndp, PutCall, SegmentId, Value, VenueId};

/// Reference data describing an instrument. Fields use the `Value`
/// three-state semantics where the feed can omit or explicitly clear them.
#[derive(Debug, Clone)]
pub struct RefData {
    pub px_ndp: Ndp,
    pub qty_ndp: Ndp,
    pub lot_size: Value,
    pub maturity: Option<JulianDay>,
    pub put_call: Option<PutCall>,
    pub strike: Value,
    pub underlying: Option<InstrumentKey>,
}

impl RefData {
    pub fn new(px_ndp: Ndp, qty_ndp: Ndp) -> Self {
        Self {
            px_ndp,
            qty_ndp,
            lot_size: Value::NULL,
            maturity: None,
            put_call: None,
            strike: Value::NULL,
            underlying: None,
        }
    }
}

pub struct Instrument {
    pub id: InstrumentId,
    pub ref_data: RefData,
    /// Order book keys belonging to this instrument, by `(venue, segment)`.
    /// Sorted so venue-scoped lookups can return results in a stable order.
    order_books: BTreeMap<(VenueId, SegmentId), InstrumentKey>,
    pub derivatives: Vec<InstrumentKey>,
    pub updated: DateTime,
}

impl Instrument {
    pub fn new(id: InstrumentId, ref_data: RefData) -> Self {
        Self {
            id,
            ref_data,
            order_books: BTreeMap::new(),
            derivatives: Vec::new(),
            updated: DateTime::NULL,
        }
    }

    pub fn add_order_book(&mut self, venue: VenueId, segment: SegmentId, key: InstrumentKey) {
        self.order_books.insert((venue, segment), key);
    }

    pub fn del_order_book(&mut self, venue: VenueId, segment: SegmentId) -> Option<InstrumentKey> {
        self.order_books.remove(&(venue, segment))
    }

    pub fn order_book_key(&self, venue: VenueId, segment: SegmentId) -> Option<InstrumentKey> {
        self.order_books.get(&(venue, segment)).copied()
    }

    /// Any book listed in `venue`, in `(venue, segment)` sort order.
    pub fn keys_in_venue(&self, venue: VenueId) -> impl Iterator<Item = InstrumentKey> + '_ {
        self.order_books
            .range((venue, SegmentId::new(""))..)
            .take_while(move |((v, _), _)| *v == venue)
            .map(|(_, key)| *key)
    }

    pub fn all_keys(&self) -> impl Iterator<Item = &InstrumentKey> {
        self.order_books.values()
    }

    /// Diffs `new_ref` against the current reference data, updating
    /// `updated` and returning whether the NDPs changed (the caller must
    /// then cascade `OrderBook::update_ndp` across every owned book).
    pub fn update_ref_data(&mut self, new_ref: RefData, at: DateTime) -> bool {
        let ndp_changed = new_ref.px_ndp != self.ref_data.px_ndp || new_ref.qty_ndp != self.ref_data.qty_ndp;
        self.ref_data = new_ref;
        self.updated = at;
        ndp_changed
    }
}
