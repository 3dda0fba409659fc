//! The library: global (non-owning) indices routing keys to shards, the
//! venue/feed registries, the venue-mapping graph, and the broadcaster
//! every state-changing call feeds into. Owns the shards themselves, which
//! in turn own all `Instrument`/`OrderBook` content.
//!
//! Every public mutator here follows the same shape: mutate the owning
//! shard, emit exactly one broadcast record describing the mutation, then
//! walk the mutated book's out-chain, replaying the delta at each mapped
//! book (which itself broadcasts and keeps walking). [`Library::apply`]
//! is the mirror image for a subscriber: it decodes an upstream record and
//! drives the same shard-level mutations directly, without re-broadcasting
//! — the seqNo on an applied record belongs to whoever originated it.

use std::collections::HashMap;

use parking_lot::RwLock;
use zerocopy::byteorder::little_endian::{I64, U16, U32};

use crate::book::{Combination, L1Data, L1Delta, L1Update, Leg, Order, OrderDelta, PxDelta};
use crate::broadcast::Broadcaster;
use crate::core::{DateTime, FixedId, InstrumentId, InstrumentKey, MdError, Ndp, OrderIdScope, Side, SymKey, Value, VenueId};
use crate::instrument::{Instrument, RefData};
use crate::shard::Shard;
use crate::venue::Venue;
use crate::wire::{
    self, key_from_bytes, key_to_bytes, order_id_from_bytes, order_id_to_bytes, side_from_code, side_to_code,
    AddCombinationBody, AddOrderBookBody, CancelOrderBody, CombinationLegBody, Frame, InstrumentKeyBody, L1Body,
    OrderBody, PxLevelBody, RecordType, TradeBody, VenueKeyBody, MAX_COMBINATION_LEGS,
};

/// Everything mutated under the library's single read-write lock. Content
/// *inside* an instrument/order book is never touched here — only which
/// shard owns which key, and venue/feed registration.
#[derive(Default)]
struct LibraryIndex {
    all_instruments: HashMap<InstrumentId, usize>,
    all_order_books: HashMap<InstrumentKey, usize>,
    symbol_index: HashMap<SymKey, InstrumentId>,
    venues: HashMap<VenueId, Venue>,
    feeds: std::collections::HashSet<String>,
    /// `out_key -> [(in_key, in_rank), ...]`, ascending by `in_rank`.
    venue_mapping: HashMap<InstrumentKey, Vec<(InstrumentKey, i32)>>,
    /// Leg descriptors for every combination book, keyed by its own
    /// `InstrumentKey`. The book itself lives in `all_order_books`/the
    /// owning shard's `order_books` map like any other book — a
    /// `Combination` only exists as a `Leg` list plus a plain `OrderBook`
    /// once it leaves [`Combination::new`].
    combinations: HashMap<InstrumentKey, Vec<Leg>>,
}

pub struct Library {
    shards: Vec<Shard>,
    index: RwLock<LibraryIndex>,
    broadcaster: Broadcaster,
}

impl Library {
    pub fn new(num_shards: usize, core_ids: Option<&[usize]>) -> Self {
        let shards = (0..num_shards)
            .map(|id| Shard::spawn(id, core_ids.and_then(|ids| ids.get(id).copied())))
            .collect();
        Self {
            shards,
            index: RwLock::new(LibraryIndex::default()),
            broadcaster: Broadcaster::new(),
        }
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    fn shard_for<H: std::hash::Hash>(&self, key: &H) -> usize {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    pub fn current_seq_no(&self) -> u64 {
        self.broadcaster.current_seq_no()
    }

    // --- Venues ----------------------------------------------------------

    pub fn add_venue(&self, id: VenueId, order_id_scope: OrderIdScope) {
        self.mut_add_venue(id, order_id_scope);
        let body = VenueKeyBody { venue: id.0.as_bytes() };
        // Shard 0 is as good as any: venue registration isn't owned by a
        // shard, but every broadcast record still needs one to tag.
        self.broadcaster.emit(0, 0, RecordType::AddVenue, &body);
    }

    fn mut_add_venue(&self, id: VenueId, order_id_scope: OrderIdScope) {
        self.index.write().venues.insert(id, Venue::new(id, order_id_scope));
    }

    pub fn venue_order_id_scope(&self, id: VenueId) -> Option<OrderIdScope> {
        self.index.read().venues.get(&id).map(|v| v.order_id_scope)
    }

    pub fn add_feed(&self, name: impl Into<String>) {
        self.index.write().feeds.insert(name.into());
    }

    /// Synchronously drains every shard's queue (guaranteeing every
    /// previously-enqueued mutation has applied) before marking `venue`'s
    /// reference data ready.
    pub fn loaded(&self, venue: VenueId) -> Result<(), MdError> {
        self.mut_loaded(venue)?;
        let body = VenueKeyBody { venue: venue.0.as_bytes() };
        self.broadcaster.emit(0, 0, RecordType::RefDataLoaded, &body);
        Ok(())
    }

    fn mut_loaded(&self, venue: VenueId) -> Result<(), MdError> {
        self.sync();
        let mut idx = self.index.write();
        let v = idx
            .venues
            .get_mut(&venue)
            .ok_or_else(|| MdError::UnknownVenue { venue_id: venue.as_str().to_string() })?;
        v.ref_data_loaded = true;
        Ok(())
    }

    /// Drains every shard's queue, serially. The per-shard `invoke` already
    /// blocks until the no-op has run, so no separate completion signal is
    /// needed beyond that — this replaces the semaphore the original
    /// implementation used for the same purpose.
    pub fn sync(&self) {
        for shard in &self.shards {
            shard.invoke(|_| ());
        }
    }

    // --- Instruments -------------------------------------------------

    pub fn add_instrument(&self, id: InstrumentId, ref_data: RefData) -> Result<(), MdError> {
        self.mut_add_instrument(id, ref_data)?;
        self.emit_add_instrument(id);
        Ok(())
    }

    fn mut_add_instrument(&self, id: InstrumentId, ref_data: RefData) -> Result<(), MdError> {
        let shard_id = {
            let mut idx = self.index.write();
            if idx.all_instruments.contains_key(&id) {
                return Err(MdError::Malformed {
                    reason: format!("instrument {} already exists", id),
                });
            }
            let shard_id = self.shard_for(&id);
            idx.all_instruments.insert(id, shard_id);
            shard_id
        };
        self.shards[shard_id].invoke(move |state| {
            state.instruments.insert(id.as_str().to_string(), Instrument::new(id, ref_data));
        });
        Ok(())
    }

    /// `addInstrument`'s wire body is a bare instrument key — an instrument
    /// has no venue/segment of its own until an order book is added under
    /// it, so that half of the key goes out blank.
    fn emit_add_instrument(&self, id: InstrumentId) {
        let shard_id = self.instrument_shard(id).expect("just inserted");
        let body = InstrumentKeyBody {
            venue: [0u8; 8],
            segment: [0u8; 8],
            id: id.0.as_bytes(),
        };
        self.broadcaster.emit(shard_id, 0, RecordType::AddInstrument, &body);
    }

    pub fn instrument_shard(&self, id: InstrumentId) -> Option<usize> {
        self.index.read().all_instruments.get(&id).copied()
    }

    pub fn register_symbol(&self, sym: SymKey, id: InstrumentId) {
        self.index.write().symbol_index.insert(sym, id);
    }

    pub fn lookup_symbol(&self, sym: &SymKey) -> Option<InstrumentId> {
        self.index.read().symbol_index.get(sym).copied()
    }

    // --- Order books -------------------------------------------------

    /// An order book is owned by its instrument's shard, so routing
    /// follows the instrument, not a fresh hash of the book key.
    pub fn add_order_book(
        &self,
        instrument_id: InstrumentId,
        key: InstrumentKey,
        px_ndp: Ndp,
        qty_ndp: Ndp,
    ) -> Result<(), MdError> {
        let shard_id = self.mut_add_order_book(instrument_id, key, px_ndp, qty_ndp)?;
        let body = AddOrderBookBody {
            venue: key.venue.0.as_bytes(),
            segment: key.segment.0.as_bytes(),
            id: key.id.0.as_bytes(),
            price_ndp: px_ndp.get(),
            qty_ndp: qty_ndp.get(),
            _pad: [0; 6],
        };
        self.broadcaster.emit(shard_id, 0, RecordType::AddOrderBook, &body);
        Ok(())
    }

    fn mut_add_order_book(
        &self,
        instrument_id: InstrumentId,
        key: InstrumentKey,
        px_ndp: Ndp,
        qty_ndp: Ndp,
    ) -> Result<usize, MdError> {
        let shard_id = self.instrument_shard(instrument_id).ok_or_else(|| MdError::NoOrderBook {
            key: format!("{}", key),
        })?;
        {
            let mut idx = self.index.write();
            idx.all_order_books.insert(key, shard_id);
        }
        self.shards[shard_id].invoke(move |state| {
            use crate::book::OrderBook;
            state.order_books.insert(key, OrderBook::new(key, px_ndp, qty_ndp));
            if let Some(inst) = state.instruments.get_mut(instrument_id.as_str()) {
                inst.add_order_book(key.venue, key.segment, key);
            }
        });
        Ok(shard_id)
    }

    pub fn order_book_shard(&self, key: &InstrumentKey) -> Option<usize> {
        self.index.read().all_order_books.get(key).copied()
    }

    pub fn del_order_book(&self, key: InstrumentKey) -> Result<(), MdError> {
        let shard_id = self.mut_del_order_book(key)?;
        self.emit_instrument_key(shard_id, key, RecordType::DelOrderBook);
        Ok(())
    }

    fn mut_del_order_book(&self, key: InstrumentKey) -> Result<usize, MdError> {
        let shard_id = self
            .order_book_shard(&key)
            .ok_or_else(|| MdError::NoOrderBook { key: format!("{}", key) })?;
        self.index.write().all_order_books.remove(&key);
        self.shards[shard_id].invoke(move |state| {
            state.order_books.remove(&key);
        });
        Ok(shard_id)
    }

    fn emit_instrument_key(&self, shard_id: usize, key: InstrumentKey, record_type: RecordType) {
        let (venue, segment, id) = key_to_bytes(key);
        let body = InstrumentKeyBody { venue, segment, id };
        self.broadcaster.emit(shard_id, 0, record_type, &body);
    }

    /// Runs `f` against the order book at `key`, on its owning shard, and
    /// blocks for the result. Used by callers (the broadcast layer, the
    /// CLI, tests) that need to read or mutate one book synchronously.
    pub fn with_order_book<T: Send + 'static>(
        &self,
        key: InstrumentKey,
        f: impl FnOnce(&mut crate::book::OrderBook) -> T + Send + 'static,
    ) -> Result<T, MdError> {
        let shard_id = self
            .order_book_shard(&key)
            .ok_or_else(|| MdError::NoOrderBook { key: format!("{}", key) })?;
        Ok(self.shards[shard_id].invoke(move |state| {
            let book = state.order_books.get_mut(&key).expect("routed key must exist");
            f(book)
        }))
    }

    // --- Venue mapping (out-chain) ---------------------------------------

    /// Registers `in_key` as mapping into `out_key` at `in_rank`, updating
    /// both books' metadata on their respective shards. Not itself a
    /// broadcast event — it only takes effect on subsequent mutations,
    /// which is when the out-chain propagation it enables gets broadcast.
    pub fn map(&self, in_key: InstrumentKey, in_rank: i32, out_key: InstrumentKey) -> Result<(), MdError> {
        {
            let mut idx = self.index.write();
            let list = idx.venue_mapping.entry(out_key).or_default();
            list.retain(|(k, _)| *k != in_key);
            let pos = list.iter().position(|(_, r)| *r > in_rank).unwrap_or(list.len());
            list.insert(pos, (in_key, in_rank));
        }
        self.with_order_book(in_key, move |book| book.register_out(out_key))?;
        self.with_order_book(out_key, move |book| book.insert_in(in_key, in_rank))?;
        Ok(())
    }

    pub fn out_mapping(&self, out_key: InstrumentKey) -> Vec<(InstrumentKey, i32)> {
        self.index.read().venue_mapping.get(&out_key).cloned().unwrap_or_default()
    }

    /// Walks `key`'s out-chain, replaying `delta` at each mapped book's
    /// equivalent level, broadcasting each hop as an `L2` record (an
    /// out-book's own state, not the originating `pxLevel`/order event),
    /// and recursing so a chain of mappings three books deep still
    /// reaches the last one.
    fn propagate_out_chain(&self, key: InstrumentKey, t: DateTime, delta: PxDelta) -> Result<(), MdError> {
        if delta.delta_qty == 0 && delta.delta_n_orders == 0 {
            return Ok(());
        }
        let out_keys = self.with_order_book(key, |book| book.out.clone())?;
        for out_key in out_keys {
            let n_orders_bits = delta.delta_n_orders as i32 as u32;
            let out_delta = self.with_order_book(out_key, move |book| {
                book.px_level(delta.side, t, true, delta.price, Value::new(delta.delta_qty), n_orders_bits, delta.flags)
            })?;
            self.emit_px_level(out_key, t, out_delta, RecordType::L2)?;
            self.propagate_out_chain(out_key, t, out_delta)?;
        }
        Ok(())
    }

    fn emit_px_level(&self, key: InstrumentKey, t: DateTime, delta: PxDelta, record_type: RecordType) -> Result<(), MdError> {
        let shard_id = self.order_book_shard(&key).ok_or_else(|| MdError::NoOrderBook { key: format!("{}", key) })?;
        let (venue, segment, id) = key_to_bytes(key);
        let body = PxLevelBody {
            venue,
            segment,
            id,
            side: side_to_code(delta.side),
            _pad: [0],
            rank: U16::new(0),
            price: I64::new(delta.price.raw()),
            qty: I64::new(delta.delta_qty),
            n_orders: U32::new(delta.delta_n_orders as i32 as u32),
            flags: delta.flags,
            _pad2: [0; 3],
        };
        self.broadcaster.emit(shard_id, t.nsec, record_type, &body);
        Ok(())
    }

    // --- L1 ------------------------------------------------------------

    pub fn l1(&self, key: InstrumentKey, t: DateTime, update: L1Update) -> Result<(), MdError> {
        self.mut_l1(key, t, update)
    }

    fn mut_l1(&self, key: InstrumentKey, t: DateTime, update: L1Update) -> Result<(), MdError> {
        let shard_id = self.order_book_shard(&key).ok_or_else(|| MdError::NoOrderBook { key: format!("{}", key) })?;
        let l1 = self.with_order_book(key, move |book| -> Result<L1Data, MdError> {
            book.ingest_l1(update)?;
            Ok(book.l1)
        })??;
        let (venue, segment, id) = key_to_bytes(key);
        let body = L1Body {
            venue,
            segment,
            id,
            bid_price: I64::new(l1.bid.raw()),
            bid_qty: I64::new(l1.bid_qty.raw()),
            ask_price: I64::new(l1.ask.raw()),
            ask_qty: I64::new(l1.ask_qty.raw()),
            tick_dir: wire::tick_dir_to_code(l1.tick_dir),
            _pad: [0; 7],
        };
        self.broadcaster.emit(shard_id, t.nsec, RecordType::L1, &body);
        Ok(())
    }

    // --- Price-level / order mutations ----------------------------------

    pub fn px_level(
        &self,
        key: InstrumentKey,
        side: Side,
        t: DateTime,
        delta_mode: bool,
        price: Value,
        qty: Value,
        n_orders: u32,
        flags: u8,
    ) -> Result<(), MdError> {
        let delta = self.mut_px_level(key, side, t, delta_mode, price, qty, n_orders, flags)?;
        self.emit_px_level(key, t, delta, RecordType::PxLevel)?;
        self.propagate_out_chain(key, t, delta)
    }

    fn mut_px_level(
        &self,
        key: InstrumentKey,
        side: Side,
        t: DateTime,
        delta_mode: bool,
        price: Value,
        qty: Value,
        n_orders: u32,
        flags: u8,
    ) -> Result<PxDelta, MdError> {
        self.with_order_book(key, move |book| book.px_level(side, t, delta_mode, price, qty, n_orders, flags))
    }

    pub fn add_order(&self, key: InstrumentKey, t: DateTime, order: Order) -> Result<(), MdError> {
        let shard_id = self.order_book_shard(&key).ok_or_else(|| MdError::NoOrderBook { key: format!("{}", key) })?;
        let body = order_body(key, &order);
        let delta = self.mut_add_order(key, t, order)?;
        self.broadcaster.emit(shard_id, t.nsec, RecordType::AddOrder, &body);
        self.propagate_order_delta(key, t, delta)
    }

    fn mut_add_order(&self, key: InstrumentKey, t: DateTime, order: Order) -> Result<OrderDelta, MdError> {
        self.with_order_book(key, move |book| book.add_order(t, order))
    }

    pub fn modify_order(&self, key: InstrumentKey, t: DateTime, order: Order) -> Result<(), MdError> {
        let shard_id = self.order_book_shard(&key).ok_or_else(|| MdError::NoOrderBook { key: format!("{}", key) })?;
        let body = order_body(key, &order);
        let delta = self.mut_modify_order(key, t, order)?;
        self.broadcaster.emit(shard_id, t.nsec, RecordType::ModifyOrder, &body);
        self.propagate_order_delta(key, t, delta)
    }

    fn mut_modify_order(&self, key: InstrumentKey, t: DateTime, order: Order) -> Result<OrderDelta, MdError> {
        self.with_order_book(key, move |book| book.modify_order(t, order))
    }

    fn propagate_order_delta(&self, key: InstrumentKey, t: DateTime, delta: OrderDelta) -> Result<(), MdError> {
        match delta {
            OrderDelta::Single(d) => self.propagate_out_chain(key, t, d),
            OrderDelta::Pair(old, new) => {
                self.propagate_out_chain(key, t, old)?;
                if let Some(new) = new {
                    self.propagate_out_chain(key, t, new)?;
                }
                Ok(())
            }
        }
    }

    /// `reduceOrder` has no dedicated wire event — it shrinks a resting
    /// order's quantity without changing its identity, which is exactly
    /// what a `pxLevel` delta already describes, so it broadcasts as one.
    pub fn reduce_order(&self, key: InstrumentKey, id: &str, t: DateTime, side: Side, reduce_qty: Value) -> Result<(), MdError> {
        let delta = self.mut_reduce_order(key, id, t, side, reduce_qty)?;
        self.emit_px_level(key, t, delta, RecordType::PxLevel)?;
        self.propagate_out_chain(key, t, delta)
    }

    fn mut_reduce_order(&self, key: InstrumentKey, id: &str, t: DateTime, side: Side, reduce_qty: Value) -> Result<PxDelta, MdError> {
        let id = id.to_string();
        self.with_order_book(key, move |book| book.reduce_order(&id, t, side, reduce_qty))?
    }

    pub fn cancel_order(&self, key: InstrumentKey, id: &str, t: DateTime, side: Side) -> Result<(), MdError> {
        let shard_id = self.order_book_shard(&key).ok_or_else(|| MdError::NoOrderBook { key: format!("{}", key) })?;
        let delta = self.mut_cancel_order(key, id, t, side)?;
        let (venue, segment, inst_id) = key_to_bytes(key);
        let body = CancelOrderBody {
            venue,
            segment,
            id: inst_id,
            order_id: order_id_to_bytes(id),
            side: side_to_code(side),
            _pad: [0; 7],
        };
        self.broadcaster.emit(shard_id, t.nsec, RecordType::CancelOrder, &body);
        self.propagate_out_chain(key, t, delta)
    }

    fn mut_cancel_order(&self, key: InstrumentKey, id: &str, t: DateTime, side: Side) -> Result<PxDelta, MdError> {
        let id = id.to_string();
        self.with_order_book(key, move |book| book.cancel_order(&id, t, side))?
    }

    pub fn reset_ob(&self, key: InstrumentKey, t: DateTime) -> Result<(), MdError> {
        let shard_id = self.order_book_shard(&key).ok_or_else(|| MdError::NoOrderBook { key: format!("{}", key) })?;
        self.mut_reset_ob(key, t)?;
        self.emit_instrument_key(shard_id, key, RecordType::ResetOb);
        Ok(())
    }

    fn mut_reset_ob(&self, key: InstrumentKey, t: DateTime) -> Result<bool, MdError> {
        self.with_order_book(key, move |book| book.reset(t, |_| ()))
    }

    // --- Combinations ------------------------------------------------

    /// Builds a [`Combination`], stores its book alongside every other
    /// order book (the shards only ever hold plain `OrderBook`s — the leg
    /// descriptors that make one a combination live in the library index
    /// instead), and broadcasts `addCombination`.
    pub fn add_combination(&self, key: InstrumentKey, px_ndp: Ndp, qty_ndp: Ndp, legs: Vec<Leg>) -> Result<(), MdError> {
        let shard_id = self.mut_add_combination(key, px_ndp, qty_ndp, legs.clone())?;
        let body = combination_body(key, px_ndp, qty_ndp, &legs);
        self.broadcaster.emit(shard_id, 0, RecordType::AddCombination, &body);
        Ok(())
    }

    fn mut_add_combination(&self, key: InstrumentKey, px_ndp: Ndp, qty_ndp: Ndp, legs: Vec<Leg>) -> Result<usize, MdError> {
        let combo = Combination::new(key, px_ndp, qty_ndp, legs.clone());
        let shard_id = self.shard_for(&key);
        {
            let mut idx = self.index.write();
            idx.all_order_books.insert(key, shard_id);
            idx.combinations.insert(key, legs);
        }
        self.shards[shard_id].invoke(move |state| {
            state.order_books.insert(key, combo.book);
        });
        Ok(shard_id)
    }

    pub fn del_combination(&self, key: InstrumentKey) -> Result<(), MdError> {
        let shard_id = self.mut_del_combination(key)?;
        self.emit_instrument_key(shard_id, key, RecordType::DelCombination);
        Ok(())
    }

    fn mut_del_combination(&self, key: InstrumentKey) -> Result<usize, MdError> {
        let shard_id = self.mut_del_order_book(key)?;
        self.index.write().combinations.remove(&key);
        Ok(shard_id)
    }

    pub fn combination_legs(&self, key: InstrumentKey) -> Option<Vec<Leg>> {
        self.index.read().combinations.get(&key).cloned()
    }

    // --- Subscriber apply path -------------------------------------------

    /// Decodes `frame`'s body per its record type and drives the matching
    /// shard-level mutation directly, mirroring upstream state without
    /// assigning this process's own broadcast sequence numbers — the
    /// record already carries the originator's seqNo.
    ///
    /// Record types whose fixed-layout body cannot carry enough
    /// information to reconstruct the mutation exactly (trading-session
    /// detail, tick-size schedules, reference-data corrections) are
    /// applied best-effort or just observed; see the per-arm comments.
    pub fn apply(&self, frame: &Frame) -> Result<(), MdError> {
        use RecordType::*;
        match frame.record_type {
            Login | ResendReq | EndOfSnapshot | HeartBeat => Ok(()),

            AddVenue => {
                let body = read::<VenueKeyBody>(&frame.body)?;
                self.mut_add_venue(VenueId(FixedId::from_bytes(body.venue)), OrderIdScope::OrderBook);
                Ok(())
            }
            RefDataLoaded => {
                let body = read::<VenueKeyBody>(&frame.body)?;
                // Best-effort: a venue this process hasn't seen `AddVenue`
                // for yet has nothing to mark ready.
                let _ = self.mut_loaded(VenueId(FixedId::from_bytes(body.venue)));
                Ok(())
            }

            AddInstrument => {
                let body = read::<InstrumentKeyBody>(&frame.body)?;
                let id = InstrumentId(FixedId::from_bytes(body.id));
                // The wire body carries no NDPs; a receiver building a full
                // mirror needs the richer reference-data channel this
                // record type doesn't model. Ndp(0) is a placeholder that
                // `AddOrderBook`'s own (fully-specified) body corrects.
                match self.mut_add_instrument(id, RefData::new(Ndp::new_unchecked(0), Ndp::new_unchecked(0))) {
                    Ok(()) | Err(MdError::Malformed { .. }) => Ok(()),
                    Err(e) => Err(e),
                }
            }
            AddOrderBook => {
                let body = read::<AddOrderBookBody>(&frame.body)?;
                let key = key_from_bytes(body.venue, body.segment, body.id);
                let px_ndp = Ndp::new(body.price_ndp).map_err(MdError::from)?;
                let qty_ndp = Ndp::new(body.qty_ndp).map_err(MdError::from)?;
                self.mut_add_order_book(key.id, key, px_ndp, qty_ndp).map(|_| ())
            }
            UpdateInstrument | UpdateOrderBook => {
                // Carries only the key, not the changed fields — nothing
                // this process can apply without the reference-data
                // channel these events summarize. Observed, not mutated.
                let _ = read::<InstrumentKeyBody>(&frame.body)?;
                Ok(())
            }
            DelOrderBook => {
                let body = read::<InstrumentKeyBody>(&frame.body)?;
                self.mut_del_order_book(key_from_bytes(body.venue, body.segment, body.id)).map(|_| ())
            }

            L1 => {
                let body = read::<L1Body>(&frame.body)?;
                let key = key_from_bytes(body.venue, body.segment, body.id);
                let update = L1Update {
                    bid: Value::new(body.bid_price.get()),
                    bid_qty: Value::new(body.bid_qty.get()),
                    ask: Value::new(body.ask_price.get()),
                    ask_qty: Value::new(body.ask_qty.get()),
                    ..Default::default()
                };
                self.mut_l1_apply(key, update)
            }
            PxLevel | L2 => {
                let body = read::<PxLevelBody>(&frame.body)?;
                let key = key_from_bytes(body.venue, body.segment, body.id);
                let side = side_from_code(body.side).ok_or_else(|| MdError::Malformed { reason: "bad side code".into() })?;
                let delta_mode = frame.record_type == PxLevel;
                self.mut_px_level(
                    key,
                    side,
                    DateTime::new(0, 0, frame.hdr.nsec()),
                    delta_mode,
                    Value::new(body.price.get()),
                    Value::new(body.qty.get()),
                    body.n_orders.get(),
                    body.flags,
                )
                .map(|_| ())
            }
            AddOrder | ModifyOrder => {
                let body = read::<OrderBody>(&frame.body)?;
                let key = key_from_bytes(body.venue, body.segment, body.id);
                let side = side_from_code(body.side).ok_or_else(|| MdError::Malformed { reason: "bad side code".into() })?;
                let order = Order::new(order_id_from_bytes(body.order_id), side, Value::new(body.price.get()), Value::new(body.qty.get()), body.flags);
                let t = DateTime::new(0, 0, frame.hdr.nsec());
                if frame.record_type == AddOrder {
                    self.mut_add_order(key, t, order).map(|_| ())
                } else {
                    self.mut_modify_order(key, t, order).map(|_| ())
                }
            }
            CancelOrder => {
                let body = read::<CancelOrderBody>(&frame.body)?;
                let key = key_from_bytes(body.venue, body.segment, body.id);
                let side = side_from_code(body.side).ok_or_else(|| MdError::Malformed { reason: "bad side code".into() })?;
                let id = order_id_from_bytes(body.order_id);
                self.mut_cancel_order(key, &id, DateTime::new(0, 0, frame.hdr.nsec()), side).map(|_| ())
            }
            AddTrade | CorrectTrade => {
                // Best-effort: fold the trade price/qty into L1's last/
                // lastQty rather than modeling a full trade ledger.
                let body = read::<TradeBody>(&frame.body)?;
                let key = key_from_bytes(body.venue, body.segment, body.id);
                let update = L1Update {
                    last: Value::new(body.price.get()),
                    last_qty: Value::new(body.qty.get()),
                    ..Default::default()
                };
                self.mut_l1_apply(key, update)
            }
            CancelTrade => {
                // No local trade ledger to retract a fill from; observed
                // only.
                let _ = read::<crate::wire::CancelTradeBody>(&frame.body)?;
                Ok(())
            }
            ResetOb => {
                let body = read::<InstrumentKeyBody>(&frame.body)?;
                let key = key_from_bytes(body.venue, body.segment, body.id);
                self.mut_reset_ob(key, DateTime::new(0, 0, frame.hdr.nsec())).map(|_| ())
            }

            TradingSession => {
                let body = read::<crate::wire::TradingSessionBody>(&frame.body)?;
                let key = key_from_bytes(body.venue, body.segment, body.id);
                let mut idx = self.index.write();
                if let Some(v) = idx.venues.get_mut(&key.venue) {
                    v.trading_session(key.segment, body.session, DateTime::new(0, 0, frame.hdr.nsec()));
                }
                Ok(())
            }
            AddTickSizeTbl | AddTickSize | ResetTickSizeTbl => {
                // Tick-size schedules are venue reference data, not book
                // state — out of scope for the per-book apply path.
                Ok(())
            }

            AddCombination => {
                let body = read::<AddCombinationBody>(&frame.body)?;
                let key = key_from_bytes(body.venue, body.segment, body.id);
                let px_ndp = Ndp::new(body.price_ndp).map_err(MdError::from)?;
                let qty_ndp = Ndp::new(body.qty_ndp).map_err(MdError::from)?;
                let legs = body.legs[..(body.leg_count as usize).min(MAX_COMBINATION_LEGS)]
                    .iter()
                    .map(|l| Leg {
                        instrument: key_from_bytes(l.venue, l.segment, l.id),
                        side: side_from_code(l.side).unwrap_or(Side::Buy),
                        ratio: l.ratio.get(),
                    })
                    .collect();
                self.mut_add_combination(key, px_ndp, qty_ndp, legs).map(|_| ())
            }
            DelCombination => {
                let body = read::<InstrumentKeyBody>(&frame.body)?;
                self.mut_del_combination(key_from_bytes(body.venue, body.segment, body.id)).map(|_| ())
            }
        }
    }

    fn mut_l1_apply(&self, key: InstrumentKey, update: L1Update) -> Result<(), MdError> {
        self.with_order_book(key, move |book| book.ingest_l1(update))?
    }

    // --- Cross-shard fan-out ----------------------------------------

    /// All known instrument ids, gathered by invoking every shard serially
    /// (each `invoke` is itself a synchronization point).
    pub fn all_instruments(&self) -> Vec<InstrumentId> {
        self.shards
            .iter()
            .flat_map(|shard| shard.invoke(|state| state.instruments.values().map(|i| i.id).collect::<Vec<_>>()))
            .collect()
    }

    pub fn all_order_books(&self) -> Vec<InstrumentKey> {
        self.shards
            .iter()
            .flat_map(|shard| shard.invoke(|state| state.order_books.keys().copied().collect::<Vec<_>>()))
            .collect()
    }
}

fn order_body(key: InstrumentKey, order: &Order) -> OrderBody {
    let (venue, segment, id) = key_to_bytes(key);
    OrderBody {
        venue,
        segment,
        id,
        order_id: order_id_to_bytes(&order.id),
        side: side_to_code(order.side),
        _pad: [0; 7],
        price: I64::new(order.price.raw()),
        qty: I64::new(order.qty.raw()),
        flags: order.flags,
        _pad2: [0; 7],
    }
}

fn combination_body(key: InstrumentKey, px_ndp: Ndp, qty_ndp: Ndp, legs: &[Leg]) -> AddCombinationBody {
    let (venue, segment, id) = key_to_bytes(key);
    let mut bodies = [CombinationLegBody {
        venue: [0; 8],
        segment: [0; 8],
        id: [0; 8],
        side: 0,
        _pad: [0; 3],
        ratio: zerocopy::byteorder::little_endian::I32::new(0),
    }; MAX_COMBINATION_LEGS];
    for (slot, leg) in bodies.iter_mut().zip(legs.iter()) {
        let (lv, ls, lid) = key_to_bytes(leg.instrument);
        *slot = CombinationLegBody {
            venue: lv,
            segment: ls,
            id: lid,
            side: side_to_code(leg.side),
            _pad: [0; 3],
            ratio: zerocopy::byteorder::little_endian::I32::new(leg.ratio),
        };
    }
    AddCombinationBody {
        venue,
        segment,
        id,
        price_ndp: px_ndp.get(),
        qty_ndp: qty_ndp.get(),
        leg_count: legs.len().min(MAX_COMBINATION_LEGS) as u8,
        _pad: [0; 5],
        legs: bodies,
    }
}

fn read<T: zerocopy::FromBytes>(body: &bytes::Bytes) -> Result<T, MdError> {
    T::read_from_bytes(&body[..]).map_err(|_| MdError::Malformed { reason: "body size mismatch".into() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SegmentId;

    fn lib() -> Library {
        Library::new(2, None)
    }

    #[test]
    fn add_instrument_and_order_book_round_trips() {
        let lib = lib();
        let id = InstrumentId::new("AAPL");
        lib.add_instrument(id, RefData::new(Ndp::new(2).unwrap(), Ndp::new(0).unwrap()))
            .unwrap();
        let key = InstrumentKey::new(VenueId::new("XNAS"), SegmentId::new("0"), id);
        lib.add_order_book(id, key, Ndp::new(2).unwrap(), Ndp::new(0).unwrap()).unwrap();
        assert!(lib.order_book_shard(&key).is_some());
        assert_eq!(lib.all_order_books(), vec![key]);
    }

    #[test]
    fn duplicate_instrument_is_rejected() {
        let lib = lib();
        let id = InstrumentId::new("AAPL");
        lib.add_instrument(id, RefData::new(Ndp::new(2).unwrap(), Ndp::new(0).unwrap()))
            .unwrap();
        assert!(lib
            .add_instrument(id, RefData::new(Ndp::new(2).unwrap(), Ndp::new(0).unwrap()))
            .is_err());
    }

    #[test]
    fn loaded_marks_venue_ready() {
        let lib = lib();
        let venue = VenueId::new("XNAS");
        lib.add_venue(venue, OrderIdScope::OrderBook);
        lib.loaded(venue).unwrap();
        assert!(lib.index.read().venues.get(&venue).unwrap().ref_data_loaded);
    }

    #[test]
    fn map_updates_both_books_out_in_lists() {
        let lib = lib();
        let a = InstrumentId::new("A");
        let b = InstrumentId::new("B");
        lib.add_instrument(a, RefData::new(Ndp::new(2).unwrap(), Ndp::new(0).unwrap())).unwrap();
        lib.add_instrument(b, RefData::new(Ndp::new(2).unwrap(), Ndp::new(0).unwrap())).unwrap();
        let in_key = InstrumentKey::new(VenueId::new("V1"), SegmentId::new("0"), a);
        let out_key = InstrumentKey::new(VenueId::new("V2"), SegmentId::new("0"), b);
        lib.add_order_book(a, in_key, Ndp::new(2).unwrap(), Ndp::new(0).unwrap()).unwrap();
        lib.add_order_book(b, out_key, Ndp::new(2).unwrap(), Ndp::new(0).unwrap()).unwrap();
        lib.map(in_key, 1, out_key).unwrap();
        assert_eq!(lib.out_mapping(out_key), vec![(in_key, 1)]);
        let has_out = lib.with_order_book(in_key, |book| book.out.contains(&out_key)).unwrap();
        assert!(has_out);
    }

    fn book_key(venue: &str, id: &str) -> InstrumentKey {
        InstrumentKey::new(VenueId::new(venue), SegmentId::new("0"), InstrumentId::new(id))
    }

    fn setup_book(lib: &Library, key: InstrumentKey) {
        lib.add_instrument(key.id, RefData::new(Ndp::new(2).unwrap(), Ndp::new(0).unwrap())).unwrap();
        lib.add_order_book(key.id, key, Ndp::new(2).unwrap(), Ndp::new(0).unwrap()).unwrap();
    }

    #[test]
    fn add_order_broadcasts_and_increments_seq_no() {
        let lib = lib();
        let key = book_key("XNAS", "AAPL");
        setup_book(&lib, key);
        let before = lib.current_seq_no();
        lib.add_order(key, DateTime::NULL, Order::new("o1", Side::Buy, Value::new(100), Value::new(10), 0))
            .unwrap();
        assert!(lib.current_seq_no() > before);
        let has_order = lib.with_order_book(key, |book| book.bids.find_order("o1").is_some()).unwrap();
        assert!(has_order);
    }

    #[test]
    fn mutation_propagates_through_out_chain() {
        let lib = lib();
        let leg = book_key("XNAS", "LEG");
        let out = book_key("XNAS", "OUT");
        setup_book(&lib, leg);
        setup_book(&lib, out);
        lib.map(leg, 0, out).unwrap();

        lib.add_order(leg, DateTime::NULL, Order::new("o1", Side::Buy, Value::new(100), Value::new(10), 0))
            .unwrap();

        let out_qty = lib.with_order_book(out, |book| book.bids.level(Value::new(100)).map(|l| l.qty)).unwrap();
        assert_eq!(out_qty, Some(Value::new(10)));
    }

    #[test]
    fn cancel_order_removes_from_out_chain_too() {
        let lib = lib();
        let leg = book_key("XNAS", "LEG2");
        let out = book_key("XNAS", "OUT2");
        setup_book(&lib, leg);
        setup_book(&lib, out);
        lib.map(leg, 0, out).unwrap();

        lib.add_order(leg, DateTime::NULL, Order::new("o1", Side::Buy, Value::new(100), Value::new(10), 0))
            .unwrap();
        lib.cancel_order(leg, "o1", DateTime::NULL, Side::Buy).unwrap();

        let out_level = lib.with_order_book(out, |book| book.bids.level(Value::new(100)).is_some()).unwrap();
        assert!(!out_level);
    }

    #[test]
    fn add_combination_stores_legs_and_book() {
        let lib = lib();
        let leg_key = book_key("XNAS", "LEG3");
        setup_book(&lib, leg_key);
        let combo_key = book_key("XNAS", "SPREAD1");
        lib.add_combination(
            combo_key,
            Ndp::new(2).unwrap(),
            Ndp::new(0).unwrap(),
            vec![Leg { instrument: leg_key, side: Side::Buy, ratio: 1 }],
        )
        .unwrap();
        assert!(lib.order_book_shard(&combo_key).is_some());
        assert_eq!(lib.combination_legs(combo_key).unwrap().len(), 1);
    }

    #[test]
    fn apply_add_order_frame_mutates_local_book_without_new_broadcast() {
        let lib = lib();
        let key = book_key("XNAS", "AAPL");
        setup_book(&lib, key);
        let before = lib.current_seq_no();

        let order = Order::new("o9", Side::Buy, Value::new(100), Value::new(5), 0);
        let body = order_body(key, &order);
        let frame_bytes = wire::encode(999, 0, RecordType::AddOrder, &body);
        let frame = wire::decode(&frame_bytes).unwrap();

        lib.apply(&frame).unwrap();

        assert_eq!(lib.current_seq_no(), before);
        let has_order = lib.with_order_book(key, |book| book.bids.find_order("o9").is_some()).unwrap();
        assert!(has_order);
    }
}
