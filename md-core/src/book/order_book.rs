//! A single order book: both sides, L1 aggregate state, and the out-chain
//! that mirrors its deltas into mapped books.

use crate::book::l1::{L1Data, L1Update};
use crate::book::order::Order;
use crate::book::side::OBSide;
use crate::core::{DateTime, InstrumentKey, MdError, Ndp, Side, Value};

/// The net change a mutation made to one price level, in a form the
/// library can replay at an out-mapped book's equivalent level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PxDelta {
    pub side: Side,
    pub price: Value,
    pub delta_qty: i64,
    pub delta_n_orders: i64,
    pub flags: u8,
}

/// `modifyOrder` produces a removal at the old price and (unless the order
/// was evicted at qty 0) an addition at the new one; both must reach the
/// out-chain.
#[derive(Debug, Clone, Copy)]
pub enum OrderDelta {
    Single(PxDelta),
    Pair(PxDelta, Option<PxDelta>),
}

/// An L1 field that changed and needs rebroadcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L1Delta {
    pub bid: Value,
    pub bid_qty: Value,
    pub ask: Value,
    pub ask_qty: Value,
}

pub struct OrderBook {
    pub key: InstrumentKey,
    pub px_ndp: Ndp,
    pub qty_ndp: Ndp,
    /// Dark-pool venues suppress L2 re-derivation from order/level activity.
    pub dark: bool,
    pub bids: OBSide,
    pub asks: OBSide,
    pub l1: L1Data,
    /// Books this one propagates deltas into.
    pub out: Vec<InstrumentKey>,
    /// Books that propagate into this one, sorted ascending by `in_rank`.
    pub in_: Vec<(InstrumentKey, i32)>,
}

impl OrderBook {
    pub fn new(key: InstrumentKey, px_ndp: Ndp, qty_ndp: Ndp) -> Self {
        Self {
            key,
            px_ndp,
            qty_ndp,
            dark: false,
            bids: OBSide::new(Side::Buy),
            asks: OBSide::new(Side::Sell),
            l1: L1Data::new(),
            out: Vec::new(),
            in_: Vec::new(),
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut OBSide {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    fn side(&self, side: Side) -> &OBSide {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    // --- L1 ---------------------------------------------------------

    pub fn ingest_l1(&mut self, update: L1Update) -> Result<(), MdError> {
        self.l1.merge(update, self.px_ndp, self.qty_ndp)?;
        Ok(())
    }

    /// Compares the current best bid/ask against the last-broadcast L1 and
    /// returns the delta if they diverge. Dark-pool books never re-derive
    /// L2 into L1.
    pub fn derive_l2(&mut self) -> Option<L1Delta> {
        if self.dark {
            return None;
        }
        let (bid, bid_qty) = self
            .bids
            .best()
            .map(|l| (l.price, l.qty))
            .unwrap_or((Value::NULL, Value::NULL));
        let (ask, ask_qty) = self
            .asks
            .best()
            .map(|l| (l.price, l.qty))
            .unwrap_or((Value::NULL, Value::NULL));

        if bid == self.l1.bid && bid_qty == self.l1.bid_qty && ask == self.l1.ask && ask_qty == self.l1.ask_qty {
            return None;
        }
        self.l1.bid = bid;
        self.l1.bid_qty = bid_qty;
        self.l1.ask = ask;
        self.l1.ask_qty = ask_qty;
        Some(L1Delta {
            bid,
            bid_qty,
            ask,
            ask_qty,
        })
    }

    // --- Price-level ingress -----------------------------------------

    /// `price.is_null()` targets the unpriced "market" level.
    ///
    /// In delta mode, `n_orders` carries a signed order-count delta encoded
    /// as its two's-complement `u32` bit pattern — the same trick the
    /// original library plays by assigning a negated unsigned count
    /// (`d_nOrders = -nOrders`) and relying on wraparound arithmetic to
    /// recover it on the other end. Pass `(-1i32) as u32` for "one order
    /// left this level".
    pub fn px_level(
        &mut self,
        side: Side,
        t: DateTime,
        delta_mode: bool,
        price: Value,
        qty: Value,
        n_orders: u32,
        flags: u8,
    ) -> PxDelta {
        let book_side = self.side_mut(side);
        let existed = book_side.level(price).is_some();

        if !existed {
            if qty == Value::ZERO || qty.is_null() {
                return PxDelta {
                    side,
                    price,
                    delta_qty: 0,
                    delta_n_orders: 0,
                    flags,
                };
            }
            let level = book_side.get_or_create_level(price);
            let (dq, dn) = if delta_mode {
                level.update_delta(t, qty.raw(), n_orders as i32 as i64, flags)
            } else {
                level.update_abs(t, qty, n_orders, flags)
            };
            return PxDelta {
                side,
                price,
                delta_qty: dq,
                delta_n_orders: dn,
                flags: level.flags,
            };
        }

        let level = book_side.level_mut(price).expect("checked existed above");
        let (dq, dn) = if delta_mode {
            level.update_delta(t, qty.raw(), n_orders as i32 as i64, flags)
        } else {
            level.update_abs(t, qty, n_orders, flags)
        };
        let out_flags = level.flags;
        book_side.remove_level_if_empty(price);
        PxDelta {
            side,
            price,
            delta_qty: dq,
            delta_n_orders: dn,
            flags: out_flags,
        }
    }

    // --- Order ingress -------------------------------------------------

    /// `addOrder` is idempotent: an id already live is treated as
    /// `modifyOrder`.
    pub fn add_order(&mut self, t: DateTime, order: Order) -> OrderDelta {
        if self.side(order.side).find_order(&order.id).is_some() {
            return self.modify_order(t, order);
        }
        let side = order.side;
        let price = order.price;
        let qty = order.qty;
        self.side_mut(side).add_order(t, order);
        OrderDelta::Single(PxDelta {
            side,
            price,
            delta_qty: qty.raw(),
            delta_n_orders: 1,
            flags: 0,
        })
    }

    /// Removes the order from its current level, applies the new fields,
    /// and re-adds it — unless the new quantity is zero, in which case it
    /// is evicted instead.
    pub fn modify_order(&mut self, t: DateTime, new: Order) -> OrderDelta {
        let old_side = new.side;
        let removed = self.side_mut(old_side).remove_order(t, &new.id);
        let old_delta = removed.map(|old| PxDelta {
            side: old_side,
            price: old.price,
            delta_qty: -old.qty.raw(),
            delta_n_orders: -1,
            flags: 0,
        });

        let old_delta = match old_delta {
            Some(d) => d,
            None => PxDelta {
                side: old_side,
                price: new.price,
                delta_qty: 0,
                delta_n_orders: 0,
                flags: 0,
            },
        };

        if new.qty == Value::ZERO || new.qty.is_null() {
            return OrderDelta::Pair(old_delta, None);
        }

        let side = new.side;
        let price = new.price;
        let qty = new.qty;
        self.side_mut(side).add_order(t, new);
        OrderDelta::Pair(
            old_delta,
            Some(PxDelta {
                side,
                price,
                delta_qty: qty.raw(),
                delta_n_orders: 1,
                flags: 0,
            }),
        )
    }

    pub fn reduce_order(&mut self, id: &str, t: DateTime, side: Side, reduce_qty: Value) -> Result<PxDelta, MdError> {
        let book_side = self.side_mut(side);
        let price = book_side
            .find_order(id)
            .map(|o| o.price)
            .ok_or_else(|| MdError::OrderNotFound { order_id: id.into() })?;
        let level = book_side
            .level_mut(price)
            .ok_or_else(|| MdError::NoPxLevel { order_id: id.into() })?;
        let order = level.order_mut(id).ok_or_else(|| MdError::OrderNotFound { order_id: id.into() })?;
        let old_qty = order.qty.raw();
        let new_qty = old_qty.saturating_sub(reduce_qty.raw());
        let reduced = old_qty - new_qty;

        if new_qty == 0 {
            level.remove_order(t, id);
            book_side.remove_level_if_empty(price);
        } else {
            order.qty = Value::new(new_qty);
            level.qty = Value::new(level.qty.raw() - reduced);
            level.transact_time = t;
        }

        Ok(PxDelta {
            side,
            price,
            delta_qty: -reduced,
            delta_n_orders: if new_qty == 0 { -1 } else { 0 },
            flags: 0,
        })
    }

    pub fn cancel_order(&mut self, id: &str, t: DateTime, side: Side) -> Result<PxDelta, MdError> {
        let book_side = self.side_mut(side);
        let removed = book_side
            .remove_order(t, id)
            .ok_or_else(|| MdError::OrderNotFound { order_id: id.into() })?;
        book_side.remove_level_if_empty(removed.price);
        Ok(PxDelta {
            side,
            price: removed.price,
            delta_qty: -removed.qty.raw(),
            delta_n_orders: -1,
            flags: 0,
        })
    }

    // --- Reset / NDP migration -----------------------------------------

    /// Tears down both sides (invoking `on_order` per detached order) and
    /// clears the L1 bid/ask, returning whether that counts as an L2
    /// change worth broadcasting (it was non-empty before the reset).
    pub fn reset<F: FnMut(&Order)>(&mut self, t: DateTime, mut on_order: F) -> bool {
        let had_bid = self.l1.bid.is_value();
        let had_ask = self.l1.ask.is_value();
        self.bids.reset(t, &mut on_order);
        self.asks.reset(t, &mut on_order);
        self.l1.bid = Value::NULL;
        self.l1.bid_qty = Value::NULL;
        self.l1.ask = Value::NULL;
        self.l1.ask_qty = Value::NULL;
        had_bid || had_ask
    }

    /// Rescales L1, every level, and every order on both sides from the
    /// book's current NDPs to the new ones, invoking `on_order` per order
    /// so the application can mirror the change.
    pub fn update_ndp(
        &mut self,
        new_px_ndp: Ndp,
        new_qty_ndp: Ndp,
        mut on_order: impl FnMut(&Order),
    ) -> Result<(), MdError> {
        let old_px = self.px_ndp;
        let old_qty = self.qty_ndp;
        if old_px == new_px_ndp && old_qty == new_qty_ndp {
            return Ok(());
        }

        self.l1.bid = self.l1.bid.rescale(old_px, new_px_ndp)?;
        self.l1.ask = self.l1.ask.rescale(old_px, new_px_ndp)?;
        self.l1.last = self.l1.last.rescale(old_px, new_px_ndp)?;
        self.l1.high = self.l1.high.rescale(old_px, new_px_ndp)?;
        self.l1.low = self.l1.low.rescale(old_px, new_px_ndp)?;
        self.l1.open = self.l1.open.rescale(old_px, new_px_ndp)?;
        self.l1.close = self.l1.close.rescale(old_px, new_px_ndp)?;
        self.l1.bid_qty = self.l1.bid_qty.rescale(old_qty, new_qty_ndp)?;
        self.l1.ask_qty = self.l1.ask_qty.rescale(old_qty, new_qty_ndp)?;
        self.l1.last_qty = self.l1.last_qty.rescale(old_qty, new_qty_ndp)?;
        self.l1.volume = self.l1.volume.rescale(old_qty, new_qty_ndp)?;

        for side in [&mut self.bids, &mut self.asks] {
            let levels = side.take_levels();
            for mut level in levels {
                level.price = level.price.rescale(old_px, new_px_ndp)?;
                level.qty = level.qty.rescale(old_qty, new_qty_ndp)?;
                for order in &mut level.orders {
                    order.price = order.price.rescale(old_px, new_px_ndp)?;
                    order.qty = order.qty.rescale(old_qty, new_qty_ndp)?;
                    on_order(order);
                }
                side.insert_level(level);
            }
        }

        self.px_ndp = new_px_ndp;
        self.qty_ndp = new_qty_ndp;
        Ok(())
    }

    // --- Out-chain -------------------------------------------------------

    pub fn register_out(&mut self, out_key: InstrumentKey) {
        if !self.out.contains(&out_key) {
            self.out.push(out_key);
        }
    }

    /// Inserts `in_key` into this book's `in` list at `in_rank`, splicing
    /// out any prior membership first, and keeps the list sorted ascending.
    pub fn insert_in(&mut self, in_key: InstrumentKey, in_rank: i32) {
        self.in_.retain(|(k, _)| *k != in_key);
        let pos = self.in_.iter().position(|(_, r)| *r > in_rank).unwrap_or(self.in_.len());
        self.in_.insert(pos, (in_key, in_rank));
    }

    // --- Matching (best-effort) -----------------------------------------

    /// Walks the opposite side in best-price order, filling against resting
    /// orders. `fill_fn(leaves, cum, px, fill_qty, contra)` may return
    /// `false` to halt early; `leave_fn(leaves, cum)` fires once at the end.
    /// A `null` `px` applies no limit.
    pub fn match_(
        &mut self,
        side: Side,
        px: Value,
        qty: Value,
        mut fill_fn: impl FnMut(Value, Value, Value, Value, &Order) -> bool,
        mut leave_fn: impl FnMut(Value, Value),
    ) {
        let contra_side = side.opposite();
        let prices: Vec<Value> = self.side(contra_side).best_to_worst().map(|l| l.price).collect();

        let mut leaves = qty.raw();
        let mut cum: i64 = 0;

        'levels: for price in prices {
            if px.is_value() {
                let through = match side {
                    Side::Buy => price.raw() > px.raw(),
                    Side::Sell => price.raw() < px.raw(),
                };
                if through {
                    break;
                }
            }
            loop {
                if leaves <= 0 {
                    break 'levels;
                }
                let contra_id = match self.side(contra_side).level(price) {
                    Some(level) if !level.orders.is_empty() => level.orders[0].id.clone(),
                    _ => break,
                };
                let contra = self.side(contra_side).find_order(&contra_id).cloned().unwrap();
                let fill_qty = leaves.min(contra.qty.raw());
                cum += fill_qty;
                leaves -= fill_qty;

                if fill_qty == contra.qty.raw() {
                    self.side_mut(contra_side).remove_order(&contra_id);
                } else {
                    let level = self.side_mut(contra_side).level_mut(price).unwrap();
                    let order = level.order_mut(&contra_id).unwrap();
                    order.qty = Value::new(order.qty.raw() - fill_qty);
                    level.qty = Value::new(level.qty.raw() - fill_qty);
                }
                self.side_mut(contra_side).remove_level_if_empty(price);

                let keep_going = fill_fn(
                    Value::new(leaves),
                    Value::new(cum),
                    price,
                    Value::new(fill_qty),
                    &contra,
                );
                if !keep_going {
                    break 'levels;
                }
            }
        }

        leave_fn(Value::new(leaves), Value::new(cum));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InstrumentId, SegmentId, VenueId};

    fn key() -> InstrumentKey {
        InstrumentKey::new(VenueId::new("XTKS"), SegmentId::new("0"), InstrumentId::new("SYM1"))
    }

    fn book() -> OrderBook {
        OrderBook::new(key(), Ndp::new(2).unwrap(), Ndp::new(0).unwrap())
    }

    fn v(n: i64) -> Value {
        Value::new(n)
    }

    fn t(sec: u32) -> DateTime {
        DateTime::new(1, sec, 0)
    }

    #[test]
    fn add_order_then_add_same_id_is_modify() {
        let mut ob = book();
        ob.add_order(t(1), Order::new("o1", Side::Buy, v(100), v(10), 0));
        let delta = ob.add_order(t(2), Order::new("o1", Side::Buy, v(105), v(20), 0));
        match delta {
            OrderDelta::Pair(old, Some(new)) => {
                assert_eq!(old.delta_qty, -10);
                assert_eq!(new.delta_qty, 20);
            }
            _ => panic!("expected modify semantics"),
        }
        assert_eq!(ob.bids.find_order("o1").unwrap().price, v(105));
    }

    #[test]
    fn modify_order_to_zero_qty_evicts() {
        let mut ob = book();
        ob.add_order(t(1), Order::new("o1", Side::Buy, v(100), v(10), 0));
        let delta = ob.modify_order(t(2), Order::new("o1", Side::Buy, v(100), v(0), 0));
        match delta {
            OrderDelta::Pair(_, None) => {}
            _ => panic!("expected eviction"),
        }
        assert!(ob.bids.find_order("o1").is_none());
    }

    #[test]
    fn reduce_order_saturates_and_evicts_at_zero() {
        let mut ob = book();
        ob.add_order(t(1), Order::new("o1", Side::Buy, v(100), v(10), 0));
        let delta = ob.reduce_order("o1", t(2), Side::Buy, v(50)).unwrap();
        assert_eq!(delta.delta_qty, -10);
        assert!(ob.bids.find_order("o1").is_none());
    }

    #[test]
    fn cancel_order_missing_is_error() {
        let mut ob = book();
        assert!(ob.cancel_order("ghost", t(1), Side::Buy).is_err());
    }

    #[test]
    fn derive_l2_suppressed_for_dark_books() {
        let mut ob = book();
        ob.dark = true;
        ob.add_order(t(1), Order::new("o1", Side::Buy, v(100), v(10), 0));
        assert!(ob.derive_l2().is_none());
    }

    #[test]
    fn derive_l2_reports_best_bid_change() {
        let mut ob = book();
        ob.add_order(t(1), Order::new("o1", Side::Buy, v(100), v(10), 0));
        let delta = ob.derive_l2().unwrap();
        assert_eq!(delta.bid, v(100));
        assert_eq!(delta.bid_qty, v(10));
    }

    #[test]
    fn reset_clears_both_sides_and_l1() {
        let mut ob = book();
        ob.add_order(t(1), Order::new("o1", Side::Buy, v(100), v(10), 0));
        ob.derive_l2();
        let mut seen = Vec::new();
        let changed = ob.reset(t(2), |o| seen.push(o.id.clone()));
        assert!(changed);
        assert_eq!(seen, vec!["o1".to_string()]);
        assert!(ob.l1.bid.is_null());
        assert!(ob.bids.is_empty());
    }

    #[test]
    fn update_ndp_rescales_levels_and_orders() {
        let mut ob = book();
        ob.add_order(t(1), Order::new("o1", Side::Buy, v(100), v(10), 0));
        let mut touched = Vec::new();
        ob.update_ndp(Ndp::new(4).unwrap(), Ndp::new(0).unwrap(), |o| {
            touched.push(o.id.clone())
        })
        .unwrap();
        assert_eq!(touched, vec!["o1".to_string()]);
        assert_eq!(ob.bids.find_order("o1").unwrap().price, v(10000));
    }

    #[test]
    fn match_fills_fifo_against_best_price() {
        let mut ob = book();
        ob.add_order(t(1), Order::new("s1", Side::Sell, v(100), v(5), 0));
        ob.add_order(t(1), Order::new("s2", Side::Sell, v(100), v(5), 0));
        ob.add_order(t(1), Order::new("s3", Side::Sell, v(101), v(5), 0));

        let mut fills = Vec::new();
        ob.match_(
            Side::Buy,
            Value::NULL,
            v(7),
            |leaves, cum, px, fill_qty, contra| {
                fills.push((contra.id.clone(), fill_qty.raw()));
                assert!(leaves.raw() >= 0);
                assert!(cum.raw() > 0);
                assert_eq!(px, v(100));
                true
            },
            |leaves, cum| {
                assert_eq!(leaves, v(0));
                assert_eq!(cum, v(7));
            },
        );
        assert_eq!(fills, vec![("s1".to_string(), 5), ("s2".to_string(), 2)]);
        assert_eq!(ob.asks.find_order("s2").unwrap().qty, v(3));
    }

    #[test]
    fn match_respects_limit_price() {
        let mut ob = book();
        ob.add_order(t(1), Order::new("s1", Side::Sell, v(100), v(5), 0));
        ob.add_order(t(1), Order::new("s2", Side::Sell, v(105), v(5), 0));

        let mut cum_seen = v(0);
        ob.match_(
            Side::Buy,
            v(100),
            v(10),
            |_, cum, _, _, _| {
                cum_seen = cum;
                true
            },
            |_, _| {},
        );
        assert_eq!(cum_seen, v(5));
        assert!(ob.asks.find_order("s2").is_some());
    }
}
