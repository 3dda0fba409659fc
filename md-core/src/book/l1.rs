//! Top-of-book (L1) aggregate state and its three-state merge from an
//! incoming L1 message, including `tickDir` recomputation.

use crate::core::{Ndp, NdpError, Value};

/// Direction of the last trade relative to the prior one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickDir {
    /// No prior `last` to compare against.
    #[default]
    Null,
    Up,
    Down,
    /// Traded again at the same price while the running direction was `Up`.
    LevelUp,
    /// Traded again at the same price while the running direction was `Down`.
    LevelDown,
}

/// An incoming L1 update. Every field uses the `Value` three-state
/// semantics (`null` = leave unchanged, `reset` = clear, else = assign),
/// and may be expressed at its own NDPs, rescaled to the book's before
/// merge.
#[derive(Debug, Clone, Copy)]
pub struct L1Update {
    pub bid: Value,
    pub bid_qty: Value,
    pub ask: Value,
    pub ask_qty: Value,
    pub last: Value,
    pub last_qty: Value,
    pub open: Value,
    pub close: Value,
    pub volume: Value,
    pub px_ndp: Option<Ndp>,
    pub qty_ndp: Option<Ndp>,
}

/// All fields default to `Value::NULL` ("leave unchanged"), not
/// `Value::ZERO` — `Value`'s own `Default` is `ZERO`, which would make
/// `..Default::default()` silently clear every untouched field on merge.
impl Default for L1Update {
    fn default() -> Self {
        Self {
            bid: Value::NULL,
            bid_qty: Value::NULL,
            ask: Value::NULL,
            ask_qty: Value::NULL,
            last: Value::NULL,
            last_qty: Value::NULL,
            open: Value::NULL,
            close: Value::NULL,
            volume: Value::NULL,
            px_ndp: None,
            qty_ndp: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct L1Data {
    pub bid: Value,
    pub bid_qty: Value,
    pub ask: Value,
    pub ask_qty: Value,
    pub last: Value,
    pub last_qty: Value,
    pub high: Value,
    pub low: Value,
    pub open: Value,
    pub close: Value,
    pub volume: Value,
    pub tick_dir: TickDir,
}

impl L1Data {
    pub fn new() -> Self {
        Self {
            bid: Value::NULL,
            bid_qty: Value::NULL,
            ask: Value::NULL,
            ask_qty: Value::NULL,
            last: Value::NULL,
            last_qty: Value::NULL,
            high: Value::NULL,
            low: Value::NULL,
            open: Value::NULL,
            close: Value::NULL,
            volume: Value::NULL,
            tick_dir: TickDir::Null,
        }
    }

    /// Merges `update` into this state, rescaling its price/qty fields to
    /// `(book_px_ndp, book_qty_ndp)` first if the update carries different
    /// NDPs. Recomputes `tick_dir` and ratchets `high`/`low` whenever `last`
    /// actually moves.
    pub fn merge(
        &mut self,
        update: L1Update,
        book_px_ndp: Ndp,
        book_qty_ndp: Ndp,
    ) -> Result<(), NdpError> {
        let px_ndp = update.px_ndp.unwrap_or(book_px_ndp);
        let qty_ndp = update.qty_ndp.unwrap_or(book_qty_ndp);

        let bid = update.bid.rescale(px_ndp, book_px_ndp)?;
        let ask = update.ask.rescale(px_ndp, book_px_ndp)?;
        let last = update.last.rescale(px_ndp, book_px_ndp)?;
        let open = update.open.rescale(px_ndp, book_px_ndp)?;
        let close = update.close.rescale(px_ndp, book_px_ndp)?;
        let bid_qty = update.bid_qty.rescale(qty_ndp, book_qty_ndp)?;
        let ask_qty = update.ask_qty.rescale(qty_ndp, book_qty_ndp)?;
        let last_qty = update.last_qty.rescale(qty_ndp, book_qty_ndp)?;
        let volume = update.volume.rescale(qty_ndp, book_qty_ndp)?;

        self.bid = self.bid.merge(bid);
        self.bid_qty = self.bid_qty.merge(bid_qty);
        self.ask = self.ask.merge(ask);
        self.ask_qty = self.ask_qty.merge(ask_qty);
        self.open = self.open.merge(open);
        self.close = self.close.merge(close);
        self.volume = self.volume.merge(volume);

        if last.is_value() {
            let old_last = self.last;
            self.last = last;
            self.last_qty = self.last_qty.merge(last_qty);
            self.tick_dir = if !old_last.is_value() {
                TickDir::Null
            } else if last.raw() > old_last.raw() {
                TickDir::Up
            } else if last.raw() < old_last.raw() {
                TickDir::Down
            } else {
                match self.tick_dir {
                    TickDir::Up | TickDir::LevelUp => TickDir::LevelUp,
                    TickDir::Down | TickDir::LevelDown => TickDir::LevelDown,
                    TickDir::Null => TickDir::Null,
                }
            };
            self.high = if self.high.is_value() {
                Value::new(self.high.raw().max(last.raw()))
            } else {
                last
            };
            self.low = if self.low.is_value() {
                Value::new(self.low.raw().min(last.raw()))
            } else {
                last
            };
        } else if last.is_reset() {
            self.last = Value::NULL;
            self.last_qty = Value::NULL;
        }

        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ndp(n: u8) -> Ndp {
        Ndp::new(n).unwrap()
    }

    #[test]
    fn merge_leaves_null_fields_unchanged() {
        let mut l1 = L1Data::new();
        l1.bid = Value::new(100);
        let update = L1Update::default();
        l1.merge(update, ndp(2), ndp(0)).unwrap();
        assert_eq!(l1.bid, Value::new(100));
    }

    #[test]
    fn tick_dir_null_on_first_trade_then_up_then_level_up() {
        let mut l1 = L1Data::new();
        assert_eq!(l1.tick_dir, TickDir::Null);
        l1.merge(
            L1Update {
                last: Value::new(10000),
                ..Default::default()
            },
            ndp(2),
            ndp(0),
        )
        .unwrap();
        assert_eq!(l1.tick_dir, TickDir::Null);
        l1.merge(
            L1Update {
                last: Value::new(10100),
                ..Default::default()
            },
            ndp(2),
            ndp(0),
        )
        .unwrap();
        assert_eq!(l1.tick_dir, TickDir::Up);
        l1.merge(
            L1Update {
                last: Value::new(10100),
                ..Default::default()
            },
            ndp(2),
            ndp(0),
        )
        .unwrap();
        assert_eq!(l1.tick_dir, TickDir::LevelUp);
    }

    #[test]
    fn high_low_ratchet_from_last() {
        let mut l1 = L1Data::new();
        l1.merge(L1Update { last: Value::new(100), ..Default::default() }, ndp(2), ndp(0)).unwrap();
        l1.merge(L1Update { last: Value::new(110), ..Default::default() }, ndp(2), ndp(0)).unwrap();
        l1.merge(L1Update { last: Value::new(90), ..Default::default() }, ndp(2), ndp(0)).unwrap();
        assert_eq!(l1.high, Value::new(110));
        assert_eq!(l1.low, Value::new(90));
    }

    #[test]
    fn rescales_incoming_ndp_before_merge() {
        let mut l1 = L1Data::new();
        l1.merge(
            L1Update {
                bid: Value::new(10000),
                px_ndp: Some(ndp(4)),
                ..Default::default()
            },
            ndp(2),
            ndp(0),
        )
        .unwrap();
        assert_eq!(l1.bid, Value::new(100));
    }
}
