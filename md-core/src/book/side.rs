//! One side (bid or ask) of an [`super::order_book::OrderBook`]: a
//! price-ordered map of [`PxLevel`]s plus an order-id index for O(1)
//! order-level lookups.

use std::collections::{BTreeMap, HashMap};

use crate::book::order::Order;
use crate::book::px_level::PxLevel;
use crate::core::{DateTime, Side, Value};

/// Levels are keyed by raw price magnitude in a `BTreeMap`, which is always
/// ascending; "best" therefore means the last entry on the bid side and the
/// first entry on the ask side.
#[derive(Debug, Clone)]
pub struct OBSide {
    pub side: Side,
    levels: BTreeMap<i64, PxLevel>,
    order_index: HashMap<String, i64>,
}

impl OBSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            order_index: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level(&self, price: Value) -> Option<&PxLevel> {
        self.levels.get(&price.raw())
    }

    pub fn level_mut(&mut self, price: Value) -> Option<&mut PxLevel> {
        self.levels.get_mut(&price.raw())
    }

    pub fn get_or_create_level(&mut self, price: Value) -> &mut PxLevel {
        self.levels.entry(price.raw()).or_insert_with(|| PxLevel::new(price))
    }

    pub fn remove_level_if_empty(&mut self, price: Value) {
        if self.levels.get(&price.raw()).is_some_and(PxLevel::is_empty) {
            self.levels.remove(&price.raw());
        }
    }

    /// Best (nearest-to-market) level: highest price for bids, lowest for
    /// asks.
    pub fn best(&self) -> Option<&PxLevel> {
        match self.side {
            Side::Buy => self.levels.values().next_back(),
            Side::Sell => self.levels.values().next(),
        }
    }

    /// Iterates levels from best to worst.
    pub fn best_to_worst(&self) -> Box<dyn DoubleEndedIterator<Item = &PxLevel> + '_> {
        match self.side {
            Side::Buy => Box::new(self.levels.values().rev()),
            Side::Sell => Box::new(self.levels.values()),
        }
    }

    pub fn find_order(&self, id: &str) -> Option<&Order> {
        let price = *self.order_index.get(id)?;
        self.levels.get(&price)?.orders.iter().find(|o| o.id == id)
    }

    pub fn add_order(&mut self, t: DateTime, order: Order) {
        let price = order.price;
        self.order_index.insert(order.id.clone(), price.raw());
        self.get_or_create_level(price).add_order(t, order);
    }

    /// Detaches and returns the order with `id`, pruning the level if it
    /// drained to empty.
    pub fn remove_order(&mut self, t: DateTime, id: &str) -> Option<Order> {
        let price = self.order_index.remove(id)?;
        let level = self.levels.get_mut(&price)?;
        let removed = level.remove_order(t, id);
        if level.is_empty() {
            self.levels.remove(&price);
        }
        removed
    }

    /// Tears down every level, invoking `f` per detached order, and clears
    /// the order-id index.
    pub fn reset<F: FnMut(&Order)>(&mut self, t: DateTime, mut f: F) {
        for (_, level) in self.levels.iter_mut() {
            level.reset(t, &mut f);
        }
        self.levels.clear();
        self.order_index.clear();
    }

    /// Drains every level out of this side (ascending price key order),
    /// clearing the order-id index. Used by NDP migration, which needs to
    /// rescale each level's price key before reinserting it.
    pub fn take_levels(&mut self) -> Vec<PxLevel> {
        self.order_index.clear();
        std::mem::take(&mut self.levels).into_values().collect()
    }

    /// Reinserts a level (keyed by its current `price`), rebuilding the
    /// order-id index entries for its resting orders.
    pub fn insert_level(&mut self, level: PxLevel) {
        for order in &level.orders {
            self.order_index.insert(order.id.clone(), level.price.raw());
        }
        self.levels.insert(level.price.raw(), level);
    }
}
