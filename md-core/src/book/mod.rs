//! Order book state: per-order/per-level storage, L1 derivation, and
//! multi-leg combinations. Owned exclusively by `Instrument` — nothing
//! outside this module's owner holds a mutable path into a book.

pub mod combination;
pub mod l1;
pub mod order;
pub mod order_book;
pub mod px_level;
pub mod side;

pub use combination::{Combination, Leg};
pub use l1::{L1Data, L1Update, TickDir};
pub use order::Order;
pub use order_book::{L1Delta, OrderBook, OrderDelta, PxDelta};
pub use px_level::PxLevel;
pub use side::OBSide;
