//! A single price point: a time-ordered FIFO queue of resting orders plus a
//! cached aggregate size.

use crate::ids::OrderId;
use crate::order::{Order, Side};
use crate::price::Price;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// One price point on one side of a [`crate::book::Book`].
///
/// `aggregate_size` is cached in an atomic so a concurrent
/// [`crate::book::Book::snapshot`] call can read it without taking the
/// queue's mutex — the mutex only guards the FIFO ordering itself, which
/// snapshot reads never need.
pub struct PriceLevel {
    price: Price,
    side: Side,
    aggregate_size: AtomicU64,
    orders: Mutex<VecDeque<Order>>,
}

impl PriceLevel {
    /// Creates an empty price level. Price levels are created on first
    /// insert and destroyed once their FIFO empties (§3).
    pub fn new(price: Price, side: Side) -> Self {
        PriceLevel {
            price,
            side,
            aggregate_size: AtomicU64::new(0),
            orders: Mutex::new(VecDeque::new()),
        }
    }

    /// The price this level sits at.
    pub fn price(&self) -> Price {
        self.price
    }

    /// The side this level belongs to.
    pub fn side(&self) -> Side {
        self.side
    }

    /// The cached sum of resident order sizes.
    pub fn aggregate_size(&self) -> u64 {
        self.aggregate_size.load(Ordering::Acquire)
    }

    /// `true` once the FIFO has drained; the level should then be erased
    /// from its [`crate::side_index::SideIndex`].
    pub fn is_empty(&self) -> bool {
        self.orders.lock().unwrap().is_empty()
    }

    /// Appends an order to the back of the FIFO, preserving time priority.
    pub fn push_back(&self, order: Order) {
        self.aggregate_size.fetch_add(order.size, Ordering::AcqRel);
        self.orders.lock().unwrap().push_back(order);
    }

    /// Clones the order at the head of the FIFO (the next to match), if any.
    pub fn peek_front(&self) -> Option<Order> {
        self.orders.lock().unwrap().front().cloned()
    }

    /// Decrements the size of the head order by `qty` and, if it is now
    /// empty, pops and returns the now-filled order's id. `qty` must not
    /// exceed the head order's current size.
    pub fn fill_front(&self, qty: u64) -> Option<OrderId> {
        let mut orders = self.orders.lock().unwrap();
        let front = orders.front_mut().expect("fill_front on empty level");
        debug_assert!(qty <= front.size, "fill exceeds resting order size");
        front.size -= qty;
        self.aggregate_size.fetch_sub(qty, Ordering::AcqRel);
        if front.size == 0 {
            let filled = orders.pop_front().unwrap();
            trace!(order_id = %filled.id, price = %self.price, "order fully filled, leaving level");
            Some(filled.id)
        } else {
            None
        }
    }

    /// Removes an arbitrary order from the FIFO by id (cancel path).
    /// Returns the removed order, or `None` if not present at this level.
    pub fn remove(&self, order_id: OrderId) -> Option<Order> {
        let mut orders = self.orders.lock().unwrap();
        let index = orders.iter().position(|o| o.id == order_id)?;
        let removed = orders.remove(index).unwrap();
        self.aggregate_size.fetch_sub(removed.size, Ordering::AcqRel);
        Some(removed)
    }
}
