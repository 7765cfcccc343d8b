//! A single symbol's limit order book: two [`SideIndex`]es plus an order-id
//! index for O(1) cancel lookup.

use crate::ids::{OrderId, Symbol};
use crate::level::PriceLevel;
use crate::order::{Order, Side};
use crate::price::Price;
use crate::side_index::SideIndex;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Errors raised by book-level operations. Hand-rolled rather than via
/// `thiserror`, matching the teacher's `orderbook::error` module.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BookError {
    /// A limit price fell outside `[price_floor, price_cap]` (§4.2).
    PriceOutOfRange { price: Price, floor: Price, cap: Price },
}

impl fmt::Display for BookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookError::PriceOutOfRange { price, floor, cap } => write!(
                f,
                "price {price} outside allowed range [{floor}, {cap}]"
            ),
        }
    }
}

impl std::error::Error for BookError {}

/// Configuration for one symbol's book. Mirrors `limitOrderBook.py`'s
/// `price_floor` / `price_cap` constructor defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookConfig {
    /// Lowest acceptable limit price, inclusive.
    pub price_floor: Price,
    /// Highest acceptable limit price, inclusive.
    pub price_cap: Price,
}

impl Default for BookConfig {
    fn default() -> Self {
        BookConfig {
            price_floor: Price::from_cents(0),
            price_cap: Price::from_decimal(1000.0),
        }
    }
}

/// A point-in-time, read-only view of the book's resting depth, filtered to
/// remove crossed artifacts per §4.2's `get_order_book(depth)` semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSnapshot {
    pub symbol: Symbol,
    pub bids: Vec<(Price, u64)>,
    pub asks: Vec<(Price, u64)>,
}

impl BookSnapshot {
    /// The best (highest) resting bid price, if any.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|(p, _)| *p)
    }

    /// The best (lowest) resting ask price, if any.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|(p, _)| *p)
    }
}

/// A single symbol's order book: bid/ask price levels plus an id index for
/// O(1) cancel lookup. Exclusively owned by one [`crate::dispatcher::SymbolDispatcher`]
/// worker at a time (§4.5's single-writer rule); reads (`snapshot`,
/// `best_price`) may run concurrently with that writer since the underlying
/// maps are lock-free.
pub struct Book {
    symbol: Symbol,
    config: BookConfig,
    bids: SideIndex,
    asks: SideIndex,
    order_index: DashMap<OrderId, (Price, Side)>,
}

impl Book {
    /// Creates an empty book for `symbol` with the given range configuration.
    pub fn new(symbol: Symbol, config: BookConfig) -> Self {
        Book {
            symbol,
            config,
            bids: SideIndex::new(Side::Buy),
            asks: SideIndex::new(Side::Sell),
            order_index: DashMap::new(),
        }
    }

    /// The symbol this book belongs to.
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// This book's price-range configuration.
    pub fn config(&self) -> BookConfig {
        self.config
    }

    fn side_index(&self, side: Side) -> &SideIndex {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    /// Validates a limit price against `[price_floor, price_cap]` (§4.2).
    pub fn check_price_range(&self, price: Price) -> Result<(), BookError> {
        if price < self.config.price_floor || price > self.config.price_cap {
            return Err(BookError::PriceOutOfRange {
                price,
                floor: self.config.price_floor,
                cap: self.config.price_cap,
            });
        }
        Ok(())
    }

    /// Inserts a resting limit order, creating its price level if needed.
    /// Callers must have already validated the price range and matched away
    /// any crossing liquidity — `add` never matches, it only rests (§3, §4.3).
    pub fn add(&self, order: Order) -> Result<(), BookError> {
        if let Err(e) = self.check_price_range(order.price) {
            warn!(order_id = %order.id, symbol = %self.symbol, %e, "order dropped, price outside allowed range");
            return Err(e);
        }
        let side = order.side;
        let price = order.price;
        let level = self.side_index(side).get_or_insert(price);
        self.order_index.insert(order.id, (price, side));
        level.push_back(order.clone());
        trace!(order_id = %order.id, symbol = %self.symbol, side = %side, price = %price, size = order.size, "order added to book");
        Ok(())
    }

    /// Returns the `PriceLevel` containing `order_id`, if it is currently
    /// resting on this book.
    pub fn level_of(&self, order_id: OrderId) -> Option<Arc<PriceLevel>> {
        let (price, side) = *self.order_index.get(&order_id)?;
        self.side_index(side).get(price)
    }

    /// Removes and returns a resting order by id (the cancel path, §4.3.3).
    /// Idempotent: returns `Ok(None)` if the order is not (or no longer)
    /// resting, rather than erroring, matching `PerTickerOrderQueue`'s
    /// tolerant handling of late/duplicate cancels.
    pub fn remove(&self, order_id: OrderId) -> Option<Order> {
        let (price, side) = *self.order_index.get(&order_id)?;
        let level = self.side_index(side).get(price)?;
        let removed = level.remove(order_id);
        if removed.is_some() {
            self.order_index.remove(&order_id);
            if level.is_empty() {
                self.side_index(side).erase(price);
            }
        }
        removed
    }

    /// Fills `qty` off the head of `price`'s FIFO on `side`, evicting the
    /// level if it empties. Called by the matching engine once per fill;
    /// never by submission code directly.
    pub fn fill_best(&self, side: Side, price: Price, qty: u64) -> Option<OrderId> {
        let level = self.side_index(side).get(price)?;
        let filled_id = level.fill_front(qty);
        if let Some(id) = filled_id {
            self.order_index.remove(&id);
        }
        if level.is_empty() {
            self.side_index(side).erase(price);
            debug!(symbol = %self.symbol, side = %side, price = %price, "price level emptied");
        }
        filled_id
    }

    /// The best (most aggressive) resting price on `side`, if any.
    pub fn best_price(&self, side: Side) -> Option<Price> {
        self.side_index(side).best()
    }

    /// The best resting level on `side`, if any.
    pub fn best_level(&self, side: Side) -> Option<Arc<PriceLevel>> {
        self.side_index(side).best_level()
    }

    /// `true` once both a bid and an ask rest at prices that cross
    /// (`bid >= ask`) — transient mid-match, never a valid steady state
    /// (§8 invariant 3).
    pub fn is_crossed(&self) -> bool {
        match (self.best_price(Side::Buy), self.best_price(Side::Sell)) {
            (Some(bid), Some(ask)) => bid >= ask,
            _ => false,
        }
    }

    /// A read-only depth snapshot, filtered per `limitOrderBook.py`'s
    /// `get_order_book`: any bid level at or above the best ask (or ask level
    /// at or below the best bid) is a transient crossed artifact and is
    /// dropped rather than reported.
    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        let best_ask = self.best_price(Side::Sell);
        let best_bid = self.best_price(Side::Buy);

        let bids = self
            .bids
            .iter_from_best()
            .filter(|(price, _)| best_ask.is_none_or(|ask| *price < ask))
            .take(depth)
            .map(|(price, level)| (price, level.aggregate_size()))
            .collect();

        let asks = self
            .asks
            .iter_from_best()
            .filter(|(price, _)| best_bid.is_none_or(|bid| *price > bid))
            .take(depth)
            .map(|(price, level)| (price, level.aggregate_size()))
            .collect();

        BookSnapshot {
            symbol: self.symbol.clone(),
            bids,
            asks,
        }
    }
}
