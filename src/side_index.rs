//! Ordered map `price -> PriceLevel` for one side of a book, with a cached
//! best-price cursor.
//!
//! Backed by [`crossbeam_skiplist::SkipMap`], matching the teacher's choice
//! of a concurrent ordered map (it uses the same structure for `OrderBook::bids`
//! / `::asks`) so snapshot reads never block the symbol's single writer.
//! §4.1 does not mandate this specific structure — any ordered container
//! with O(log n) insert/erase/min/max satisfies the contract.

use crate::level::PriceLevel;
use crate::order::Side;
use crate::price::Price;
use crossbeam::atomic::AtomicCell;
use crossbeam_skiplist::SkipMap;
use std::sync::Arc;
use tracing::trace;

/// One side (bids or asks) of a single symbol's book.
pub struct SideIndex {
    side: Side,
    levels: SkipMap<Price, Arc<PriceLevel>>,
    best: AtomicCell<Option<Price>>,
}

impl SideIndex {
    /// Creates an empty side index.
    pub fn new(side: Side) -> Self {
        SideIndex {
            side,
            levels: SkipMap::new(),
            best: AtomicCell::new(None),
        }
    }

    /// Returns the existing level at `price`, or creates and inserts a new
    /// one, updating `best` if this price becomes the new extremum.
    pub fn get_or_insert(&self, price: Price) -> Arc<PriceLevel> {
        let entry = self
            .levels
            .get_or_insert(price, Arc::new(PriceLevel::new(price, self.side)));
        self.refresh_best_with_candidate(price);
        entry.value().clone()
    }

    /// Looks up the level at `price` without creating one.
    pub fn get(&self, price: Price) -> Option<Arc<PriceLevel>> {
        self.levels.get(&price).map(|e| e.value().clone())
    }

    /// Erases the (expected-empty) level at `price` and refreshes `best` if
    /// it pointed at the erased level.
    pub fn erase(&self, price: Price) {
        self.levels.remove(&price);
        if self.best.load() == Some(price) {
            self.recompute_best();
        }
        trace!(side = %self.side, price = %price, "price level erased");
    }

    /// The best (most aggressive) price currently resting, if any.
    pub fn best(&self) -> Option<Price> {
        self.best.load()
    }

    /// The `PriceLevel` at the best price, if any.
    pub fn best_level(&self) -> Option<Arc<PriceLevel>> {
        self.best().and_then(|p| self.get(p))
    }

    /// `true` if this side has no resting levels.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Iterates price levels from best to worst: descending for bids,
    /// ascending for asks.
    pub fn iter_from_best(&self) -> Box<dyn DoubleEndedIterator<Item = (Price, Arc<PriceLevel>)> + '_> {
        let iter = self
            .levels
            .iter()
            .map(|e| (*e.key(), e.value().clone()));
        match self.side {
            Side::Buy => Box::new(iter.rev()),
            Side::Sell => Box::new(iter),
        }
    }

    fn refresh_best_with_candidate(&self, candidate: Price) {
        let better = match self.best.load() {
            None => true,
            Some(current) => match self.side {
                Side::Buy => candidate > current,
                Side::Sell => candidate < current,
            },
        };
        if better {
            self.best.store(Some(candidate));
        }
    }

    fn recompute_best(&self) {
        let extremum = match self.side {
            Side::Buy => self.levels.iter().next_back().map(|e| *e.key()),
            Side::Sell => self.levels.iter().next().map(|e| *e.key()),
        };
        self.best.store(extremum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_bid_is_the_maximum_price() {
        let side = SideIndex::new(Side::Buy);
        side.get_or_insert(Price::from_cents(1000));
        side.get_or_insert(Price::from_cents(1500));
        side.get_or_insert(Price::from_cents(1200));

        assert_eq!(side.best(), Some(Price::from_cents(1500)));
    }

    #[test]
    fn best_ask_is_the_minimum_price() {
        let side = SideIndex::new(Side::Sell);
        side.get_or_insert(Price::from_cents(2000));
        side.get_or_insert(Price::from_cents(1500));
        side.get_or_insert(Price::from_cents(1800));

        assert_eq!(side.best(), Some(Price::from_cents(1500)));
    }

    #[test]
    fn get_or_insert_reuses_existing_level() {
        let side = SideIndex::new(Side::Buy);
        let first = side.get_or_insert(Price::from_cents(1000));
        let second = side.get_or_insert(Price::from_cents(1000));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn erase_refreshes_best_to_next_extremum() {
        let side = SideIndex::new(Side::Buy);
        side.get_or_insert(Price::from_cents(1000));
        side.get_or_insert(Price::from_cents(1500));
        assert_eq!(side.best(), Some(Price::from_cents(1500)));

        side.erase(Price::from_cents(1500));
        assert_eq!(side.best(), Some(Price::from_cents(1000)));

        side.erase(Price::from_cents(1000));
        assert_eq!(side.best(), None);
        assert!(side.is_empty());
    }

    #[test]
    fn erase_of_non_best_level_leaves_best_unchanged() {
        let side = SideIndex::new(Side::Buy);
        side.get_or_insert(Price::from_cents(1000));
        side.get_or_insert(Price::from_cents(1500));

        side.erase(Price::from_cents(1000));
        assert_eq!(side.best(), Some(Price::from_cents(1500)));
    }

    #[test]
    fn iter_from_best_orders_bids_descending_and_asks_ascending() {
        let bids = SideIndex::new(Side::Buy);
        bids.get_or_insert(Price::from_cents(1000));
        bids.get_or_insert(Price::from_cents(1500));
        bids.get_or_insert(Price::from_cents(1200));
        let bid_prices: Vec<Price> = bids.iter_from_best().map(|(p, _)| p).collect();
        assert_eq!(
            bid_prices,
            vec![Price::from_cents(1500), Price::from_cents(1200), Price::from_cents(1000)]
        );

        let asks = SideIndex::new(Side::Sell);
        asks.get_or_insert(Price::from_cents(1000));
        asks.get_or_insert(Price::from_cents(1500));
        asks.get_or_insert(Price::from_cents(1200));
        let ask_prices: Vec<Price> = asks.iter_from_best().map(|(p, _)| p).collect();
        assert_eq!(
            ask_prices,
            vec![Price::from_cents(1000), Price::from_cents(1200), Price::from_cents(1500)]
        );
    }
}
