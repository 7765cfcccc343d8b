//! Price-time priority matching: limit, market, and cancel command
//! execution against one symbol's [`Book`].
//!
//! Grounded in `MatchEngine.py`'s `acceptLimitOrder` / `acceptMarketOrder`.
//! Two Open Questions from §9 are resolved here (and logged in DESIGN.md):
//!
//! - Self-trade prevention: on detecting `maker.participant_id == taker.participant_id`,
//!   matching stops (`break`) rather than skipping past the maker. A resting
//!   limit taker keeps whatever quantity it had left and rests at its limit
//!   price; a market taker discards its remainder instead of resting it,
//!   since market orders never rest (§3).
//! - Balance-shortfall mid-match: when the buyer cannot afford even one unit
//!   of the next fill, matching stops. If the buyer is the resting order
//!   (the taker is selling into a bid it can't afford), that resting bid is
//!   cancelled outright. If the buyer is the aggressor, the resting book is
//!   left untouched and the aggressor simply stops matching (resting its
//!   remainder if it is a limit order, discarding it if market).
//!
//! The affordability check and the settlement write for one fill happen
//! under a single acquisition of the registry lock
//! ([`crate::registry::ParticipantRegistry::fill_trade`]) rather than as two
//! separate registry calls, so a concurrent trade on another symbol's
//! worker touching the same participant can never land between this fill's
//! read and its write (§5).

use crate::book::Book;
use crate::ids::{OrderId, ParticipantId};
use crate::order::{Order, Side};
use crate::price::Price;
use crate::registry::ParticipantRegistry;
use tracing::{debug, trace};

/// Drives matching for one symbol. Stateless except for the `Book` and
/// `ParticipantRegistry` references it borrows per call — the engine itself
/// holds nothing between commands, so a symbol's single worker thread can
/// simply call these functions in a loop (§4.5).
pub struct MatchEngine<'a> {
    book: &'a Book,
    registry: &'a ParticipantRegistry,
}

impl<'a> MatchEngine<'a> {
    /// Borrows the book and registry this engine will operate against.
    pub fn new(book: &'a Book, registry: &'a ParticipantRegistry) -> Self {
        MatchEngine { book, registry }
    }

    /// Executes a limit order: matches against the opposite side while
    /// prices cross, then rests any remainder (§4.3.1).
    pub fn match_limit(
        &self,
        order_id: OrderId,
        participant_id: ParticipantId,
        side: Side,
        price: Price,
        size: u64,
        timestamp: u64,
    ) {
        // Out-of-range prices are rejected, and logged, exclusively at
        // `Book::add` (§4.2, §7) — the one point where such an order would
        // actually be dropped. A limit order priced outside the configured
        // range that fully crosses existing liquidity before ever resting
        // never reaches `add`, so no warning should fire for it.
        let opposite = side.opposite();
        let mut remaining = size;

        while remaining > 0 {
            let Some(best) = self.book.best_price(opposite) else {
                break;
            };
            let crosses = match side {
                Side::Buy => price >= best,
                Side::Sell => price <= best,
            };
            if !crosses {
                break;
            }

            let Some(level) = self.book.best_level(opposite) else {
                break;
            };
            let Some(maker) = level.peek_front() else {
                break;
            };

            if maker.participant_id == participant_id {
                debug!(order_id = %order_id, maker_order_id = %maker.id, "self-trade detected, resting taker remainder");
                break;
            }

            let requested = remaining.min(maker.size);
            let filled = self.try_fill(side, best, requested, order_id, &participant_id, &maker);
            if filled == 0 {
                break;
            }
            remaining -= filled;
            // If the fill was capped below both orders' available size, the
            // buyer's balance is exhausted; the next iteration's affordable
            // quantity will be 0 and the loop breaks there.
        }

        if remaining > 0 {
            let order = Order {
                id: order_id,
                symbol: self.book.symbol().clone(),
                participant_id,
                side,
                price,
                size: remaining,
                timestamp,
            };
            if self.book.add(order).is_ok() {
                trace!(order_id = %order_id, remaining, "limit order rested");
            }
        }
    }

    /// Executes a market order: matches against the opposite side until
    /// filled or the book is exhausted, then discards any remainder rather
    /// than resting it (§3: market orders never rest).
    pub fn match_market(&self, order_id: OrderId, participant_id: ParticipantId, side: Side, size: u64) {
        let opposite = side.opposite();
        let mut remaining = size;

        while remaining > 0 {
            let Some(best) = self.book.best_price(opposite) else {
                break;
            };
            let Some(level) = self.book.best_level(opposite) else {
                break;
            };
            let Some(maker) = level.peek_front() else {
                break;
            };

            if maker.participant_id == participant_id {
                debug!(order_id = %order_id, maker_order_id = %maker.id, "self-trade detected, discarding market remainder");
                break;
            }

            let requested = remaining.min(maker.size);
            let filled = self.try_fill(side, best, requested, order_id, &participant_id, &maker);
            if filled == 0 {
                break;
            }
            remaining -= filled;
        }

        if remaining > 0 {
            trace!(order_id = %order_id, remaining, "market order remainder discarded unfilled");
        }
    }

    /// Cancels a resting order. Idempotent: a missing or already-filled
    /// order id is a silent no-op (§4.3.3).
    pub fn cancel(&self, order_id: OrderId) {
        match self.book.remove(order_id) {
            Some(_) => trace!(order_id = %order_id, "order cancelled"),
            None => trace!(order_id = %order_id, "cancel of unknown or already-resolved order ignored"),
        }
    }

    /// Attempts one fill against `maker` for up to `requested` units at
    /// `price`. The affordability check and the settlement are performed by
    /// a single [`ParticipantRegistry::fill_trade`] call, which holds the
    /// registry lock across both (§5) — this applies regardless of which
    /// side is the taker: a sell aggressor crossing into a resting bid its
    /// owner can no longer afford is exactly §4.3.1 step 7's "buyer is the
    /// resting order" case, so the check cannot be skipped just because the
    /// incoming order is a sell.
    ///
    /// Returns the quantity actually filled (possibly less than `requested`
    /// if the buyer could not afford all of it). A return of zero means no
    /// settlement occurred: if the buyer was the resting order, its bid has
    /// already been cancelled as a side effect here; otherwise the book is
    /// untouched and the caller should stop matching.
    fn try_fill(
        &self,
        taker_side: Side,
        price: Price,
        requested: u64,
        taker_order_id: OrderId,
        taker_participant_id: &ParticipantId,
        maker: &Order,
    ) -> u64 {
        let (buyer_id, seller_id) = match taker_side {
            Side::Buy => (taker_participant_id, &maker.participant_id),
            Side::Sell => (&maker.participant_id, taker_participant_id),
        };
        let (buyer_order_id, seller_order_id) = match taker_side {
            Side::Buy => (taker_order_id, maker.id),
            Side::Sell => (maker.id, taker_order_id),
        };

        let filled = self.registry.fill_trade(
            self.book.symbol(),
            price,
            requested,
            buyer_id,
            buyer_order_id,
            seller_id,
            seller_order_id,
        );

        if filled == 0 {
            // §4.3.1 step 7: when the buyer is the resting order (the taker
            // is a sell crossing a bid it can't afford even partially),
            // that resting bid is cancelled outright. When the buyer is the
            // aggressor, matching simply terminates.
            if taker_side == Side::Sell {
                self.book.remove(maker.id);
                debug!(order_id = %taker_order_id, maker_order_id = %maker.id, "resting bid cancelled, buyer cannot afford any quantity");
            } else {
                debug!(order_id = %taker_order_id, "buyer cannot afford any quantity at resting price");
            }
            return 0;
        }

        self.book.fill_best(taker_side.opposite(), price, filled);
        debug!(price = %price, qty = filled, buyer = %buyer_id, seller = %seller_id, "fill applied");
        filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Symbol;
    use crate::registry::RegistryConfig;

    fn setup() -> (Book, ParticipantRegistry, Symbol) {
        let symbol = Symbol::new("X");
        (Book::new(symbol.clone(), BookConfig::default()), ParticipantRegistry::new(RegistryConfig::default()), symbol)
    }

    use crate::book::BookConfig;

    /// S1 — single cross: a resting bid is partially hit by an incoming ask
    /// at the resting (maker) price.
    #[test]
    fn single_cross_trades_at_the_resting_price() {
        let (book, registry, symbol) = setup();
        let a = ParticipantId::new("A");
        let b = ParticipantId::new("B");
        registry.ensure(&a);
        registry.ensure(&b);
        let engine = MatchEngine::new(&book, &registry);

        engine.match_limit(OrderId::new(), a.clone(), Side::Buy, Price::from_decimal(10.0), 100, 0);
        let snapshot = book.snapshot(10);
        assert_eq!(snapshot.bids, vec![(Price::from_decimal(10.0), 100)]);

        engine.match_limit(OrderId::new(), b.clone(), Side::Sell, Price::from_decimal(9.5), 60, 1);

        // Fills happen at the resting (maker) price, $10.00, not the
        // crossing taker's $9.50 limit.
        let starting = RegistryConfig::default().starting_balance;
        let notional = Price::from_decimal(10.0).cents() as i64 * 60;
        assert_eq!(registry.balance(&a), starting - notional);
        assert_eq!(registry.position(&a, &symbol), 60);
        assert_eq!(registry.balance(&b), starting + notional);
        assert_eq!(registry.position(&b, &symbol), -60);

        let snapshot = book.snapshot(10);
        assert_eq!(snapshot.bids, vec![(Price::from_decimal(10.0), 40)]);
        assert_eq!(snapshot.asks, vec![]);
    }

    /// S2 — walk the book: a buy aggressor sweeps two ask levels in price order.
    #[test]
    fn aggressor_walks_multiple_price_levels_in_order() {
        let (book, registry, symbol) = setup();
        let c = ParticipantId::new("C");
        let d = ParticipantId::new("D");
        let e = ParticipantId::new("E");
        for p in [&c, &d, &e] {
            registry.ensure(p);
        }
        let engine = MatchEngine::new(&book, &registry);

        engine.match_limit(OrderId::new(), c.clone(), Side::Sell, Price::from_decimal(20.0), 10, 0);
        engine.match_limit(OrderId::new(), d.clone(), Side::Sell, Price::from_decimal(20.5), 10, 1);

        engine.match_limit(OrderId::new(), e.clone(), Side::Buy, Price::from_decimal(21.0), 15, 2);

        assert_eq!(registry.position(&e, &symbol), 15);
        let snapshot = book.snapshot(10);
        assert_eq!(snapshot.asks, vec![(Price::from_decimal(20.5), 5)]);
        assert_eq!(snapshot.bids, vec![]);
    }

    /// S3 — time priority: the earlier resting order at a price fills first.
    #[test]
    fn time_priority_fills_earlier_order_first() {
        let (book, registry, _symbol) = setup();
        let b1 = ParticipantId::new("B1");
        let b2 = ParticipantId::new("B2");
        let s = ParticipantId::new("S");
        for p in [&b1, &b2, &s] {
            registry.ensure(p);
        }
        let engine = MatchEngine::new(&book, &registry);

        let b1_order = OrderId::new();
        engine.match_limit(b1_order, b1.clone(), Side::Buy, Price::from_decimal(5.0), 10, 0);
        let b2_order = OrderId::new();
        engine.match_limit(b2_order, b2.clone(), Side::Buy, Price::from_decimal(5.0), 10, 1);

        engine.match_market(OrderId::new(), s.clone(), Side::Sell, 10);

        // B1 fully filled and gone; B2 untouched at its original size.
        assert_eq!(book.level_of(b2_order).unwrap().peek_front().unwrap().size, 10);
        assert!(book.level_of(b1_order).is_none());
    }

    /// S4 — insufficient balance on an aggressor buy: partial fill capped
    /// by `floor(balance / price)`.
    #[test]
    fn insufficient_balance_caps_aggressor_buy_to_affordable_quantity() {
        let (book, _registry, symbol) = setup();
        let f = ParticipantId::new("F");
        let seller = ParticipantId::new("seller");
        let registry = ParticipantRegistry::new(RegistryConfig { starting_balance: 50_00 });
        registry.ensure(&f);
        registry.ensure(&seller);
        let engine = MatchEngine::new(&book, &registry);

        engine.match_limit(OrderId::new(), seller.clone(), Side::Sell, Price::from_decimal(10.0), 100, 0);
        engine.match_market(OrderId::new(), f.clone(), Side::Buy, 100);

        assert_eq!(registry.balance(&f), 0);
        assert_eq!(registry.position(&f, &symbol), 5);
        let snapshot = book.snapshot(10);
        assert_eq!(snapshot.asks, vec![(Price::from_decimal(10.0), 95)]);
    }

    /// §4.3.1 step 7's other sub-case: the resting bid's owner can no
    /// longer afford it by the time a sell aggressor crosses into it, so
    /// the resting bid is cancelled outright rather than matched.
    #[test]
    fn unaffordable_resting_bid_is_cancelled_when_crossed() {
        let (book, _registry, symbol) = setup();
        let buyer = ParticipantId::new("buyer");
        let seller = ParticipantId::new("seller");
        let registry = ParticipantRegistry::new(RegistryConfig { starting_balance: 0 });
        registry.ensure(&buyer);
        registry.ensure(&seller);
        let engine = MatchEngine::new(&book, &registry);

        let bid_id = OrderId::new();
        engine.match_limit(bid_id, buyer.clone(), Side::Buy, Price::from_decimal(10.0), 10, 0);
        assert_eq!(book.best_price(Side::Buy), Some(Price::from_decimal(10.0)));

        engine.match_market(OrderId::new(), seller.clone(), Side::Sell, 10);

        // No affordability -> the resting bid is cancelled, no trade occurs.
        assert_eq!(book.best_price(Side::Buy), None);
        assert_eq!(registry.position(&buyer, &symbol), 0);
        assert_eq!(registry.position(&seller, &symbol), 0);
    }

    /// S5 — self-trade halt: matching against one's own resting order stops
    /// without a trade, and the aggressor's limit remainder rests.
    #[test]
    fn self_trade_halts_matching_and_rests_limit_remainder() {
        let (book, registry, symbol) = setup();
        let g = ParticipantId::new("G");
        registry.ensure(&g);
        let engine = MatchEngine::new(&book, &registry);

        engine.match_limit(OrderId::new(), g.clone(), Side::Sell, Price::from_decimal(9.0), 10, 0);
        engine.match_limit(OrderId::new(), g.clone(), Side::Buy, Price::from_decimal(9.0), 5, 1);

        assert_eq!(registry.position(&g, &symbol), 0);
        let snapshot = book.snapshot(10);
        // Both rest because the crossed-artifact filter elides them from
        // the same snapshot read, matching §4.2's hardened read path — so
        // assert directly against the per-side best prices instead.
        assert_eq!(book.best_price(Side::Buy), Some(Price::from_decimal(9.0)));
        assert_eq!(book.best_price(Side::Sell), Some(Price::from_decimal(9.0)));
        assert_eq!(snapshot.bids, vec![]);
        assert_eq!(snapshot.asks, vec![]);
    }

    /// Market orders never rest: an unmatched remainder is discarded, not
    /// left resident in the book.
    #[test]
    fn market_order_remainder_is_discarded_not_rested() {
        let (book, registry, _symbol) = setup();
        let taker = ParticipantId::new("taker");
        registry.ensure(&taker);
        let engine = MatchEngine::new(&book, &registry);

        engine.match_market(OrderId::new(), taker, Side::Buy, 10);

        assert_eq!(book.best_price(Side::Buy), None);
        assert_eq!(book.best_price(Side::Sell), None);
    }

    /// S6 — idempotent cancel: cancelling an already-resolved id is a no-op.
    #[test]
    fn cancel_is_idempotent() {
        let (book, registry, _symbol) = setup();
        let a = ParticipantId::new("A");
        registry.ensure(&a);
        let engine = MatchEngine::new(&book, &registry);

        let id = OrderId::new();
        engine.match_limit(id, a, Side::Buy, Price::from_decimal(10.0), 10, 0);

        engine.cancel(id);
        assert_eq!(book.best_price(Side::Buy), None);
        // Second cancel of the same, now-gone id is a silent no-op.
        engine.cancel(id);
    }
}
