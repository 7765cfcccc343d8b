//! Order records and submission commands.
//!
//! An [`Order`] models a resting limit order exactly as §3 describes it:
//! immutable identity fields plus a mutable remaining `size`. Market orders
//! and cancels never rest, so they are not representable as an `Order` —
//! they exist only transiently as [`Command`] variants consumed by the
//! matching engine.

use crate::ids::{OrderId, ParticipantId, Symbol};
use crate::price::Price;
use std::fmt;

/// Which side of the book an order or command belongs to.
///
/// Named `Buy`/`Sell` (matching the external interface and execution report
/// schema in §6) rather than `Bid`/`Ask` (the data-model vocabulary in §3);
/// the two pairs name the same two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Side {
    /// Bid side: resting buy orders, aggressive buy commands.
    Buy,
    /// Ask side: resting sell orders, aggressive sell commands.
    Sell,
}

impl Side {
    /// The other side of the book.
    pub const fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// A resting limit order, owned exclusively by a [`crate::level::PriceLevel`]'s
/// FIFO queue while it lives in the book (§3's ownership rule).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Order {
    /// Globally unique order identifier.
    pub id: OrderId,
    /// The symbol this order trades.
    pub symbol: Symbol,
    /// The participant that owns this order.
    pub participant_id: ParticipantId,
    /// Buy or sell.
    pub side: Side,
    /// Limit price. Resting orders are always limit orders (§3).
    pub price: Price,
    /// Remaining quantity. Zero only transiently, between a fill and removal.
    pub size: u64,
    /// Monotonic arrival tick, used for FIFO tie-breaking within a price level.
    pub timestamp: u64,
}

/// A command submitted to a [`crate::dispatcher::SymbolDispatcher`] and,
/// after dequeue, consumed by the [`crate::matching::MatchEngine`].
///
/// `Cancel` carries no price — per §4.5, commands without a price are
/// prepended ahead of pending limit commands in the per-symbol queue.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Command {
    /// Submit a new limit order.
    Limit {
        order_id: OrderId,
        symbol: Symbol,
        participant_id: ParticipantId,
        side: Side,
        price: Price,
        size: u64,
        /// Monotonic arrival tick assigned at submission time, used as the
        /// resting order's FIFO tie-breaker within its price level.
        timestamp: u64,
    },
    /// Submit a new market order.
    Market {
        order_id: OrderId,
        symbol: Symbol,
        participant_id: ParticipantId,
        side: Side,
        size: u64,
    },
    /// Cancel a resting order by id. Idempotent: cancelling an unknown or
    /// already-filled/cancelled id is a no-op (§4.3.3).
    Cancel {
        order_id: OrderId,
        symbol: Symbol,
        participant_id: ParticipantId,
    },
}

impl Command {
    /// The symbol this command targets — used by the dispatcher to route to
    /// the correct per-symbol queue.
    pub fn symbol(&self) -> &Symbol {
        match self {
            Command::Limit { symbol, .. } => symbol,
            Command::Market { symbol, .. } => symbol,
            Command::Cancel { symbol, .. } => symbol,
        }
    }

    /// `true` for limit commands, which carry a price. Per §4.5, only priced
    /// commands go to the back of the queue; market and cancel commands jump
    /// the line.
    pub fn is_priced(&self) -> bool {
        matches!(self, Command::Limit { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price::Price;

    #[test]
    fn order_round_trips_through_json() {
        let order = Order {
            id: OrderId::new(),
            symbol: Symbol::new("X"),
            participant_id: ParticipantId::new("A"),
            side: Side::Buy,
            price: Price::from_decimal(10.0),
            size: 5,
            timestamp: 3,
        };

        let json = serde_json::to_string(&order).unwrap();
        let deserialized: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, deserialized);
    }

    #[test]
    fn command_round_trips_through_json() {
        let cancel = Command::Cancel {
            order_id: OrderId::new(),
            symbol: Symbol::new("X"),
            participant_id: ParticipantId::new("A"),
        };

        let json = serde_json::to_string(&cancel).unwrap();
        let deserialized: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(cancel, deserialized);
    }

    #[test]
    fn opposite_is_its_own_inverse() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn is_priced_is_true_only_for_limit_commands() {
        let limit = Command::Limit {
            order_id: OrderId::new(),
            symbol: Symbol::new("X"),
            participant_id: ParticipantId::new("A"),
            side: Side::Buy,
            price: Price::from_decimal(10.0),
            size: 1,
            timestamp: 0,
        };
        let market = Command::Market {
            order_id: OrderId::new(),
            symbol: Symbol::new("X"),
            participant_id: ParticipantId::new("A"),
            side: Side::Buy,
            size: 1,
        };
        assert!(limit.is_priced());
        assert!(!market.is_priced());
    }
}
