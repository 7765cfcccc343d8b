//! Fixed-point price and cash representations.
//!
//! Per the design notes, prices and cash are fixed-point integers scaled by
//! 100 (cents / integer ticks) rather than binary floats, so that price keys
//! compare and hash exactly.

use std::fmt;

/// Number of integer units per whole currency/price unit (i.e. cents per dollar).
pub const SCALE: i64 = 100;

/// A price, scaled by [`SCALE`]. `Price(1000)` represents `10.00`.
///
/// Always non-negative for a valid limit order; `Price` itself does not
/// enforce positivity, callers check `> 0` at the boundaries the spec names
/// (submission pre-checks, `Book::add`'s floor/cap range check).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Price(pub u64);

impl Price {
    /// Builds a `Price` from a whole-and-cents pair, e.g. `Price::from_cents(1000)` = `10.00`.
    pub const fn from_cents(cents: u64) -> Self {
        Price(cents)
    }

    /// Builds a `Price` from a decimal dollar amount, rounding to the nearest cent.
    pub fn from_decimal(value: f64) -> Self {
        Price((value * SCALE as f64).round() as u64)
    }

    /// The underlying scaled integer value.
    pub const fn cents(self) -> u64 {
        self.0
    }

    /// The value as a decimal dollar amount, for display and test assertions only.
    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.as_decimal())
    }
}


/// A cash balance or notional amount, scaled by [`SCALE`]. Signed because
/// intermediate trade math (debit before credit lands) is easier to reason
/// about with signed arithmetic, even though a settled balance never goes
/// negative on the buy side (§4.4's invariant, enforced by the registry).
pub type Cash = i64;
