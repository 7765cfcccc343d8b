//! Participant accounts: cash balance and symbol portfolio, updated
//! atomically as trades settle.
//!
//! Grounded in `ParticipantManager.py`/`Participant.py`: participants are
//! created lazily on first reference (`ensure`), and the registry applies
//! both sides of a trade's cash/portfolio update under one lock so a
//! concurrent read never observes a half-settled trade (§5).

use crate::ids::{OrderId, ParticipantId, Symbol};
use crate::order::Side;
use crate::price::{Cash, Price};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// One participant's account state.
#[derive(Debug, Clone, Default)]
pub struct Participant {
    /// Cash balance, scaled per [`crate::price::SCALE`]. Never negative
    /// (§4.4, §8 invariant-adjacent property 5) because every buy is
    /// pre-checked and/or balance-capped before it can fill.
    pub balance: Cash,
    /// Resting long position per symbol. The reference implementation
    /// allows short positions to emerge from uncovered sells (it never
    /// checks inventory on the sell side), so this may go negative;
    /// §11 notes this as a deliberate carry-over rather than an omission.
    pub portfolio: HashMap<Symbol, i64>,
}

/// A single trade's settlement report, delivered once per side (buyer and
/// seller each get their own), matching §6's execution report schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub participant_id: ParticipantId,
    pub counterparty_id: ParticipantId,
    pub symbol: Symbol,
    pub side: Side,
    pub price: Price,
    pub size: u64,
    pub order_id: OrderId,
    pub counterparty_order_id: OrderId,
    pub resulting_balance: Cash,
    pub resulting_position: i64,
}

/// Receives execution reports as they are produced. Grounded in the
/// teacher's `TradeListener = Arc<dyn Fn(&TradeResult) + Send + Sync>`.
pub type ReportListener = Arc<dyn Fn(&ExecutionReport) + Send + Sync>;

/// Starting balance and other account defaults, grounded in `Participant.py`'s
/// constructor default of `100_000.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    pub starting_balance: Cash,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            starting_balance: 100_000 * crate::price::SCALE,
        }
    }
}

/// Account directory for all participants across all symbols.
///
/// A single `Mutex<HashMap<..>>` rather than per-entry locking or a
/// `DashMap`: §5 explicitly sanctions one registry-wide lock for this
/// workload, and settling a trade always touches two entries (buyer and
/// seller) atomically, which a single lock gives for free without a lock
/// ordering scheme.
pub struct ParticipantRegistry {
    config: RegistryConfig,
    accounts: Mutex<HashMap<ParticipantId, Participant>>,
    listener: Option<ReportListener>,
}

impl ParticipantRegistry {
    /// Creates an empty registry.
    pub fn new(config: RegistryConfig) -> Self {
        ParticipantRegistry {
            config,
            accounts: Mutex::new(HashMap::new()),
            listener: None,
        }
    }

    /// Attaches a listener invoked once per execution report produced by
    /// [`Self::settle_trade`] or [`Self::fill_trade`].
    pub fn with_listener(mut self, listener: ReportListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Ensures `participant_id` has an account, creating one with the
    /// configured starting balance if this is the first reference to it.
    pub fn ensure(&self, participant_id: &ParticipantId) {
        let mut accounts = self.accounts.lock().unwrap();
        accounts.entry(participant_id.clone()).or_insert_with(|| {
            debug!(participant_id = %participant_id, balance = self.config.starting_balance, "participant account opened");
            Participant {
                balance: self.config.starting_balance,
                portfolio: HashMap::new(),
            }
        });
    }

    /// The participant's current cash balance.
    ///
    /// # Panics
    /// Panics if `participant_id` has never been `ensure`d — callers that
    /// accept external participant ids must `ensure` them first.
    pub fn balance(&self, participant_id: &ParticipantId) -> Cash {
        self.accounts
            .lock()
            .unwrap()
            .get(participant_id)
            .unwrap_or_else(|| panic!("unknown participant {participant_id}"))
            .balance
    }

    /// The participant's current position in `symbol` (0 if never traded).
    ///
    /// # Panics
    /// Panics if `participant_id` has never been `ensure`d.
    pub fn position(&self, participant_id: &ParticipantId, symbol: &Symbol) -> i64 {
        self.accounts
            .lock()
            .unwrap()
            .get(participant_id)
            .unwrap_or_else(|| panic!("unknown participant {participant_id}"))
            .portfolio
            .get(symbol)
            .copied()
            .unwrap_or(0)
    }

    /// The maximum quantity `participant_id` can afford to buy at `price`,
    /// i.e. `floor(balance / price)` — the balance-constrained partial fill
    /// rule from `MatchEngine.py`'s `acceptLimitOrder` (§4.3.1).
    ///
    /// This is a point-in-time read, released before returning. A caller
    /// that needs this read and a subsequent settlement to be atomic with
    /// respect to other symbols' workers touching the same participant
    /// (§5) must use [`Self::fill_trade`] instead, which holds the
    /// registry lock across both.
    pub fn affordable_quantity(&self, participant_id: &ParticipantId, price: Price) -> u64 {
        if price.cents() == 0 {
            return u64::MAX;
        }
        let balance = self.balance(participant_id);
        if balance <= 0 {
            return 0;
        }
        // balance and price.cents() are both scaled by SCALE, so the scale
        // cancels: this is floor(balance_dollars / price_dollars).
        balance as u64 / price.cents()
    }

    /// Settles one fill between a buyer and a seller for exactly `size`
    /// units at `price`: debits the buyer, credits the seller, updates both
    /// portfolios, and fans out one [`ExecutionReport`] per side to the
    /// attached listener, if any.
    ///
    /// Holds the registry lock for the whole update so a concurrent
    /// `balance`/`position` read from another symbol's worker thread never
    /// observes the buyer debited but the seller not yet credited. Callers
    /// that must first cap `size` by what the buyer can afford should use
    /// [`Self::fill_trade`] instead — calling [`Self::affordable_quantity`]
    /// and then this method separately leaves a window in which another
    /// symbol's worker can change the buyer's balance between the read and
    /// the write (§5).
    #[allow(clippy::too_many_arguments)]
    pub fn settle_trade(
        &self,
        symbol: &Symbol,
        price: Price,
        size: u64,
        buyer_id: &ParticipantId,
        buyer_order_id: OrderId,
        seller_id: &ParticipantId,
        seller_order_id: OrderId,
    ) {
        let mut accounts = self.accounts.lock().unwrap();
        let (buyer_report, seller_report) = Self::apply_settlement(
            &mut accounts,
            symbol,
            price,
            size,
            buyer_id,
            buyer_order_id,
            seller_id,
            seller_order_id,
        );
        drop(accounts);
        self.emit_settlement(symbol, price, size, buyer_id, seller_id, &buyer_report, &seller_report);
    }

    /// Caps `requested` by how much `buyer_id` can afford at `price`, then
    /// settles the resulting quantity (if any) between buyer and seller —
    /// all under a single acquisition of the registry lock, so the
    /// affordability read and the debit/credit write for one fill are
    /// atomic with respect to every other symbol's worker. This is the
    /// read-decide-write window §5 requires for §4.3.1 steps 6-8: without
    /// it, a concurrent trade on a different symbol could debit the same
    /// buyer between this method's read of the balance and its write,
    /// driving the balance negative.
    ///
    /// Returns the quantity actually filled, which may be less than
    /// `requested` or zero (zero means: no settlement occurred, and the
    /// caller must decide whether to cancel a resting order or simply stop
    /// matching, per §4.3.1 step 7 / §4.3.2 step 4).
    #[allow(clippy::too_many_arguments)]
    pub fn fill_trade(
        &self,
        symbol: &Symbol,
        price: Price,
        requested: u64,
        buyer_id: &ParticipantId,
        buyer_order_id: OrderId,
        seller_id: &ParticipantId,
        seller_order_id: OrderId,
    ) -> u64 {
        let mut accounts = self.accounts.lock().unwrap();

        let affordable = if price.cents() == 0 {
            u64::MAX
        } else {
            let balance = accounts
                .get(buyer_id)
                .unwrap_or_else(|| panic!("unknown participant {buyer_id}"))
                .balance;
            if balance <= 0 { 0 } else { balance as u64 / price.cents() }
        };
        let qty = requested.min(affordable);
        if qty == 0 {
            return 0;
        }

        let (buyer_report, seller_report) = Self::apply_settlement(
            &mut accounts,
            symbol,
            price,
            qty,
            buyer_id,
            buyer_order_id,
            seller_id,
            seller_order_id,
        );
        drop(accounts);
        self.emit_settlement(symbol, price, qty, buyer_id, seller_id, &buyer_report, &seller_report);
        qty
    }

    /// Applies the debit/credit/portfolio update for one fill. The caller
    /// must already be holding `accounts`'s lock; shared by
    /// [`Self::settle_trade`] and [`Self::fill_trade`] so both settlement
    /// paths update accounts identically.
    #[allow(clippy::too_many_arguments)]
    fn apply_settlement(
        accounts: &mut HashMap<ParticipantId, Participant>,
        symbol: &Symbol,
        price: Price,
        size: u64,
        buyer_id: &ParticipantId,
        buyer_order_id: OrderId,
        seller_id: &ParticipantId,
        seller_order_id: OrderId,
    ) -> (ExecutionReport, ExecutionReport) {
        // price.cents() is price_dollars * SCALE; multiplying by size gives
        // notional already scaled by SCALE, matching balance's scale.
        let notional = price.cents() as i64 * size as i64;

        let buyer = accounts
            .get_mut(buyer_id)
            .unwrap_or_else(|| panic!("unknown participant {buyer_id}"));
        buyer.balance -= notional;
        *buyer.portfolio.entry(symbol.clone()).or_insert(0) += size as i64;
        let buyer_report = ExecutionReport {
            participant_id: buyer_id.clone(),
            counterparty_id: seller_id.clone(),
            symbol: symbol.clone(),
            side: Side::Buy,
            price,
            size,
            order_id: buyer_order_id,
            counterparty_order_id: seller_order_id,
            resulting_balance: buyer.balance,
            resulting_position: *buyer.portfolio.get(symbol).unwrap(),
        };

        let seller = accounts
            .get_mut(seller_id)
            .unwrap_or_else(|| panic!("unknown participant {seller_id}"));
        seller.balance += notional;
        *seller.portfolio.entry(symbol.clone()).or_insert(0) -= size as i64;
        let seller_report = ExecutionReport {
            participant_id: seller_id.clone(),
            counterparty_id: buyer_id.clone(),
            symbol: symbol.clone(),
            side: Side::Sell,
            price,
            size,
            order_id: seller_order_id,
            counterparty_order_id: buyer_order_id,
            resulting_balance: seller.balance,
            resulting_position: *seller.portfolio.get(symbol).unwrap(),
        };

        (buyer_report, seller_report)
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_settlement(
        &self,
        symbol: &Symbol,
        price: Price,
        size: u64,
        buyer_id: &ParticipantId,
        seller_id: &ParticipantId,
        buyer_report: &ExecutionReport,
        seller_report: &ExecutionReport,
    ) {
        info!(
            symbol = %symbol, price = %price, size,
            buyer = %buyer_id, seller = %seller_id,
            "trade settled"
        );

        if let Some(listener) = &self.listener {
            listener(buyer_report);
            listener(seller_report);
        }
    }
}
