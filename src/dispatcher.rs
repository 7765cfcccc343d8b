//! Per-symbol command queues and worker threads.
//!
//! Grounded in `OrderQueue.py`'s `PerTickerOrderQueue`: each symbol gets its
//! own `deque` (here a `VecDeque`) guarded by a `Condvar`, and its own
//! dedicated thread that blocks on the condition variable until work
//! arrives. Per §4.5, unpriced commands (market orders, cancels) jump the
//! queue ahead of pending limit commands, matching `put_order`'s
//! `appendleft` vs. `append` split.

use crate::book::{Book, BookConfig, BookSnapshot};
use crate::ids::{OrderId, ParticipantId, Symbol};
use crate::matching::MatchEngine;
use crate::order::{Command, Side};
use crate::price::{Cash, Price};
use crate::registry::ParticipantRegistry;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use tracing::info;

/// Errors raised at submission time, before a command ever reaches its
/// symbol's queue (§6's synchronous submitter-wrapper pre-checks). Uses
/// `thiserror` (unlike [`crate::book::BookError`]) for the derive-heavy
/// variant set here, matching the mixed style the teacher's own
/// `Cargo.toml` declares `thiserror` for without using it everywhere.
///
/// An unknown symbol is deliberately *not* a variant here: per §7's error
/// table, submitting against an unregistered symbol is a programming error
/// that fails loudly (panics), the same way [`ParticipantRegistry::balance`]
/// panics on an unknown participant, rather than a recoverable submission
/// rejection a caller might silently swallow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    /// `size` was zero.
    #[error("order size must be greater than zero")]
    ZeroSize,
    /// A limit order's price was not strictly positive (§3: `kind = limit ⇒ price > 0`).
    #[error("limit price must be greater than zero")]
    NonPositivePrice,
    /// Soft submission-time check for a buy limit order (§11.2): the
    /// participant's balance, read without holding the dispatcher lock, was
    /// already insufficient to cover `price * size`. The authoritative
    /// check is still the match-time one in §4.3.1 step 7 — a balance drop
    /// between this check and the order reaching its worker is possible and
    /// is handled there, not here.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Cash, available: Cash },
}

enum Job {
    Cmd(Command),
    /// A synchronization barrier: the worker signals `done` once every job
    /// queued ahead of this one has been applied. Used by
    /// [`SymbolDispatcher::flush`] to give callers (chiefly tests) a
    /// deterministic way to observe "settled" state instead of the
    /// fixed-delay `time.sleep` the reference implementation's own test
    /// suite relies on.
    Sync { done: crossbeam::channel::Sender<()> },
    Shutdown,
}

struct SymbolQueue {
    queue: Mutex<VecDeque<Job>>,
    condvar: Condvar,
}

impl SymbolQueue {
    fn new() -> Self {
        SymbolQueue {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
        }
    }

    /// Priced commands and sync barriers go to the back; unpriced commands
    /// (market, cancel) jump to the front (§4.5).
    fn push(&self, job: Job) {
        let mut queue = self.queue.lock().unwrap();
        match &job {
            Job::Cmd(cmd) if cmd.is_priced() => queue.push_back(job),
            Job::Sync { .. } => queue.push_back(job),
            _ => queue.push_front(job),
        }
        self.condvar.notify_one();
    }

    fn pop_blocking(&self) -> Job {
        let mut queue = self.queue.lock().unwrap();
        loop {
            if let Some(job) = queue.pop_front() {
                return job;
            }
            queue = self.condvar.wait(queue).unwrap();
        }
    }
}

struct SymbolHandle {
    queue: Arc<SymbolQueue>,
    book: Arc<Book>,
    worker: Option<JoinHandle<()>>,
}

impl fmt::Debug for SymbolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolHandle").finish_non_exhaustive()
    }
}

/// Routes commands to one worker thread per symbol, each owning its own
/// [`Book`] exclusively (§4.5's single-writer rule). Submission is
/// lock-light: only the target symbol's queue is touched, so submissions to
/// different symbols never contend.
pub struct SymbolDispatcher {
    registry: Arc<ParticipantRegistry>,
    default_config: BookConfig,
    symbols: Mutex<HashMap<Symbol, Arc<SymbolHandle>>>,
    clock: AtomicU64,
}

impl SymbolDispatcher {
    /// Creates a dispatcher with no symbols registered yet.
    pub fn new(registry: Arc<ParticipantRegistry>, default_config: BookConfig) -> Self {
        SymbolDispatcher {
            registry,
            default_config,
            symbols: Mutex::new(HashMap::new()),
            clock: AtomicU64::new(0),
        }
    }

    /// Registers a symbol, spawning its dedicated worker thread. A no-op if
    /// the symbol is already registered.
    pub fn register_symbol(&self, symbol: Symbol) {
        let mut symbols = self.symbols.lock().unwrap();
        if symbols.contains_key(&symbol) {
            return;
        }

        let queue = Arc::new(SymbolQueue::new());
        let book = Arc::new(Book::new(symbol.clone(), self.default_config));
        let registry = self.registry.clone();
        let worker_queue = queue.clone();
        let worker_book = book.clone();
        let worker_symbol = symbol.clone();

        let worker = std::thread::Builder::new()
            .name(format!("symbol-{symbol}"))
            .spawn(move || run_worker(worker_symbol, worker_book, registry, worker_queue))
            .expect("failed to spawn symbol worker thread");

        symbols.insert(
            symbol,
            Arc::new(SymbolHandle {
                queue,
                book,
                worker: Some(worker),
            }),
        );
    }

    /// A read-only depth snapshot of `symbol`'s book (§4.6, §6). Reads the
    /// book's lock-free ordered indexes directly rather than enqueueing a
    /// command, so it never blocks behind pending matching work and may run
    /// concurrently with the symbol's worker.
    ///
    /// # Panics
    /// Panics if `symbol` has never been [`Self::register_symbol`]d.
    pub fn snapshot(&self, symbol: &Symbol, depth: usize) -> BookSnapshot {
        self.handle_for(symbol).book.snapshot(depth)
    }

    /// The best (most aggressive) resting price on `side` for `symbol`, if any.
    ///
    /// # Panics
    /// Panics if `symbol` has never been [`Self::register_symbol`]d.
    pub fn best_price(&self, symbol: &Symbol, side: Side) -> Option<Price> {
        self.handle_for(symbol).book.best_price(side)
    }

    /// Submits a limit order, returning its freshly generated id. Pre-checks
    /// non-zero size, a strictly positive price, and — for a buy — a soft
    /// balance check (§6, §11.2) before the command ever reaches the queue,
    /// just as `Participant.py`'s `_place_order_in_queue` validates before
    /// enqueueing.
    ///
    /// # Panics
    /// Panics if `symbol` has never been [`Self::register_symbol`]d.
    pub fn submit_limit(
        &self,
        symbol: &Symbol,
        participant_id: ParticipantId,
        side: Side,
        price: Price,
        size: u64,
    ) -> Result<OrderId, SubmissionError> {
        if size == 0 {
            return Err(SubmissionError::ZeroSize);
        }
        if price.cents() == 0 {
            return Err(SubmissionError::NonPositivePrice);
        }
        let handle = self.handle_for(symbol);
        self.registry.ensure(&participant_id);

        if side == Side::Buy {
            let required = price.cents() as i64 * size as i64;
            let available = self.registry.balance(&participant_id);
            if available < required {
                return Err(SubmissionError::InsufficientBalance { required, available });
            }
        }

        let order_id = OrderId::new();
        let timestamp = self.clock.fetch_add(1, Ordering::Relaxed);
        handle.queue.push(Job::Cmd(Command::Limit {
            order_id,
            symbol: symbol.clone(),
            participant_id,
            side,
            price,
            size,
            timestamp,
        }));
        Ok(order_id)
    }

    /// Submits a market order, returning its freshly generated id.
    ///
    /// # Panics
    /// Panics if `symbol` has never been [`Self::register_symbol`]d.
    pub fn submit_market(
        &self,
        symbol: &Symbol,
        participant_id: ParticipantId,
        side: Side,
        size: u64,
    ) -> Result<OrderId, SubmissionError> {
        if size == 0 {
            return Err(SubmissionError::ZeroSize);
        }
        let handle = self.handle_for(symbol);
        self.registry.ensure(&participant_id);

        let order_id = OrderId::new();
        handle.queue.push(Job::Cmd(Command::Market {
            order_id,
            symbol: symbol.clone(),
            participant_id,
            side,
            size,
        }));
        Ok(order_id)
    }

    /// Submits a cancel for a previously submitted order. Jumps the queue
    /// ahead of pending limit commands (§4.5); resolves to a no-op on the
    /// worker side if the order is unknown or already resolved (§4.3.3).
    ///
    /// # Panics
    /// Panics if `symbol` has never been [`Self::register_symbol`]d.
    pub fn submit_cancel(&self, symbol: &Symbol, participant_id: ParticipantId, order_id: OrderId) {
        let handle = self.handle_for(symbol);
        handle.queue.push(Job::Cmd(Command::Cancel {
            order_id,
            symbol: symbol.clone(),
            participant_id,
        }));
    }

    /// Blocks until every command submitted for `symbol` before this call
    /// has been applied by its worker. Not part of the original spec's
    /// submission API (§6) — a purely internal synchronization aid for
    /// callers, chiefly tests, that need a deterministic "settled" point
    /// rather than sleeping a fixed delay.
    ///
    /// # Panics
    /// Panics if `symbol` has never been [`Self::register_symbol`]d.
    pub fn flush(&self, symbol: &Symbol) {
        let handle = self.handle_for(symbol);
        let (done, wait) = crossbeam::channel::bounded(1);
        handle.queue.push(Job::Sync { done });
        let _ = wait.recv();
    }

    fn handle_for(&self, symbol: &Symbol) -> Arc<SymbolHandle> {
        self.symbols
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| panic!("unknown symbol {symbol}: not registered with this dispatcher"))
    }
}

impl Drop for SymbolDispatcher {
    fn drop(&mut self) {
        let mut symbols = self.symbols.lock().unwrap();
        for handle in symbols.values() {
            handle.queue.push(Job::Shutdown);
        }
        for (_, handle) in symbols.drain() {
            if let Ok(mut inner) = Arc::try_unwrap(handle) {
                if let Some(worker) = inner.worker.take() {
                    let _ = worker.join();
                }
            }
        }
    }
}

fn run_worker(symbol: Symbol, book: Arc<Book>, registry: Arc<ParticipantRegistry>, queue: Arc<SymbolQueue>) {
    info!(symbol = %symbol, "symbol worker started");
    let engine = MatchEngine::new(&book, &registry);
    loop {
        match queue.pop_blocking() {
            Job::Shutdown => break,
            Job::Cmd(Command::Limit {
                order_id,
                participant_id,
                side,
                price,
                size,
                timestamp,
                ..
            }) => engine.match_limit(order_id, participant_id, side, price, size, timestamp),
            Job::Cmd(Command::Market {
                order_id,
                participant_id,
                side,
                size,
                ..
            }) => engine.match_market(order_id, participant_id, side, size),
            Job::Cmd(Command::Cancel { order_id, .. }) => engine.cancel(order_id),
            Job::Sync { done } => {
                let _ = done.send(());
            }
        }
    }
    info!(symbol = %symbol, "symbol worker stopped");
}
