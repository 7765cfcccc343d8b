//! A multi-symbol limit order book with a price-time priority matching
//! engine, arranged behind per-symbol serialized command queues.
//!
//! Each symbol is owned exclusively by one worker thread ([`dispatcher`]),
//! which consumes a FIFO of submitted commands and applies them against that
//! symbol's [`book::Book`] via the [`matching::MatchEngine`]. A shared
//! [`registry::ParticipantRegistry`] tracks cash balances and portfolios
//! across all symbols, settling both sides of every trade atomically.
//!
//! ```
//! use std::sync::Arc;
//! use matching_core::prelude::*;
//!
//! let registry = Arc::new(ParticipantRegistry::new(RegistryConfig::default()));
//! let dispatcher = Arc::new(SymbolDispatcher::new(registry, BookConfig::default()));
//! dispatcher.register_symbol(Symbol::new("X"));
//!
//! dispatcher
//!     .submit_limit(&Symbol::new("X"), ParticipantId::new("A"), Side::Sell, Price::from_decimal(10.0), 5)
//!     .unwrap();
//! ```

pub mod book;
pub mod dispatcher;
pub mod ids;
pub mod level;
pub mod matching;
pub mod order;
pub mod price;
pub mod prelude;
pub mod registry;
pub mod side_index;

pub use book::{Book, BookConfig, BookError, BookSnapshot};
pub use dispatcher::{SubmissionError, SymbolDispatcher};
pub use ids::{OrderId, ParticipantId, Symbol};
pub use matching::MatchEngine;
pub use order::{Command, Order, Side};
pub use price::{Cash, Price, SCALE};
pub use registry::{ExecutionReport, Participant, ParticipantRegistry, RegistryConfig, ReportListener};
