//! Convenience re-exports for consumers of this crate.

pub use crate::book::{Book, BookConfig, BookError, BookSnapshot};
pub use crate::dispatcher::{SubmissionError, SymbolDispatcher};
pub use crate::ids::{OrderId, ParticipantId, Symbol};
pub use crate::matching::MatchEngine;
pub use crate::order::{Command, Order, Side};
pub use crate::price::{Cash, Price, SCALE};
pub use crate::registry::{ExecutionReport, Participant, ParticipantRegistry, RegistryConfig, ReportListener};
