//! Identifier newtypes shared across the order book, matching engine, and
//! participant registry.

use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Globally unique, opaque order identifier.
///
/// Wraps a [`Uuid`] the way the teacher crate's `pricelevel::Id` does,
/// rather than a bare `String` — cheap to copy, compare, and hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Generates a fresh, random order id.
    pub fn new() -> Self {
        OrderId(Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque participant identifier. Participants are referenced by name
/// throughout the original reference implementation (`"A"`, `"B"`, ...), so
/// this wraps a cheaply-cloned `Arc<str>` rather than a `Uuid`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ParticipantId(Arc<str>);

impl ParticipantId {
    /// Builds a `ParticipantId` from any string-like value.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        ParticipantId(id.into())
    }

    /// Borrows the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        ParticipantId::new(value)
    }
}

impl From<String> for ParticipantId {
    fn from(value: String) -> Self {
        ParticipantId::new(value)
    }
}

/// A traded symbol, e.g. `"X"` or `"BTC/USD"`. Cheaply cloned like
/// [`ParticipantId`] since every order and execution report carries one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Builds a `Symbol` from any string-like value.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Symbol(id.into())
    }

    /// Borrows the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Symbol::new(value)
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Symbol::new(value)
    }
}
