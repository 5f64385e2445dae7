//! Identity types for the reactive system.
//!
//! Sources (reactive objects, refs, computeds) and subscribers (effects) are
//! told apart by identity, never by the values they hold. Two sources wrapping
//! structurally equal values still get distinct IDs and distinct subscriber
//! sets.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a subscriber.
///
/// Every effect (including the one owned by a computed) gets a unique ID when
/// created. Subscriber sets store these IDs, which makes re-tracking the same
/// effect for the same key a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "effect#{}", self.0)
    }
}

/// Unique identifier for a reactive source.
///
/// Clones of a handle share the ID; constructing a new source always
/// allocates a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    /// Generate a new unique source ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// A property of a reactive source that can be tracked independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// A named field of an object.
    Named(Rc<str>),
    /// A slot of an array.
    Index(usize),
    /// A synthetic key that does not correspond to user data.
    Symbol(&'static str),
}

impl PropertyKey {
    /// The synthetic key under which a [`Ref`](super::Ref) tracks its value.
    pub const VALUE: PropertyKey = PropertyKey::Symbol("value");

    /// Build a named key.
    pub fn named(name: impl Into<Rc<str>>) -> Self {
        Self::Named(name.into())
    }
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        Self::Named(Rc::from(name))
    }
}

impl From<String> for PropertyKey {
    fn from(name: String) -> Self {
        Self::Named(Rc::from(name))
    }
}

impl From<usize> for PropertyKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Index(index) => write!(f, "[{index}]"),
            Self::Symbol(symbol) => write!(f, "@{symbol}"),
        }
    }
}
