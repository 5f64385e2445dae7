//! Dependency Registry
//!
//! Maps `(source, key)` pairs to the set of effects subscribed to them.
//!
//! The registry is pure bookkeeping: it never runs anything and never owns a
//! source. Entries are keyed by [`SourceId`], so a source can be dropped while
//! its entry still exists; the source's drop handler calls
//! [`DependencyRegistry::forget_source`] to reclaim it.
//!
//! Subscriber sets are insertion-ordered, which gives triggers a
//! deterministic "first tracked, first invoked" order.

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use super::{PropertyKey, SourceId, SubscriberId};

/// A point-in-time copy of a subscriber set, taken before any subscriber runs.
pub type SubscriberSnapshot = SmallVec<[SubscriberId; 4]>;

type KeyMap = IndexMap<PropertyKey, IndexSet<SubscriberId>>;

/// Identity-keyed subscriber bookkeeping.
#[derive(Debug, Default)]
pub struct DependencyRegistry {
    sources: IndexMap<SourceId, KeyMap>,
}

impl DependencyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `subscriber` to the set for `(source, key)`, creating the per-source
    /// map and the per-key set on first use.
    ///
    /// Returns `false` if the subscriber was already present.
    pub fn subscribe(&mut self, source: SourceId, key: PropertyKey, subscriber: SubscriberId) -> bool {
        self.sources
            .entry(source)
            .or_default()
            .entry(key)
            .or_default()
            .insert(subscriber)
    }

    /// Remove `subscriber` from the set for `(source, key)`.
    ///
    /// Empty sets are kept; entries live as long as their source.
    pub fn unsubscribe(&mut self, source: SourceId, key: &PropertyKey, subscriber: SubscriberId) -> bool {
        self.sources
            .get_mut(&source)
            .and_then(|keys| keys.get_mut(key))
            .is_some_and(|set| set.shift_remove(&subscriber))
    }

    /// Copy the subscribers of `(source, key)` in insertion order.
    pub fn snapshot(&self, source: SourceId, key: &PropertyKey) -> SubscriberSnapshot {
        self.sources
            .get(&source)
            .and_then(|keys| keys.get(key))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drop every entry belonging to `source`.
    ///
    /// Returns the subscribers that were registered under any of its keys,
    /// each once, in first-subscribed order.
    pub fn forget_source(&mut self, source: SourceId) -> IndexSet<SubscriberId> {
        self.sources
            .shift_remove(&source)
            .map(|keys| keys.into_values().flatten().collect())
            .unwrap_or_default()
    }

    /// Number of subscribers currently registered for `(source, key)`.
    pub fn subscriber_count(&self, source: SourceId, key: &PropertyKey) -> usize {
        self.sources
            .get(&source)
            .and_then(|keys| keys.get(key))
            .map_or(0, |set| set.len())
    }

    /// Number of sources with at least one tracked key.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Whether any key of `source` has ever been tracked.
    pub fn contains_source(&self, source: SourceId) -> bool {
        self.sources.contains_key(&source)
    }
}
