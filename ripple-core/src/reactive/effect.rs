//! Effect Implementation
//!
//! An Effect is a computation that re-runs synchronously whenever a value it
//! read during its previous run is written with a different value.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately, with itself on
//!    top of the tracking stack, so every reactive read subscribes it.
//!
//! 2. When a dependency is written, the trigger runs the effect again before
//!    the write call returns.
//!
//! 3. Subscriptions accumulate: a dependency the effect stops reading keeps
//!    notifying it until the effect is disposed.
//!
//! # Ownership
//!
//! The runtime owns every live effect. The [`Effect`] returned to callers is
//! a disposer handle: dropping it leaves the effect running, calling
//! [`Effect::dispose`] removes it from every subscriber set it joined.
//!
//! # Re-entrancy
//!
//! An effect may end up running inside itself (it writes a value it also
//! reads, or two effects feed each other). Each node counts how many of its
//! invocations are on the call stack and refuses to go deeper than the
//! runtime's configured bound.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexSet;

use super::context::TrackingContext;
use super::runtime::RuntimeInner;
use super::{PropertyKey, SourceId, SubscriberId};
use crate::error::{ReactiveError, Result};

/// The computation behind an [`Effect`], owned by the runtime.
pub(crate) struct EffectNode {
    id: SubscriberId,
    /// Released on disposal so captured sources can be dropped.
    body: RefCell<Option<Rc<dyn Fn()>>>,
    /// Invocations of this effect currently on the call stack.
    depth: Cell<usize>,
    runs: Cell<usize>,
    disposed: Cell<bool>,
    /// Every `(source, key)` this effect has been subscribed to.
    dependencies: RefCell<IndexSet<(SourceId, PropertyKey)>>,
}

impl EffectNode {
    pub(crate) fn new(body: Box<dyn Fn()>) -> Self {
        Self {
            id: SubscriberId::new(),
            body: RefCell::new(Some(Rc::from(body))),
            depth: Cell::new(0),
            runs: Cell::new(0),
            disposed: Cell::new(false),
            dependencies: RefCell::new(IndexSet::new()),
        }
    }

    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    /// Run the body with this effect as the active computation.
    pub(crate) fn run(&self, context: &TrackingContext, max_depth: usize) -> Result<()> {
        if self.disposed.get() {
            return Ok(());
        }
        let Some(body) = self.body.borrow().clone() else {
            return Ok(());
        };

        if self.depth.get() >= max_depth {
            tracing::warn!(effect = %self.id, limit = max_depth, "effect recursion limit exceeded");
            return Err(ReactiveError::RecursionLimitExceeded {
                effect: self.id,
                limit: max_depth,
            });
        }

        let _depth = DepthGuard::enter(&self.depth);
        self.runs.set(self.runs.get() + 1);
        tracing::trace!(effect = %self.id, run = self.runs.get(), depth = self.depth.get(), "running effect");

        context.run_as_active(self.id, || body());
        Ok(())
    }

    pub(crate) fn record_dependency(&self, source: SourceId, key: PropertyKey) {
        self.dependencies.borrow_mut().insert((source, key));
    }

    /// Drop every recorded dependency on `source`.
    pub(crate) fn forget_source(&self, source: SourceId) {
        self.dependencies
            .borrow_mut()
            .retain(|(dependency, _)| *dependency != source);
    }

    pub(crate) fn take_dependencies(&self) -> IndexSet<(SourceId, PropertyKey)> {
        self.dependencies.take()
    }

    pub(crate) fn mark_disposed(&self) {
        self.disposed.set(true);
    }

    /// Drop the body. A run in progress keeps its own reference until it
    /// returns.
    pub(crate) fn release(&self) {
        let body = self.body.borrow_mut().take();
        drop(body);
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    pub(crate) fn run_count(&self) -> usize {
        self.runs.get()
    }

    pub(crate) fn dependency_count(&self) -> usize {
        self.dependencies.borrow().len()
    }
}

/// Increments a depth counter for as long as it lives.
struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
}

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self { depth }
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

/// Handle to a running effect.
///
/// # Example
///
/// ```rust
/// use ripple_core::Runtime;
///
/// let rt = Runtime::new();
/// let count = rt.create_ref(0);
///
/// let seen = std::rc::Rc::new(std::cell::Cell::new(0));
/// let effect = {
///     let (count, seen) = (count.clone(), seen.clone());
///     rt.effect(move || seen.set(count.get())).unwrap()
/// };
///
/// count.set(5).unwrap();
/// assert_eq!(seen.get(), 5);
///
/// effect.dispose();
/// count.set(6).unwrap();
/// assert_eq!(seen.get(), 5);
/// ```
#[derive(Clone)]
pub struct Effect {
    node: Rc<EffectNode>,
    runtime: Weak<RuntimeInner>,
}

impl Effect {
    pub(crate) fn new(node: Rc<EffectNode>, runtime: Weak<RuntimeInner>) -> Self {
        Self { node, runtime }
    }

    /// Get the subscriber ID of this effect.
    pub fn id(&self) -> SubscriberId {
        self.node.id()
    }

    /// Stop the effect and remove it from every subscriber set it joined.
    ///
    /// Disposing twice is a no-op. A run already in progress finishes, but
    /// its remaining reads no longer subscribe it.
    pub fn dispose(&self) {
        self.node.mark_disposed();
        match self.runtime.upgrade() {
            Some(runtime) => {
                runtime.dispose_effect(self.node.id());
            }
            None => self.node.release(),
        }
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.node.is_disposed()
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.node.run_count()
    }

    /// Get the number of `(source, key)` pairs the effect is subscribed to.
    pub fn dependency_count(&self) -> usize {
        self.node.dependency_count()
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
