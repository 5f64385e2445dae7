//! Reactive Runtime
//!
//! The runtime is the explicit context object that connects sources and
//! effects. It owns the dependency registry, the tracking stack and every
//! live effect.
//!
//! # How It Works
//!
//! 1. When a source is read while an effect is running, the runtime
//!    subscribes that effect to the `(source, key)` pair.
//!
//! 2. When a source is written with a different value, the runtime copies
//!    the subscriber set for that pair and runs each effect in the copy, in
//!    the order they subscribed, before the write returns.
//!
//! 3. Effects may write further sources while they run. Those nested
//!    triggers complete on the same call stack.
//!
//! # Failure Propagation
//!
//! Writes, triggers and effect construction are "operations". Operations
//! nest; the first failure inside any of them is recorded on the runtime,
//! stops every enclosing trigger from running further subscribers, and is
//! returned by the outermost operation even if an effect body in between
//! discarded it.
//!
//! # Ownership
//!
//! Sources hold a weak reference to the runtime and the runtime never holds
//! a source, so dropping the last [`Runtime`] handle tears down the registry
//! and every effect closure with it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use super::context::TrackingContext;
use super::effect::{Effect, EffectNode};
use super::registry::DependencyRegistry;
use super::{Computed, PropertyKey, ReactiveProxy, Ref, SameValue, SourceId, SubscriberId};
use crate::config::RuntimeConfig;
use crate::error::{ReactiveError, Result};

/// Shared state behind a [`Runtime`] handle.
pub(crate) struct RuntimeInner {
    config: RuntimeConfig,
    registry: RefCell<DependencyRegistry>,
    context: TrackingContext,
    effects: RefCell<IndexMap<SubscriberId, Rc<EffectNode>>>,
    /// Nesting depth of writes, triggers and effect constructions.
    operation_depth: Cell<usize>,
    /// First failure raised inside the current outermost operation.
    failure: RefCell<Option<ReactiveError>>,
}

impl RuntimeInner {
    fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            registry: RefCell::new(DependencyRegistry::new()),
            context: TrackingContext::new(),
            effects: RefCell::new(IndexMap::new()),
            operation_depth: Cell::new(0),
            failure: RefCell::new(None),
        }
    }

    /// Subscribe the active effect, if any, to `(source, key)`.
    pub(crate) fn track(&self, source: SourceId, key: PropertyKey) {
        let Some(subscriber) = self.context.current() else {
            return;
        };
        // A disposed effect may still be finishing its run.
        let Some(node) = self.effect_node(subscriber) else {
            return;
        };

        if self
            .registry
            .borrow_mut()
            .subscribe(source, key.clone(), subscriber)
        {
            tracing::trace!(%source, %key, %subscriber, "track");
        }
        node.record_dependency(source, key);
    }

    /// Run every effect subscribed to `(source, key)`.
    pub(crate) fn trigger(&self, source: SourceId, key: &PropertyKey) -> Result<()> {
        let snapshot = self.registry.borrow().snapshot(source, key);
        tracing::debug!(%source, %key, subscribers = snapshot.len(), "trigger");

        if snapshot.is_empty() {
            return Ok(());
        }

        self.run_operation(|| {
            for subscriber in snapshot {
                if self.failure.borrow().is_some() {
                    break;
                }
                // Disposed since the snapshot was taken.
                let Some(node) = self.effect_node(subscriber) else {
                    continue;
                };
                node.run(&self.context, self.config.max_effect_depth)?;
            }
            Ok(())
        })
    }

    pub(crate) fn create_effect(self: &Rc<Self>, body: Box<dyn Fn()>) -> Result<Effect> {
        let node = Rc::new(EffectNode::new(body));
        let id = node.id();
        self.effects.borrow_mut().insert(id, Rc::clone(&node));
        tracing::debug!(effect = %id, "effect created");

        let effect = Effect::new(Rc::clone(&node), Rc::downgrade(self));
        if let Err(err) = self.run_operation(|| node.run(&self.context, self.config.max_effect_depth)) {
            effect.dispose();
            return Err(err);
        }
        Ok(effect)
    }

    /// Remove an effect from the runtime and from every subscriber set.
    pub(crate) fn dispose_effect(&self, id: SubscriberId) -> bool {
        let Some(node) = self.effects.borrow_mut().shift_remove(&id) else {
            return false;
        };
        node.mark_disposed();

        let dependencies = node.take_dependencies();
        {
            let mut registry = self.registry.borrow_mut();
            for (source, key) in &dependencies {
                registry.unsubscribe(*source, key, id);
            }
        }
        tracing::debug!(effect = %id, dependencies = dependencies.len(), "effect disposed");

        // May drop the last handle of a source, which re-enters the registry.
        node.release();
        true
    }

    /// Drop the registry entry of a source that is going away, along with
    /// the dependency records its subscribers kept on it.
    pub(crate) fn forget_source(&self, source: SourceId) {
        let subscribers = self.registry.borrow_mut().forget_source(source);
        if subscribers.is_empty() {
            return;
        }
        tracing::trace!(%source, subscribers = subscribers.len(), "source dropped");

        for subscriber in subscribers {
            if let Some(node) = self.effect_node(subscriber) {
                node.forget_source(source);
            }
        }
    }

    fn effect_node(&self, id: SubscriberId) -> Option<Rc<EffectNode>> {
        self.effects.borrow().get(&id).cloned()
    }

    fn run_operation<R>(&self, op: impl FnOnce() -> Result<R>) -> Result<R> {
        let result = {
            let _scope = OperationScope::enter(self);
            op()
        };

        if let Err(err) = &result {
            self.failure.borrow_mut().get_or_insert_with(|| err.clone());
        }

        let failure = if self.operation_depth.get() == 0 {
            self.failure.borrow_mut().take()
        } else {
            self.failure.borrow().clone()
        };

        match failure {
            Some(err) => Err(err),
            None => result,
        }
    }
}

/// Tracks operation nesting; clears a pending failure if the outermost
/// operation unwinds.
struct OperationScope<'a> {
    runtime: &'a RuntimeInner,
}

impl<'a> OperationScope<'a> {
    fn enter(runtime: &'a RuntimeInner) -> Self {
        runtime.operation_depth.set(runtime.operation_depth.get() + 1);
        Self { runtime }
    }
}

impl Drop for OperationScope<'_> {
    fn drop(&mut self) {
        let depth = self.runtime.operation_depth.get() - 1;
        self.runtime.operation_depth.set(depth);
        if depth == 0 && std::thread::panicking() {
            self.runtime.failure.borrow_mut().take();
        }
    }
}

/// Handle to a reactive runtime.
///
/// Every source and effect belongs to exactly one runtime; runtimes never
/// observe each other. Cloning the handle shares the runtime.
///
/// # Example
///
/// ```rust
/// use ripple_core::Runtime;
/// use serde_json::json;
///
/// let rt = Runtime::new();
/// let product = rt.reactive(json!({ "price": 5, "quantity": 2 })).unwrap();
///
/// let total = {
///     let product = product.clone();
///     rt.computed(move || {
///         let price: f64 = product.get_as("price").unwrap().unwrap_or_default();
///         let quantity: f64 = product.get_as("quantity").unwrap().unwrap_or_default();
///         price * quantity
///     })
///     .unwrap()
/// };
///
/// assert_eq!(total.get(), 10.0);
/// product.set("quantity", 3).unwrap();
/// assert_eq!(total.get(), 15.0);
/// ```
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(RuntimeConfig::default())),
        }
    }

    /// Create a runtime with a validated configuration.
    pub fn with_config(config: RuntimeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Rc::new(RuntimeInner::new(config)),
        })
    }

    /// The configuration this runtime was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub(crate) fn downgrade(&self) -> Weak<RuntimeInner> {
        Rc::downgrade(&self.inner)
    }

    /// Wrap a JSON object or array so that reads subscribe and writes notify.
    pub fn reactive(&self, target: Value) -> Result<ReactiveProxy> {
        ReactiveProxy::new(self, target)
    }

    /// Serialize `value` and wrap the result with [`Runtime::reactive`].
    pub fn reactive_from<T: Serialize + ?Sized>(&self, value: &T) -> Result<ReactiveProxy> {
        ReactiveProxy::from_serialize(self, value)
    }

    /// Box a single value with the same track/trigger contract.
    pub fn create_ref<T: SameValue + Clone + 'static>(&self, value: T) -> Ref<T> {
        Ref::new(self, value)
    }

    /// Run `f` now and again whenever something it read changes.
    ///
    /// Fails only if the first run exceeds the recursion limit, in which case
    /// the effect is disposed before returning.
    pub fn effect<F>(&self, f: F) -> Result<Effect>
    where
        F: Fn() + 'static,
    {
        self.inner.create_effect(Box::new(f))
    }

    /// Derive a read-only value kept current by an owned effect.
    pub fn computed<T, F>(&self, getter: F) -> Result<Computed<T>>
    where
        T: SameValue + Clone + 'static,
        F: Fn() -> T + 'static,
    {
        Computed::new(self, getter)
    }

    /// Subscribe the running effect, if any, to `(source, key)`.
    ///
    /// Lets custom sources take part in tracking.
    pub fn track(&self, source: SourceId, key: impl Into<PropertyKey>) {
        self.inner.track(source, key.into());
    }

    /// Run every effect subscribed to `(source, key)`.
    pub fn trigger(&self, source: SourceId, key: impl Into<PropertyKey>) -> Result<()> {
        self.inner.trigger(source, &key.into())
    }

    /// Check if an effect is running, i.e. reads would subscribe.
    pub fn is_tracking(&self) -> bool {
        self.inner.context.is_active()
    }

    /// The effect that a read right now would subscribe.
    pub fn current_subscriber(&self) -> Option<SubscriberId> {
        self.inner.context.current()
    }

    /// Number of effects subscribed to `(source, key)`.
    pub fn subscriber_count(&self, source: SourceId, key: &PropertyKey) -> usize {
        self.inner.registry.borrow().subscriber_count(source, key)
    }

    /// Number of sources with a registry entry.
    pub fn source_count(&self) -> usize {
        self.inner.registry.borrow().source_count()
    }

    /// Number of live (undisposed) effects.
    pub fn effect_count(&self) -> usize {
        self.inner.effects.borrow().len()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", self.config())
            .field("source_count", &self.source_count())
            .field("effect_count", &self.effect_count())
            .finish()
    }
}
