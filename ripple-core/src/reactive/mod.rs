//! Reactive Primitives
//!
//! This module implements the core reactive system: reactive objects, refs,
//! effects and computed values, plus the bookkeeping that connects them.
//!
//! # Concepts
//!
//! ## Reactive objects and refs
//!
//! A [`ReactiveProxy`] wraps a structured value and tracks each field on its
//! own. A [`Ref`] boxes a single value behind one synthetic key. Reading
//! either inside an effect subscribes the effect; writing a different value
//! re-runs every subscriber before the write returns.
//!
//! ## Effects
//!
//! An [`Effect`] runs once when created and again whenever something it read
//! changes. Effects synchronize reactive state with everything else.
//!
//! ## Computed values
//!
//! A [`Computed`] is a read-only ref kept current by an effect it owns.
//! Recomputation is eager: it happens during the write that invalidated it.
//!
//! # Implementation Notes
//!
//! All bookkeeping lives in an explicit [`Runtime`]: a registry mapping
//! `(source, key)` to subscribed effects, and a stack of running effects
//! whose top is the implicit subscriber of any read. The stack makes nested
//! effects safe, and triggers iterate over a copy of the subscriber set so
//! that subscriptions made during a trigger never extend it.
//!
//! Execution is single-threaded and synchronous; handles are `!Send`.

mod computed;
mod context;
mod effect;
mod equality;
mod proxy;
mod refs;
mod registry;
mod runtime;
mod subscriber;
mod value;

pub use computed::Computed;
pub use context::{ActiveComputation, TrackingContext};
pub use effect::Effect;
pub use equality::SameValue;
pub use proxy::ReactiveProxy;
pub use refs::{Readable, Ref};
pub use registry::{DependencyRegistry, SubscriberSnapshot};
pub use runtime::Runtime;
pub use subscriber::{PropertyKey, SourceId, SubscriberId};
pub use value::IntoValue;
