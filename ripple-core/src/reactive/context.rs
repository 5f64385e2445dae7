//! Tracking Context
//!
//! The tracking context records which computation is currently running, so
//! that a read can subscribe that computation to what it read.
//!
//! # Implementation
//!
//! Each runtime owns a stack of running effects. Running an effect pushes its
//! ID; the returned guard pops it when dropped, including during a panic
//! unwind. The top of the stack is the implicit subscriber for any read.
//!
//! A stack rather than a single slot is what makes nesting work: when an
//! effect's write synchronously runs another effect, the inner effect sees
//! itself as active, and the outer effect becomes active again once the inner
//! one returns.

use std::cell::RefCell;

use smallvec::SmallVec;

use super::SubscriberId;

/// The stack of computations currently executing on this runtime.
#[derive(Debug, Default)]
pub struct TrackingContext {
    stack: RefCell<SmallVec<[SubscriberId; 8]>>,
}

impl TrackingContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `subscriber` the active computation until the guard is dropped.
    pub fn enter(&self, subscriber: SubscriberId) -> ActiveComputation<'_> {
        self.stack.borrow_mut().push(subscriber);
        ActiveComputation {
            context: self,
            subscriber,
        }
    }

    /// Run `body` with `subscriber` active, restoring the previous state on
    /// every exit path.
    pub fn run_as_active<R>(&self, subscriber: SubscriberId, body: impl FnOnce() -> R) -> R {
        let _active = self.enter(subscriber);
        body()
    }

    /// Check if any computation is running.
    pub fn is_active(&self) -> bool {
        !self.stack.borrow().is_empty()
    }

    /// The computation that would be subscribed by a read right now.
    pub fn current(&self) -> Option<SubscriberId> {
        self.stack.borrow().last().copied()
    }

    /// Number of computations on the stack.
    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }
}

/// Guard that pops the active computation when dropped.
pub struct ActiveComputation<'a> {
    context: &'a TrackingContext,
    subscriber: SubscriberId,
}

impl ActiveComputation<'_> {
    /// The computation this guard made active.
    pub fn subscriber(&self) -> SubscriberId {
        self.subscriber
    }
}

impl Drop for ActiveComputation<'_> {
    fn drop(&mut self) {
        let popped = self.context.stack.borrow_mut().pop();

        debug_assert_eq!(
            popped,
            Some(self.subscriber),
            "tracking context mismatch: expected {}, got {:?}",
            self.subscriber,
            popped
        );
    }
}
