//! Computed Implementation
//!
//! A Computed is a read-only ref whose value is written only by an effect it
//! owns. The effect evaluates the getter and stores the result, so:
//!
//! 1. The getter runs once when the computed is created.
//!
//! 2. Whenever a dependency read by the getter changes, the owned effect
//!    re-runs before the triggering write returns. Recomputation is eager;
//!    there is no dirty flag and no deferred evaluation.
//!
//! 3. The stored value is write-gated like any ref: if the getter produces
//!    the same value again, effects reading the computed are not re-run.
//!
//! Computeds chain naturally: a getter that reads another computed subscribes
//! to that computed's stored value.
//!
//! The owned effect lives as long as some handle to the computed does. When
//! the last clone is dropped the effect is disposed, releasing the getter and
//! everything it captured.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use super::refs::Readable;
use super::{Effect, Ref, Runtime, SameValue, SourceId};
use crate::error::{ReactiveError, Result};

struct ComputedInner<T> {
    /// Written only by `effect`.
    result: Ref<T>,
    effect: Effect,
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        self.effect.dispose();
    }
}

/// A derived, read-only reactive value.
///
/// # Type Parameters
///
/// - `T`: The type of the computed value. The [`SameValue`] bound lets the
///   stored value skip notifications when a recomputation yields the same
///   result.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Computed<T>
where
    T: SameValue + Clone + 'static,
{
    /// Evaluate `getter` now and keep the result current.
    pub fn new<F>(runtime: &Runtime, getter: F) -> Result<Self>
    where
        F: Fn() -> T + 'static,
    {
        // Filled by the first evaluation; the effect never holds the computed
        // itself, only its result ref.
        let slot: Rc<OnceCell<Ref<T>>> = Rc::new(OnceCell::new());
        let effect = {
            let (slot, owner) = (Rc::clone(&slot), runtime.downgrade());
            runtime.effect(move || {
                let value = getter();
                let Some(result) = slot.get() else {
                    let _ = slot.set(Ref::with_runtime(owner.clone(), value));
                    return;
                };
                // A failed write is already recorded on the runtime and
                // surfaces from the outermost operation.
                if let Err(err) = result.set(value) {
                    tracing::debug!(%err, source = %result.source_id(), "computed update interrupted");
                }
            })?
        };

        let Some(result) = slot.get().cloned() else {
            effect.dispose();
            return Err(ReactiveError::invalid("computed getter produced no value"));
        };

        Ok(Self {
            inner: Rc::new(ComputedInner { result, effect }),
        })
    }

    /// Get the latest value, subscribing the running effect.
    pub fn get(&self) -> T {
        self.inner.result.get()
    }

    /// Get the latest value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.result.get_untracked()
    }

    /// Get the computed's identity.
    pub fn source_id(&self) -> SourceId {
        self.inner.result.source_id()
    }

    /// Stop recomputing. The last value stays readable.
    pub fn dispose(&self) {
        self.inner.effect.dispose();
    }

    /// Check if the owned effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.effect.is_disposed()
    }

    /// Get the number of times the getter has been evaluated.
    pub fn evaluation_count(&self) -> usize {
        self.inner.effect.run_count()
    }
}

impl<T> Readable<T> for Computed<T>
where
    T: SameValue + Clone + 'static,
{
    fn get(&self) -> T {
        Computed::get(self)
    }

    fn get_untracked(&self) -> T {
        Computed::get_untracked(self)
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("result", &self.inner.result)
            .field("effect", &self.inner.effect)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
