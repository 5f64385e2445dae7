//! Ref Implementation
//!
//! A Ref boxes a single value behind one synthetic key,
//! [`PropertyKey::VALUE`]. It gives values with no fields of their own
//! (numbers, strings, flags) the same track/trigger contract as a field of a
//! [`ReactiveProxy`](super::ReactiveProxy):
//!
//! - reading inside an effect subscribes the effect;
//! - writing a value that is not [`SameValue`] as the stored one stores it
//!   and runs every subscriber before returning;
//! - writing the same value does nothing.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::runtime::{Runtime, RuntimeInner};
use super::{PropertyKey, SameValue, SourceId};
use crate::error::{ReactiveError, Result};

/// Read access shared by [`Ref`] and [`Computed`](super::Computed).
pub trait Readable<T> {
    /// Read the value, subscribing the running effect.
    fn get(&self) -> T;

    /// Read the value without subscribing anything.
    fn get_untracked(&self) -> T;
}

struct RefInner<T> {
    id: SourceId,
    value: RefCell<T>,
    runtime: Weak<RuntimeInner>,
}

impl<T> Drop for RefInner<T> {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.forget_source(self.id);
        }
    }
}

/// A reactive single-value box.
///
/// Clones share the value and the identity.
///
/// ```rust
/// use ripple_core::Runtime;
///
/// let rt = Runtime::new();
/// let count = rt.create_ref(0);
///
/// count.set(42).unwrap();
/// assert_eq!(count.get(), 42);
///
/// count.update(|v| v + 1).unwrap();
/// assert_eq!(count.get(), 43);
/// ```
pub struct Ref<T> {
    inner: Rc<RefInner<T>>,
}

impl<T: 'static> Ref<T> {
    /// Create a ref owned by no one but its handles, tracked by `runtime`.
    pub fn new(runtime: &Runtime, value: T) -> Self {
        Self::with_runtime(runtime.downgrade(), value)
    }

    pub(crate) fn with_runtime(runtime: Weak<RuntimeInner>, value: T) -> Self {
        Self {
            inner: Rc::new(RefInner {
                id: SourceId::new(),
                value: RefCell::new(value),
                runtime,
            }),
        }
    }

    /// Get the ref's identity.
    pub fn source_id(&self) -> SourceId {
        self.inner.id
    }

    /// Borrow the value, subscribing the running effect.
    ///
    /// Writing to this ref from inside `f`, directly or through an effect,
    /// fails with [`ReactiveError::Borrowed`].
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    fn track(&self) {
        if let Some(runtime) = self.inner.runtime.upgrade() {
            runtime.track(self.inner.id, PropertyKey::VALUE);
        }
    }
}

impl<T: Clone + 'static> Ref<T> {
    /// Get the current value, subscribing the running effect.
    pub fn get(&self) -> T {
        self.track();
        self.inner.value.borrow().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

impl<T: SameValue + 'static> Ref<T> {
    /// Store `value` and notify subscribers, unless it is the same value.
    pub fn set(&self, value: T) -> Result<()> {
        let previous = {
            let Ok(mut current) = self.inner.value.try_borrow_mut() else {
                return Err(ReactiveError::Borrowed {
                    source: self.inner.id,
                });
            };
            if current.same_value(&value) {
                return Ok(());
            }
            std::mem::replace(&mut *current, value)
        };
        drop(previous);

        match self.inner.runtime.upgrade() {
            Some(runtime) => runtime.trigger(self.inner.id, &PropertyKey::VALUE),
            None => Ok(()),
        }
    }

    /// Compute a new value from the current one and [`set`](Self::set) it.
    ///
    /// The read is untracked. Writing to this ref from inside `f` fails
    /// with [`ReactiveError::Borrowed`].
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> Result<()> {
        let next = f(&self.inner.value.borrow());
        self.set(next)
    }
}

impl<T: Clone + 'static> Readable<T> for Ref<T> {
    fn get(&self) -> T {
        Ref::get(self)
    }

    fn get_untracked(&self) -> T {
        Ref::get_untracked(self)
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn observe(rt: &Runtime, source: &Ref<f64>) -> Rc<Cell<usize>> {
        let runs = Rc::new(Cell::new(0));
        let (source, counter) = (source.clone(), Rc::clone(&runs));
        rt.effect(move || {
            source.get();
            counter.set(counter.get() + 1);
        })
        .unwrap();
        runs
    }

    #[test]
    fn ref_get_and_set() {
        let rt = Runtime::new();
        let value = rt.create_ref(0);
        assert_eq!(value.get(), 0);

        value.set(42).unwrap();
        assert_eq!(value.get(), 42);
    }

    #[test]
    fn ref_update() {
        let rt = Runtime::new();
        let value = rt.create_ref(10);
        value.update(|v| v + 5).unwrap();
        assert_eq!(value.get(), 15);
    }

    #[test]
    fn ref_notifies_subscribers_once_per_change() {
        let rt = Runtime::new();
        let value = rt.create_ref(0.0);
        let runs = observe(&rt, &value);
        assert_eq!(runs.get(), 1);

        value.set(1.0).unwrap();
        assert_eq!(runs.get(), 2);

        value.set(2.0).unwrap();
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn same_value_write_is_silent() {
        let rt = Runtime::new();
        let value = rt.create_ref(0.0);
        let runs = observe(&rt, &value);

        value.set(0.0).unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn repeated_nan_writes_trigger_once() {
        let rt = Runtime::new();
        let value = rt.create_ref(0.0);
        let runs = observe(&rt, &value);

        value.set(f64::NAN).unwrap();
        value.set(f64::NAN).unwrap();
        value.set(f64::NAN).unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn untracked_reads_do_not_subscribe() {
        let rt = Runtime::new();
        let value = rt.create_ref(1);
        let runs = Rc::new(Cell::new(0));
        {
            let (value, runs) = (value.clone(), Rc::clone(&runs));
            rt.effect(move || {
                value.get_untracked();
                runs.set(runs.get() + 1);
            })
            .unwrap();
        }

        value.set(2).unwrap();
        assert_eq!(runs.get(), 1);
        assert_eq!(rt.subscriber_count(value.source_id(), &PropertyKey::VALUE), 0);
    }

    #[test]
    fn with_borrows_and_tracks() {
        let rt = Runtime::new();
        let name = rt.create_ref(String::from("kobe"));
        let length = Rc::new(Cell::new(0));
        {
            let (name, length) = (name.clone(), Rc::clone(&length));
            rt.effect(move || length.set(name.with(String::len))).unwrap();
        }
        assert_eq!(length.get(), 4);

        name.set(String::from("jordan")).unwrap();
        assert_eq!(length.get(), 6);
    }

    #[test]
    fn write_during_with_is_an_error() {
        let rt = Runtime::new();
        let value = rt.create_ref(1);

        let err = value.with(|_| value.set(2)).unwrap_err();
        assert_eq!(
            err,
            ReactiveError::Borrowed {
                source: value.source_id()
            }
        );
        assert_eq!(value.get(), 1);

        value
            .update(|v| {
                assert!(value.set(v + 5).is_err());
                v + 1
            })
            .unwrap();
        assert_eq!(value.get(), 2);
    }

    #[test]
    fn write_from_effect_inside_with_is_an_error() {
        let rt = Runtime::new();
        let value = rt.create_ref(0);
        let trigger = rt.create_ref(false);
        let outcome = Rc::new(RefCell::new(None));
        {
            let (value, trigger, outcome) = (value.clone(), trigger.clone(), Rc::clone(&outcome));
            rt.effect(move || {
                if trigger.get() {
                    *outcome.borrow_mut() = Some(value.set(10));
                }
            })
            .unwrap();
        }

        value.with(|_| trigger.set(true)).unwrap();
        assert!(matches!(
            *outcome.borrow(),
            Some(Err(ReactiveError::Borrowed { .. }))
        ));
        assert_eq!(value.get(), 0);
    }

    #[test]
    fn ref_clone_shares_state() {
        let rt = Runtime::new();
        let ref1 = rt.create_ref(0);
        let ref2 = ref1.clone();

        ref1.set(42).unwrap();
        assert_eq!(ref2.get(), 42);
        assert_eq!(ref1.source_id(), ref2.source_id());
    }

    #[test]
    fn dropping_ref_forgets_its_entry() {
        let rt = Runtime::new();
        let value = rt.create_ref(0);
        let effect = {
            let value = value.clone();
            rt.effect(move || {
                value.get();
            })
            .unwrap()
        };
        assert_eq!(rt.source_count(), 1);

        // The effect closure still holds a clone; disposing releases it
        drop(value);
        assert_eq!(rt.source_count(), 1);
        effect.dispose();
        assert_eq!(rt.source_count(), 0);
    }

    #[test]
    fn ref_outliving_runtime_is_plain() {
        let rt = Runtime::new();
        let value = rt.create_ref(1);
        drop(rt);

        value.set(2).unwrap();
        assert_eq!(value.get(), 2);
    }
}
