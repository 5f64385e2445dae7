//! Reactive Proxy
//!
//! A ReactiveProxy wraps a structured value (a JSON object or array) and
//! routes every field access through `get`/`set`:
//!
//! - `get(key)` reads the field and subscribes the running effect to
//!   `(proxy, key)`, even when the field is absent, so a later insertion
//!   notifies it.
//! - `set(key, value)` is a no-op when the stored value is [`SameValue`] as
//!   the new one. Otherwise it stores the value and triggers `(proxy, key)`.
//!
//! Fields hold JSON, which has no NaN or infinities. Writing a non-finite
//! float fails with [`ReactiveError::InvalidArgument`] and leaves the field
//! untouched; keep such values in a [`Ref`](super::Ref) instead.
//!
//! Every field is tracked separately: an effect that reads only `price` is
//! not re-run by a write to `quantity`.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::runtime::{Runtime, RuntimeInner};
use super::value::{to_finite_value, IntoValue};
use super::{PropertyKey, SameValue, SourceId};
use crate::error::{ReactiveError, Result};

struct ProxyInner {
    id: SourceId,
    target: RefCell<Value>,
    runtime: Weak<RuntimeInner>,
}

impl Drop for ProxyInner {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.forget_source(self.id);
        }
    }
}

/// A structured value whose fields are tracked individually.
///
/// Clones share the target and the identity. Wrapping an equal value twice
/// produces two unrelated sources.
#[derive(Clone)]
pub struct ReactiveProxy {
    inner: Rc<ProxyInner>,
}

impl ReactiveProxy {
    /// Wrap `target`, which must be a JSON object or array.
    pub fn new(runtime: &Runtime, target: Value) -> Result<Self> {
        if !matches!(target, Value::Object(_) | Value::Array(_)) {
            return Err(ReactiveError::invalid(format!(
                "reactive() needs an object or array, got {}",
                kind(&target)
            )));
        }

        Ok(Self {
            inner: Rc::new(ProxyInner {
                id: SourceId::new(),
                target: RefCell::new(target),
                runtime: runtime.downgrade(),
            }),
        })
    }

    /// Serialize `value` and wrap the result.
    ///
    /// Fails if `value` contains a non-finite float.
    pub fn from_serialize<T: Serialize + ?Sized>(runtime: &Runtime, value: &T) -> Result<Self> {
        Self::new(runtime, to_finite_value(value)?)
    }

    /// Get the proxy's identity.
    pub fn source_id(&self) -> SourceId {
        self.inner.id
    }

    /// Read a field, subscribing the running effect to it.
    pub fn get(&self, key: impl Into<PropertyKey>) -> Option<Value> {
        let key = key.into();
        let value = lookup(&self.inner.target.borrow(), &key).cloned();
        self.track(key);
        value
    }

    /// Read a field and deserialize it.
    ///
    /// An absent field is `Ok(None)`; a field of the wrong shape is a
    /// [`ReactiveError::Conversion`].
    pub fn get_as<T: DeserializeOwned>(&self, key: impl Into<PropertyKey>) -> Result<Option<T>> {
        self.get(key)
            .map(serde_json::from_value)
            .transpose()
            .map_err(ReactiveError::from)
    }

    /// Check whether a field is present, subscribing the running effect to it.
    pub fn contains_key(&self, key: impl Into<PropertyKey>) -> bool {
        let key = key.into();
        let present = lookup(&self.inner.target.borrow(), &key).is_some();
        self.track(key);
        present
    }

    /// Read a field without tracking dependencies.
    pub fn get_untracked(&self, key: impl Into<PropertyKey>) -> Option<Value> {
        lookup(&self.inner.target.borrow(), &key.into()).cloned()
    }

    /// Write a field and notify its subscribers, unless the value is unchanged.
    ///
    /// Named keys address objects and index keys address arrays; writing
    /// one past the end of an array appends. Non-finite floats are
    /// rejected.
    pub fn set(&self, key: impl Into<PropertyKey>, value: impl IntoValue) -> Result<()> {
        let key = key.into();
        let value = value.into_value()?;
        let changed = write(&mut self.inner.target.borrow_mut(), &key, value)?;
        if !changed {
            return Ok(());
        }

        match self.inner.runtime.upgrade() {
            Some(runtime) => runtime.trigger(self.inner.id, &key),
            None => Ok(()),
        }
    }

    /// Serialize `value` and [`set`](Self::set) it.
    pub fn set_as<T: Serialize + ?Sized>(&self, key: impl Into<PropertyKey>, value: &T) -> Result<()> {
        self.set(key, to_finite_value(value)?)
    }

    /// Copy the whole target without tracking dependencies.
    pub fn snapshot(&self) -> Value {
        self.inner.target.borrow().clone()
    }

    /// Deserialize the whole target without tracking dependencies.
    pub fn snapshot_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.snapshot())?)
    }

    fn track(&self, key: PropertyKey) {
        if let Some(runtime) = self.inner.runtime.upgrade() {
            runtime.track(self.inner.id, key);
        }
    }
}

impl fmt::Debug for ReactiveProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveProxy")
            .field("id", &self.inner.id)
            .field("target", &*self.inner.target.borrow())
            .finish()
    }
}

fn lookup<'a>(target: &'a Value, key: &PropertyKey) -> Option<&'a Value> {
    match (target, key) {
        (Value::Object(map), PropertyKey::Named(name)) => map.get(&**name),
        (Value::Array(items), PropertyKey::Index(index)) => items.get(*index),
        _ => None,
    }
}

/// Store `value` under `key`. Returns whether anything changed.
fn write(target: &mut Value, key: &PropertyKey, value: Value) -> Result<bool> {
    match (target, key) {
        (Value::Object(map), PropertyKey::Named(name)) => {
            if map.get(&**name).is_some_and(|current| current.same_value(&value)) {
                return Ok(false);
            }
            map.insert(name.to_string(), value);
            Ok(true)
        }
        (Value::Array(items), PropertyKey::Index(index)) => {
            let (index, len) = (*index, items.len());
            if index < len {
                if items[index].same_value(&value) {
                    return Ok(false);
                }
                items[index] = value;
                Ok(true)
            } else if index == len {
                items.push(value);
                Ok(true)
            } else {
                Err(ReactiveError::invalid(format!(
                    "index {index} is out of bounds for an array of length {len}"
                )))
            }
        }
        (target, key) => Err(ReactiveError::invalid(format!(
            "key {key} cannot address an {}",
            kind(target)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
