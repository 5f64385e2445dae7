//! Ripple Core
//!
//! This crate provides a fine-grained reactive dependency-tracking engine,
//! the substrate a declarative UI layer builds automatic re-rendering and
//! derived state on. It implements:
//!
//! - Reactive objects whose fields are tracked individually
//! - Refs for single values
//! - Effects that re-run when anything they read changes
//! - Computed values kept current by an owned effect
//!
//! # Architecture
//!
//! - `reactive`: the primitives and the dependency bookkeeping behind them
//! - `config`: runtime tunables
//! - `error`: the error type shared by every fallible operation
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use ripple_core::Runtime;
//! use serde_json::json;
//!
//! let rt = Runtime::new();
//! let product = rt.reactive(json!({ "price": 5, "quantity": 2 })).unwrap();
//!
//! // An effect that keeps `total` in sync
//! let total = Rc::new(Cell::new(0.0));
//! {
//!     let (product, total) = (product.clone(), total.clone());
//!     rt.effect(move || {
//!         let price: f64 = product.get_as("price").unwrap().unwrap_or_default();
//!         let quantity: f64 = product.get_as("quantity").unwrap().unwrap_or_default();
//!         total.set(price * quantity);
//!     })
//!     .unwrap();
//! }
//! assert_eq!(total.get(), 10.0);
//!
//! // Writing a field re-runs the effect before `set` returns
//! product.set("quantity", 3).unwrap();
//! assert_eq!(total.get(), 15.0);
//! ```

pub mod config;
pub mod error;
pub mod reactive;

pub use config::RuntimeConfig;
pub use error::{ReactiveError, Result};
pub use reactive::{
    Computed, Effect, IntoValue, PropertyKey, ReactiveProxy, Readable, Ref, Runtime, SameValue,
    SourceId, SubscriberId,
};
