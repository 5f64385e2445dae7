//! Integration Tests for Reactive System
//!
//! These tests verify that reactive objects, refs, effects and computeds work
//! together correctly.

use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use ripple_core::{PropertyKey, ReactiveError, ReactiveProxy, Runtime, RuntimeConfig};
use serde_json::json;

fn number(proxy: &ReactiveProxy, key: &str) -> f64 {
    proxy.get_as::<f64>(key).unwrap().unwrap_or_default()
}

fn counter() -> Rc<Cell<usize>> {
    Rc::new(Cell::new(0))
}

fn bump(count: &Cell<usize>) {
    count.set(count.get() + 1);
}

/// Effect keeps a total in sync with two fields.
#[test]
fn effect_tracks_product_total() {
    let rt = Runtime::new();
    let product = rt.reactive(json!({"price": 5, "quantity": 2})).unwrap();
    let total = Rc::new(Cell::new(0.0));

    {
        let (product, total) = (product.clone(), Rc::clone(&total));
        rt.effect(move || total.set(number(&product, "price") * number(&product, "quantity")))
            .unwrap();
    }
    assert_eq!(total.get(), 10.0);

    product.set("quantity", 3).unwrap();
    assert_eq!(total.get(), 15.0);

    product.set("price", 10).unwrap();
    assert_eq!(total.get(), 30.0);
}

/// Two computeds over the same object update independently.
#[test]
fn computed_sale_price_and_total() {
    let rt = Runtime::new();
    let product = rt.reactive(json!({"price": 5, "quantity": 2})).unwrap();

    let sale = {
        let product = product.clone();
        rt.computed(move || number(&product, "price") * 0.9).unwrap()
    };
    let total = {
        let product = product.clone();
        rt.computed(move || number(&product, "price") * number(&product, "quantity"))
            .unwrap()
    };
    assert_eq!(total.get(), 10.0);
    assert_eq!(sale.get(), 4.5);

    product.set("quantity", 3).unwrap();
    assert_eq!(total.get(), 15.0);
    assert_eq!(sale.get(), 4.5);

    product.set("price", 10).unwrap();
    assert_eq!(total.get(), 30.0);
    assert_eq!(sale.get(), 9.0);
}

/// Writing the value a ref already holds invokes nobody.
#[test]
fn same_value_ref_write_is_silent() {
    let rt = Runtime::new();
    let value = rt.create_ref(0);
    let runs = counter();
    {
        let (value, runs) = (value.clone(), Rc::clone(&runs));
        rt.effect(move || {
            value.get();
            bump(&runs);
        })
        .unwrap();
    }
    let before = runs.get();

    value.set(0).unwrap();
    assert_eq!(runs.get(), before);
}

/// Structurally identical objects never share subscribers.
#[test]
fn identical_objects_do_not_cross_trigger() {
    let rt = Runtime::new();
    let left = rt.reactive(json!({})).unwrap();
    let right = rt.reactive(json!({})).unwrap();
    let (left_runs, right_runs) = (counter(), counter());

    for (proxy, runs) in [(&left, &left_runs), (&right, &right_runs)] {
        let (proxy, runs) = (proxy.clone(), Rc::clone(runs));
        rt.effect(move || {
            proxy.get("name");
            bump(&runs);
        })
        .unwrap();
    }

    left.set("name", "kobe").unwrap();
    assert_eq!(left_runs.get(), 2);
    assert_eq!(right_runs.get(), 1);

    right.set("name", "kobe").unwrap();
    assert_eq!(left_runs.get(), 2);
    assert_eq!(right_runs.get(), 2);
}

/// Each differing write re-runs a reading effect exactly once.
#[test]
fn each_change_reruns_exactly_once() {
    let rt = Runtime::new();
    let value = rt.create_ref(0);
    let runs = counter();
    {
        let (value, runs) = (value.clone(), Rc::clone(&runs));
        rt.effect(move || {
            // Reading twice must not subscribe twice
            value.get();
            value.get();
            bump(&runs);
        })
        .unwrap();
    }

    for next in 1..=5 {
        value.set(next).unwrap();
        assert_eq!(runs.get(), 1 + next as usize);
    }
    assert_eq!(rt.subscriber_count(value.source_id(), &PropertyKey::VALUE), 1);
}

/// An effect whose body synchronously runs another effect resumes being the
/// active subscriber afterwards.
#[test]
fn outer_effect_resumes_tracking_after_nested_run() {
    let rt = Runtime::new();
    let state = rt.reactive(json!({"a": 1, "b": 0, "c": 0})).unwrap();
    let (outer_runs, inner_runs) = (counter(), counter());

    let inner = {
        let (state, runs) = (state.clone(), Rc::clone(&inner_runs));
        rt.effect(move || {
            state.get("b");
            bump(&runs);
        })
        .unwrap()
    };
    let outer = {
        let (state, runs) = (state.clone(), Rc::clone(&outer_runs));
        rt.effect(move || {
            let a = number(&state, "a");
            state.set("b", a * 10.0).unwrap();
            state.get("c");
            bump(&runs);
        })
        .unwrap()
    };
    assert_eq!(inner_runs.get(), 2);
    assert_eq!(outer_runs.get(), 1);

    let c = PropertyKey::from("c");
    assert_eq!(rt.subscriber_count(state.source_id(), &c), 1);
    assert_eq!(inner.dependency_count(), 1);
    assert_eq!(outer.dependency_count(), 2);

    state.set("c", 1).unwrap();
    assert_eq!(outer_runs.get(), 2);
    assert_eq!(inner_runs.get(), 2);
}

/// Computed values equal their getter after every dependency write.
#[test]
fn computed_matches_getter_after_every_write() {
    let rt = Runtime::new();
    let a = rt.create_ref(1i64);
    let b = rt.create_ref(2i64);
    let getter = {
        let (a, b) = (a.clone(), b.clone());
        move || a.get() * 100 + b.get()
    };
    let derived = rt.computed(getter.clone()).unwrap();

    for (x, y) in [(3, 4), (3, 9), (-2, 9), (7, 0)] {
        a.set(x).unwrap();
        assert_eq!(derived.get(), getter());
        b.set(y).unwrap();
        assert_eq!(derived.get(), getter());
    }
}

/// An effect reading a ref that a later effect writes terminates, in either
/// creation order, and stays consistent.
#[test]
fn ref_written_by_later_effect_terminates() {
    for reader_first in [true, false] {
        let rt = Runtime::new();
        let product = rt.reactive(json!({"price": 5, "quantity": 2})).unwrap();
        let sale_price = rt.create_ref(0.0);
        let total = Rc::new(Cell::new(0.0));

        let reader = {
            let (product, sale_price, total) = (product.clone(), sale_price.clone(), Rc::clone(&total));
            move || total.set(sale_price.get() * number(&product, "quantity"))
        };
        let writer = {
            let (product, sale_price) = (product.clone(), sale_price.clone());
            move || {
                sale_price.set(number(&product, "price") * 0.9).unwrap();
            }
        };

        if reader_first {
            rt.effect(reader).unwrap();
            rt.effect(writer).unwrap();
        } else {
            rt.effect(writer).unwrap();
            rt.effect(reader).unwrap();
        }
        assert_eq!(total.get(), 9.0);

        product.set("quantity", 3).unwrap();
        assert_eq!(total.get(), 13.5);

        product.set("price", 10).unwrap();
        assert_eq!(total.get(), 27.0);
    }
}

/// A subscriber added during a trigger is not invoked by that trigger.
#[test]
fn subscription_during_trigger_waits_for_next_write() {
    let rt = Runtime::new();
    let flag = rt.create_ref(false);
    let late_runs = counter();

    {
        let (rt2, flag2, late_runs) = (rt.clone(), flag.clone(), Rc::clone(&late_runs));
        rt.effect(move || {
            if flag2.get() {
                let (flag3, late_runs) = (flag2.clone(), Rc::clone(&late_runs));
                rt2.effect(move || {
                    flag3.get();
                    bump(&late_runs);
                })
                .unwrap();
            }
        })
        .unwrap();
    }

    flag.set(true).unwrap();
    // Ran once on creation inside the trigger, not again from the snapshot
    assert_eq!(late_runs.get(), 1);
    assert_eq!(rt.subscriber_count(flag.source_id(), &PropertyKey::VALUE), 2);
}

/// An effect that writes what it reads fails with a bounded recursion
/// instead of looping forever.
#[test]
fn self_feeding_effect_hits_recursion_limit() {
    let rt = Runtime::with_config(RuntimeConfig::default().with_max_effect_depth(5)).unwrap();
    let value = rt.create_ref(0);

    let result = {
        let value = value.clone();
        rt.effect(move || {
            let next = value.get() + 1;
            // The failure surfaces from the outermost operation
            let _ = value.set(next);
        })
    };

    match result {
        Err(ReactiveError::RecursionLimitExceeded { limit, .. }) => assert_eq!(limit, 5),
        other => panic!("expected recursion error, got {other:?}"),
    }
    assert_eq!(value.get(), 5);
    assert_eq!(rt.effect_count(), 0);

    // The runtime is usable afterwards
    value.set(100).unwrap();
    assert_eq!(value.get(), 100);
}

/// Two effects feeding each other are caught at the outermost write.
#[test]
fn mutual_recursion_surfaces_from_outer_write() {
    let rt = Runtime::with_config(RuntimeConfig::default().with_max_effect_depth(4)).unwrap();
    let ping = rt.create_ref(0);
    let pong = rt.create_ref(0);

    {
        let (ping, pong) = (ping.clone(), pong.clone());
        rt.effect(move || {
            let _ = pong.set(ping.get() + 1);
        })
        .unwrap();
    }
    {
        let (ping, pong) = (ping.clone(), pong.clone());
        let armed = Rc::new(Cell::new(false));
        rt.effect(move || {
            let next = pong.get() + 1;
            if armed.replace(true) {
                let _ = ping.set(next);
            }
        })
        .unwrap();
    }

    let err = ping.set(10).unwrap_err();
    assert!(matches!(err, ReactiveError::RecursionLimitExceeded { limit: 4, .. }));
}

/// A panicking effect leaves the tracking stack intact for its caller.
#[test]
fn panicking_effect_does_not_corrupt_tracking() {
    let rt = Runtime::new();
    let trap = rt.create_ref(0);
    let seen = rt.create_ref(0);
    let runs = counter();

    {
        let trap = trap.clone();
        rt.effect(move || {
            if trap.get() > 0 {
                panic!("boom");
            }
        })
        .unwrap();
    }

    let result = catch_unwind(AssertUnwindSafe(|| trap.set(1)));
    assert!(result.is_err());
    assert!(!rt.is_tracking());

    {
        let (seen, runs) = (seen.clone(), Rc::clone(&runs));
        rt.effect(move || {
            seen.get();
            bump(&runs);
        })
        .unwrap();
    }
    seen.set(1).unwrap();
    assert_eq!(runs.get(), 2);
}

/// Disposing inside a trigger stops later subscribers in the same snapshot.
#[test]
fn effect_disposed_mid_trigger_is_skipped() {
    let rt = Runtime::new();
    let source = rt.create_ref(0);
    let victim_runs = counter();
    let victim: Rc<RefCell<Option<ripple_core::Effect>>> = Rc::new(RefCell::new(None));

    {
        let (source, victim) = (source.clone(), Rc::clone(&victim));
        rt.effect(move || {
            if source.get() > 0 {
                if let Some(effect) = victim.borrow().as_ref() {
                    effect.dispose();
                }
            }
        })
        .unwrap();
    }
    let handle = {
        let (source, runs) = (source.clone(), Rc::clone(&victim_runs));
        rt.effect(move || {
            source.get();
            bump(&runs);
        })
        .unwrap()
    };
    *victim.borrow_mut() = Some(handle.clone());

    source.set(1).unwrap();
    assert!(handle.is_disposed());
    assert_eq!(victim_runs.get(), 1);
}

/// Runtimes are isolated from each other.
#[test]
fn runtimes_do_not_share_state() {
    let first = Runtime::new();
    let second = Runtime::new();
    let value = first.create_ref(1);
    let runs = counter();

    {
        let (value, runs) = (value.clone(), Rc::clone(&runs));
        second
            .effect(move || {
                value.get();
                bump(&runs);
            })
            .unwrap();
    }

    // Read under `second`'s effect, but `value` belongs to `first`
    value.set(2).unwrap();
    assert_eq!(runs.get(), 1);
    assert_eq!(second.source_count(), 0);
}
