#![forbid(unsafe_code)]

//! Property-based invariant tests for observable and derived cells.
//!
//! These tests verify behavior that must hold for **any** sequence of writes:
//!
//! 1. Each subscriber sees the initial value, then exactly the effective
//!    changes, in order.
//! 2. All subscribers see each change, in registration order, before the next
//!    change is delivered.
//! 3. Start/stop hooks run once per 0 -> 1 / 1 -> 0 subscriber transition.
//! 4. A two-source derived cell always equals `f(a, b)` and recomputes at
//!    most once per effective source change.
//! 5. NaN writes over NaN are never effective.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cartkit_runtime::reactive::{Observable, StopHook, Subscription, derived2};
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────

/// Small value domain so repeated (no-op) writes are common.
fn writes() -> impl Strategy<Value = Vec<i32>> {
    proptest::collection::vec(0i32..5, 0..60)
}

/// Subscribe (`true`) / unsubscribe-oldest (`false`) operations.
fn lifecycle_ops() -> impl Strategy<Value = Vec<bool>> {
    proptest::collection::vec(any::<bool>(), 0..80)
}

fn float_writes() -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(
        prop_oneof![Just(f64::NAN), Just(0.0), Just(1.5), -10.0f64..10.0],
        0..40,
    )
}

// ── Helpers ─────────────────────────────────────────────────────────────

/// Initial value followed by every write that differs from its predecessor.
fn effective(initial: i32, writes: &[i32]) -> Vec<i32> {
    let mut out = vec![initial];
    let mut current = initial;
    for &w in writes {
        if w != current {
            out.push(w);
            current = w;
        }
    }
    out
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Exactly the effective changes
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn subscriber_sees_exactly_effective_changes(initial in 0i32..5, seq in writes()) {
        let cell = Observable::new(initial);
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let _sub = cell.subscribe(move |v: &i32| sink.borrow_mut().push(*v));

        for &w in &seq {
            cell.set(w);
        }
        prop_assert_eq!(log.borrow().clone(), effective(initial, &seq));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Registration order across subscribers
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn subscribers_notified_in_registration_order(seq in writes(), count in 1usize..5) {
        let cell = Observable::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));
        let subs: Vec<Subscription> = (0..count)
            .map(|idx| {
                let sink = Rc::clone(&log);
                cell.subscribe(move |v: &i32| sink.borrow_mut().push((idx, *v)))
            })
            .collect();
        log.borrow_mut().clear();

        for &w in &seq {
            cell.set(w);
        }

        let expected: Vec<(usize, i32)> = effective(0, &seq)
            .into_iter()
            .skip(1)
            .flat_map(|v| (0..count).map(move |idx| (idx, v)))
            .collect();
        prop_assert_eq!(log.borrow().clone(), expected);
        drop(subs);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Start/stop pairing
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn start_stop_track_transitions(ops in lifecycle_ops()) {
        let starts = Rc::new(Cell::new(0usize));
        let stops = Rc::new(Cell::new(0usize));
        let (s, t) = (Rc::clone(&starts), Rc::clone(&stops));
        let cell = Observable::with_start(0, move |_| {
            s.set(s.get() + 1);
            let t = Rc::clone(&t);
            Some(Box::new(move || t.set(t.get() + 1)) as StopHook)
        });

        let mut held: Vec<Subscription> = Vec::new();
        let (mut expected_starts, mut expected_stops) = (0usize, 0usize);
        for subscribe in ops {
            if subscribe {
                if held.is_empty() {
                    expected_starts += 1;
                }
                held.push(cell.subscribe(|_| {}));
            } else if !held.is_empty() {
                held.remove(0).unsubscribe();
                if held.is_empty() {
                    expected_stops += 1;
                }
            }
            prop_assert_eq!(cell.is_live(), !held.is_empty());
        }
        prop_assert_eq!(starts.get(), expected_starts);
        prop_assert_eq!(stops.get(), expected_stops);
        prop_assert_eq!(cell.subscriber_count(), held.len());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Derived consistency
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn derived_tracks_both_sources(ops in proptest::collection::vec((any::<bool>(), 0i32..5), 0..60)) {
        let a = Observable::new(0);
        let b = Observable::new(0);
        let runs = Rc::new(Cell::new(0usize));
        let counted = Rc::clone(&runs);
        let sum = derived2(&a, &b, move |x: &i32, y: &i32| {
            counted.set(counted.get() + 1);
            x * 10 + y
        });
        let _sub = sum.subscribe(|_| {});

        let (mut av, mut bv, mut changes) = (0, 0, 0usize);
        for (left, value) in ops {
            let target = if left { &mut av } else { &mut bv };
            if *target != value {
                changes += 1;
            }
            *target = value;
            if left { a.set(value) } else { b.set(value) }
            prop_assert_eq!(sum.get(), av * 10 + bv);
        }
        prop_assert_eq!(runs.get(), changes + 1);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. NaN-safe change detection
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn nan_over_nan_never_notifies(seq in float_writes()) {
        let cell = Observable::new(f64::NAN);
        let deliveries = Rc::new(Cell::new(0usize));
        let seen = Rc::clone(&deliveries);
        let _sub = cell.subscribe(move |_| seen.set(seen.get() + 1));

        let mut current = f64::NAN;
        let mut expected = 1usize;
        for &w in &seq {
            let same = w == current || (w.is_nan() && current.is_nan());
            if !same {
                expected += 1;
                current = w;
            }
            cell.set(w);
        }
        prop_assert_eq!(deliveries.get(), expected);
    }
}
