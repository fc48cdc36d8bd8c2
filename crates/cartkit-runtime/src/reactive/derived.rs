#![forbid(unsafe_code)]

//! Derived cells that recompute from one or more sources.
//!
//! # Design
//!
//! A [`Derived<T>`] is an [`Observable`] whose start hook subscribes to every
//! source. Each source subscription stores the delivered value in a slot and
//! clears that source's bit in a pending mask; the source's `on_invalidate`
//! sets the bit. Whenever a value arrives and no bit is set, the derivation
//! runs against the complete, fresh set of inputs.
//!
//! Two modes:
//!
//! - **Auto** ([`derived`], [`derived2`], [`derived3`], [`derived_all`]): the
//!   function maps input values to the output, which is `set` immediately.
//! - **Manual** ([`derived_with`], [`derived2_with`], [`derived_all_with`]):
//!   the function also receives a [`Setter`] and writes the output itself,
//!   now or later. It may return a [`Cleanup`] that runs before the next
//!   recomputation and when the cell stops.
//!
//! Nothing is computed until the first subscriber arrives, and the last
//! unsubscribe releases every source subscription.
//!
//! # Invariants
//!
//! 1. The derivation never runs while a source is invalidated but has not
//!    re-delivered (no half-updated input sets).
//! 2. While live, the value equals `f(inputs)` for the latest inputs.
//! 3. A manual cleanup runs exactly once per derivation run that returned
//!    one.
//!
//! # Failure Modes
//!
//! - **Empty source list**: [`derived_all`] / [`derived_all_with`] return
//!   [`ReactiveError::InvalidArgument`].
//! - **Derivation panics**: the notify queue is reset (see the scheduler);
//!   the cell keeps its previous value.
//! - **Another subscriber panics mid-cycle**: source values queued for this
//!   cell are replayed when the next notify cycle starts, so the pending
//!   mask clears and the value catches up with its inputs.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::equality::SafeEq;
use super::observable::{
    Cleanup, Observable, Readable, Setter, StopHook, Subscriber, Subscription,
};
use super::pending::PendingMask;
use crate::error::{ReactiveError, Result};

type SyncFn<V, T> = Box<dyn FnMut(&V, &Setter<T>) -> Option<Cleanup>>;
type Connector<V, T> = Box<dyn Fn(usize, Rc<Link<V, T>>) -> Subscription>;

/// State of one live period of a derived cell (start to stop).
struct Link<V, T> {
    /// Latest value delivered by each source.
    values: RefCell<V>,
    pending: RefCell<PendingMask>,
    /// False while the sources are still being subscribed.
    started: Cell<bool>,
    cleanup: RefCell<Option<Cleanup>>,
    sync: Rc<RefCell<SyncFn<V, T>>>,
    setter: Setter<T>,
}

impl<V: Clone + 'static, T: Clone + SafeEq + 'static> Link<V, T> {
    fn sync(&self) {
        if self.pending.borrow().any() {
            return;
        }
        let previous = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = previous {
            cleanup();
        }
        let values = self.values.borrow().clone();
        let cleanup = {
            let mut sync = self.sync.borrow_mut();
            (*sync)(&values, &self.setter)
        };
        *self.cleanup.borrow_mut() = cleanup;
        tracing::trace!(message = "derived.recompute");
    }

    fn stop(&self) {
        self.started.set(false);
        let cleanup = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }
}

/// Subscribe `source` into slot `index` of a link.
fn connect<S, R, V, T>(source: R, write: fn(&mut V, usize, S)) -> Connector<V, T>
where
    S: Clone + 'static,
    R: Readable<S> + 'static,
    V: Clone + 'static,
    T: Clone + SafeEq + 'static,
{
    Box::new(move |index, link: Rc<Link<V, T>>| {
        let delivered = Rc::clone(&link);
        source.subscribe_with(
            Subscriber::new(move |value: &S| {
                write(&mut delivered.values.borrow_mut(), index, value.clone());
                delivered.pending.borrow_mut().clear(index);
                if delivered.started.get() {
                    delivered.sync();
                }
            })
            .on_invalidate(move || link.pending.borrow_mut().mark(index))
            .replay_if_abandoned(),
        )
    })
}

fn build<V, T>(
    initial: T,
    slots: impl Fn() -> V + 'static,
    connectors: Vec<Connector<V, T>>,
    sync: SyncFn<V, T>,
) -> Derived<T>
where
    V: Clone + 'static,
    T: Clone + SafeEq + 'static,
{
    let sync = Rc::new(RefCell::new(sync));
    let cell = Observable::with_start(initial, move |setter| {
        let link = Rc::new(Link {
            values: RefCell::new(slots()),
            pending: RefCell::new(PendingMask::new(connectors.len())),
            started: Cell::new(false),
            cleanup: RefCell::new(None),
            sync: Rc::clone(&sync),
            setter,
        });
        let subscriptions: Vec<Subscription> = connectors
            .iter()
            .enumerate()
            .map(|(index, attach)| attach(index, Rc::clone(&link)))
            .collect();
        link.started.set(true);
        link.sync();
        tracing::debug!(message = "derived.start", sources = subscriptions.len());

        Some(Box::new(move || {
            drop(subscriptions);
            link.stop();
            tracing::debug!(message = "derived.stop");
        }) as StopHook)
    });
    Derived { cell }
}

/// A read-only cell computed from other cells.
///
/// Cloning a `Derived` creates a new handle to the **same** cell.
pub struct Derived<T> {
    cell: Observable<T>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Derived").field(&self.cell).finish()
    }
}

impl<T: Clone + SafeEq + 'static> Derived<T> {
    pub fn subscribe(&self, on_change: impl FnMut(&T) + 'static) -> Subscription {
        self.cell.subscribe(on_change)
    }

    pub fn subscribe_with(&self, subscriber: Subscriber<T>) -> Subscription {
        self.cell.subscribe_with(subscriber)
    }

    /// Current value. Starts and stops the cell once if nobody is
    /// subscribed, so the result is never stale.
    #[must_use]
    pub fn get(&self) -> T {
        self.cell.get()
    }

    /// Borrow the last published value without starting the cell.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with(f)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.cell.subscriber_count()
    }

    /// Whether the cell is currently subscribed to its sources.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.cell.is_live()
    }
}

impl<T: Clone + SafeEq + 'static> Readable<T> for Derived<T> {
    fn subscribe_with(&self, subscriber: Subscriber<T>) -> Subscription {
        self.cell.subscribe_with(subscriber)
    }

    fn get(&self) -> T {
        self.cell.get()
    }
}

/// Derive a value from one source.
pub fn derived<S, R, T>(source: &R, mut map: impl FnMut(&S) -> T + 'static) -> Derived<T>
where
    S: Clone + 'static,
    R: Readable<S> + Clone + 'static,
    T: Clone + SafeEq + Default + 'static,
{
    build(
        T::default(),
        || None::<S>,
        vec![connect(source.clone(), |slot: &mut Option<S>, _, v| {
            *slot = Some(v)
        })],
        Box::new(move |slot: &Option<S>, setter: &Setter<T>| -> Option<Cleanup> {
            if let Some(value) = slot {
                setter.set(map(value));
            }
            None
        }),
    )
}

/// Derive a value from one source, writing it through a [`Setter`].
pub fn derived_with<S, R, T>(
    source: &R,
    initial: T,
    mut run: impl FnMut(&S, &Setter<T>) -> Option<Cleanup> + 'static,
) -> Derived<T>
where
    S: Clone + 'static,
    R: Readable<S> + Clone + 'static,
    T: Clone + SafeEq + 'static,
{
    build(
        initial,
        || None::<S>,
        vec![connect(source.clone(), |slot: &mut Option<S>, _, v| {
            *slot = Some(v)
        })],
        Box::new(move |slot: &Option<S>, setter: &Setter<T>| -> Option<Cleanup> {
            slot.as_ref().and_then(|value| run(value, setter))
        }),
    )
}

type Pair<S1, S2> = (Option<S1>, Option<S2>);

/// Derive a value from two sources.
pub fn derived2<S1, S2, R1, R2, T>(
    first: &R1,
    second: &R2,
    mut map: impl FnMut(&S1, &S2) -> T + 'static,
) -> Derived<T>
where
    S1: Clone + 'static,
    S2: Clone + 'static,
    R1: Readable<S1> + Clone + 'static,
    R2: Readable<S2> + Clone + 'static,
    T: Clone + SafeEq + Default + 'static,
{
    build(
        T::default(),
        || (None, None),
        vec![
            connect(first.clone(), |slots: &mut Pair<S1, S2>, _, v| {
                slots.0 = Some(v)
            }),
            connect(second.clone(), |slots: &mut Pair<S1, S2>, _, v| {
                slots.1 = Some(v)
            }),
        ],
        Box::new(move |slots: &Pair<S1, S2>, setter: &Setter<T>| -> Option<Cleanup> {
            if let (Some(a), Some(b)) = slots {
                setter.set(map(a, b));
            }
            None
        }),
    )
}

/// Derive a value from two sources, writing it through a [`Setter`].
pub fn derived2_with<S1, S2, R1, R2, T>(
    first: &R1,
    second: &R2,
    initial: T,
    mut run: impl FnMut(&S1, &S2, &Setter<T>) -> Option<Cleanup> + 'static,
) -> Derived<T>
where
    S1: Clone + 'static,
    S2: Clone + 'static,
    R1: Readable<S1> + Clone + 'static,
    R2: Readable<S2> + Clone + 'static,
    T: Clone + SafeEq + 'static,
{
    build(
        initial,
        || (None, None),
        vec![
            connect(first.clone(), |slots: &mut Pair<S1, S2>, _, v| {
                slots.0 = Some(v)
            }),
            connect(second.clone(), |slots: &mut Pair<S1, S2>, _, v| {
                slots.1 = Some(v)
            }),
        ],
        Box::new(move |slots: &Pair<S1, S2>, setter: &Setter<T>| -> Option<Cleanup> {
            match slots {
                (Some(a), Some(b)) => run(a, b, setter),
                _ => None,
            }
        }),
    )
}

type Triple<S1, S2, S3> = (Option<S1>, Option<S2>, Option<S3>);

/// Derive a value from three sources.
pub fn derived3<S1, S2, S3, R1, R2, R3, T>(
    first: &R1,
    second: &R2,
    third: &R3,
    mut map: impl FnMut(&S1, &S2, &S3) -> T + 'static,
) -> Derived<T>
where
    S1: Clone + 'static,
    S2: Clone + 'static,
    S3: Clone + 'static,
    R1: Readable<S1> + Clone + 'static,
    R2: Readable<S2> + Clone + 'static,
    R3: Readable<S3> + Clone + 'static,
    T: Clone + SafeEq + Default + 'static,
{
    build(
        T::default(),
        || (None, None, None),
        vec![
            connect(first.clone(), |slots: &mut Triple<S1, S2, S3>, _, v| {
                slots.0 = Some(v)
            }),
            connect(second.clone(), |slots: &mut Triple<S1, S2, S3>, _, v| {
                slots.1 = Some(v)
            }),
            connect(third.clone(), |slots: &mut Triple<S1, S2, S3>, _, v| {
                slots.2 = Some(v)
            }),
        ],
        Box::new(move |slots: &Triple<S1, S2, S3>, setter: &Setter<T>| -> Option<Cleanup> {
            if let (Some(a), Some(b), Some(c)) = slots {
                setter.set(map(a, b, c));
            }
            None
        }),
    )
}

fn connect_all<S, R, T>(sources: &[R]) -> Result<Vec<Connector<Vec<Option<S>>, T>>>
where
    S: Clone + 'static,
    R: Readable<S> + Clone + 'static,
    T: Clone + SafeEq + 'static,
{
    if sources.is_empty() {
        return Err(ReactiveError::invalid("no live sources"));
    }
    Ok(sources
        .iter()
        .map(|source| {
            connect(source.clone(), |slots: &mut Vec<Option<S>>, index, v| {
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(v);
                }
            })
        })
        .collect())
}

fn complete<S: Clone>(slots: &[Option<S>]) -> Option<Vec<S>> {
    slots.iter().cloned().collect()
}

/// Derive a value from any non-empty list of same-typed sources.
///
/// # Errors
///
/// Returns [`ReactiveError::InvalidArgument`] if `sources` is empty.
pub fn derived_all<S, R, T>(
    sources: &[R],
    mut map: impl FnMut(&[S]) -> T + 'static,
) -> Result<Derived<T>>
where
    S: Clone + 'static,
    R: Readable<S> + Clone + 'static,
    T: Clone + SafeEq + Default + 'static,
{
    let connectors = connect_all(sources)?;
    let len = connectors.len();
    Ok(build(
        T::default(),
        move || vec![None; len],
        connectors,
        Box::new(move |slots: &Vec<Option<S>>, setter: &Setter<T>| -> Option<Cleanup> {
            if let Some(values) = complete(slots) {
                setter.set(map(&values));
            }
            None
        }),
    ))
}

/// Derive a value from any non-empty list of same-typed sources, writing it
/// through a [`Setter`].
///
/// # Errors
///
/// Returns [`ReactiveError::InvalidArgument`] if `sources` is empty.
pub fn derived_all_with<S, R, T>(
    sources: &[R],
    initial: T,
    mut run: impl FnMut(&[S], &Setter<T>) -> Option<Cleanup> + 'static,
) -> Result<Derived<T>>
where
    S: Clone + 'static,
    R: Readable<S> + Clone + 'static,
    T: Clone + SafeEq + 'static,
{
    let connectors = connect_all(sources)?;
    let len = connectors.len();
    Ok(build(
        initial,
        move || vec![None; len],
        connectors,
        Box::new(move |slots: &Vec<Option<S>>, setter: &Setter<T>| -> Option<Cleanup> {
            complete(slots).and_then(|values| run(&values, setter))
        }),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
