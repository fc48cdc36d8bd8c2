#![forbid(unsafe_code)]

//! Observable cells with synchronous change notification.
//!
//! # Design
//!
//! [`Observable<T>`] keeps its value, its subscriber list and its lifecycle
//! hooks in shared, reference-counted storage. Cloning an `Observable`
//! yields another handle to the same cell.
//!
//! A cell becomes *live* when its first subscriber registers: the optional
//! start hook runs (receiving a [`Setter`]) and may hand back a stop hook.
//! The stop hook runs when the last subscriber leaves, and the next
//! subscriber starts the cell again.
//!
//! An effective `set` on a live cell first calls every subscriber's
//! `on_invalidate`, then queues one `on_change` delivery per subscriber on
//! the thread's notification queue. If no notify cycle is in flight the
//! queue is drained before `set` returns; otherwise the deliveries run after
//! the ones already queued.
//!
//! # Invariants
//!
//! 1. `subscribe` delivers the current value exactly once before returning.
//! 2. Deliveries follow registration order.
//! 3. A value that is not observably different (see [`SafeEq`]) is ignored.
//! 4. Each subscriber sees every effective value exactly once, including
//!    values set re-entrantly from inside another callback.
//! 5. A subscriber removed before its queued delivery runs is skipped.
//!
//! # Failure Modes
//!
//! - **Set during `with`**: writing the cell from inside a
//!   [`with`](Observable::with) closure panics (`RefCell` borrow conflict).
//! - **Cell dropped**: outstanding [`Subscription`]s and [`Setter`]s hold weak
//!   references and become inert.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::equality::SafeEq;
use super::scheduler::{self, Delivery};

/// Returned by a start hook; runs when the last subscriber leaves.
pub type StopHook = Box<dyn FnOnce()>;

/// Returned by a manual derivation; runs before its next recomputation and
/// when the derived cell stops.
pub type Cleanup = Box<dyn FnOnce()>;

type StartHook<T> = Box<dyn FnMut(Setter<T>) -> Option<StopHook>>;

/// The pair of callbacks registered against a cell.
pub struct Subscriber<T> {
    on_change: Box<dyn FnMut(&T)>,
    on_invalidate: Option<Box<dyn FnMut()>>,
    replay: bool,
}

impl<T> Subscriber<T> {
    /// Subscriber that only listens for new values.
    pub fn new(on_change: impl FnMut(&T) + 'static) -> Self {
        Self {
            on_change: Box::new(on_change),
            on_invalidate: None,
            replay: false,
        }
    }

    /// Also be told when the cell's value is about to change, before any
    /// subscriber receives the new value.
    #[must_use]
    pub fn on_invalidate(mut self, on_invalidate: impl FnMut() + 'static) -> Self {
        self.on_invalidate = Some(Box::new(on_invalidate));
        self
    }

    /// Keep this subscriber's queued delivery if a panicking callback
    /// abandons the cycle; it runs at the start of the next one.
    pub(crate) fn replay_if_abandoned(mut self) -> Self {
        self.replay = true;
        self
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("on_invalidate", &self.on_invalidate.is_some())
            .finish_non_exhaustive()
    }
}

/// A registered subscriber.
struct Entry<T> {
    id: u64,
    active: Cell<bool>,
    replay: bool,
    on_change: RefCell<Box<dyn FnMut(&T)>>,
    on_invalidate: Option<RefCell<Box<dyn FnMut()>>>,
}

impl<T> Entry<T> {
    fn new(id: u64, subscriber: Subscriber<T>) -> Self {
        Self {
            id,
            active: Cell::new(true),
            replay: subscriber.replay,
            on_change: RefCell::new(subscriber.on_change),
            on_invalidate: subscriber.on_invalidate.map(RefCell::new),
        }
    }

    fn deliver(&self, value: &T) {
        if self.active.get() {
            let mut on_change = self.on_change.borrow_mut();
            (*on_change)(value);
        }
    }

    fn invalidate(&self) {
        if !self.active.get() {
            return;
        }
        if let Some(on_invalidate) = &self.on_invalidate {
            let mut on_invalidate = on_invalidate.borrow_mut();
            (*on_invalidate)();
        }
    }
}

/// Shared interior for [`Observable<T>`].
struct Inner<T> {
    value: RefCell<T>,
    /// Registration order.
    subscribers: RefCell<Vec<Rc<Entry<T>>>>,
    next_id: Cell<u64>,
    start: RefCell<Option<StartHook<T>>>,
    stop: RefCell<Option<StopHook>>,
    /// True between the first subscribe (after the start hook returned) and
    /// the last unsubscribe.
    live: Cell<bool>,
}

impl<T: Clone + SafeEq + 'static> Inner<T> {
    fn set(&self, value: T) {
        {
            let mut current = self.value.borrow_mut();
            if current.same_as(&value) {
                return;
            }
            *current = value;
        }
        if !self.live.get() {
            return;
        }

        let value = self.value.borrow().clone();
        let entries: Vec<Rc<Entry<T>>> = self.subscribers.borrow().clone();
        tracing::trace!(
            message = "observable.notify",
            subscribers = entries.len(),
            nested = scheduler::in_flight()
        );

        let mut deliveries: Vec<Delivery> = Vec::with_capacity(entries.len());
        for entry in &entries {
            entry.invalidate();
        }
        for entry in entries {
            let value = value.clone();
            let replay = entry.replay;
            let run = move || entry.deliver(&value);
            deliveries.push(if replay {
                Delivery::replayable(run)
            } else {
                Delivery::new(run)
            });
        }
        scheduler::enqueue(deliveries);
    }

    fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.value.borrow());
        self.set(next);
    }

    fn start(self: &Rc<Self>) {
        let hook = self.start.borrow_mut().take();
        let stop = match hook {
            Some(mut hook) => {
                let stop = hook(Setter {
                    inner: Rc::downgrade(self),
                });
                *self.start.borrow_mut() = Some(hook);
                stop
            }
            None => None,
        };
        *self.stop.borrow_mut() = stop;
        self.live.set(true);
        tracing::debug!(message = "observable.start");
    }

    fn subscribe(self: &Rc<Self>, subscriber: Subscriber<T>) -> Subscription {
        scheduler::exclusive(|| {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            let entry = Rc::new(Entry::new(id, subscriber));

            let first = {
                let mut subscribers = self.subscribers.borrow_mut();
                subscribers.push(Rc::clone(&entry));
                subscribers.len() == 1
            };
            if first && !self.live.get() {
                self.start();
            }

            let value = self.value.borrow().clone();
            entry.deliver(&value);

            let weak = Rc::downgrade(self);
            Subscription::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.unsubscribe(id);
                }
            })
        })
    }

    fn unsubscribe(&self, id: u64) {
        let (removed, now_empty) = {
            let mut subscribers = self.subscribers.borrow_mut();
            let pos = subscribers.iter().position(|entry| entry.id == id);
            let removed = pos.map(|pos| subscribers.remove(pos));
            (removed, subscribers.is_empty())
        };
        let Some(entry) = removed else {
            return;
        };
        entry.active.set(false);
        drop(entry);

        if now_empty && self.live.get() {
            self.live.set(false);
            let stop = self.stop.borrow_mut().take();
            tracing::debug!(message = "observable.stop", has_stop_hook = stop.is_some());
            if let Some(stop) = stop {
                stop();
            }
        }
    }
}

/// A shared value that notifies subscribers whenever it changes.
///
/// Cloning an `Observable` creates a new handle to the **same** cell.
///
/// # Example
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use cartkit_runtime::reactive::Observable;
///
/// let count = Observable::new(1);
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&seen);
/// let sub = count.subscribe(move |v| sink.borrow_mut().push(*v));
///
/// count.set(2);
/// count.update(|v| v * 10);
/// assert_eq!(*seen.borrow(), vec![1, 2, 20]);
/// sub.unsubscribe();
/// ```
pub struct Observable<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.inner.value.borrow())
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .field("live", &self.inner.live.get())
            .finish()
    }
}

impl<T: Clone + SafeEq + Default + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + SafeEq + 'static> Observable<T> {
    /// Create a writable cell holding `value`.
    pub fn new(value: T) -> Self {
        Self::build(value, None)
    }

    /// Create a writable cell with a lifecycle hook.
    ///
    /// `start` runs when the first subscriber registers, before that
    /// subscriber receives its initial value. It may write the cell through
    /// the [`Setter`] (now or later) and may return a [`StopHook`], which
    /// runs when the last subscriber leaves.
    pub fn with_start(
        value: T,
        start: impl FnMut(Setter<T>) -> Option<StopHook> + 'static,
    ) -> Self {
        Self::build(value, Some(Box::new(start)))
    }

    fn build(value: T, start: Option<StartHook<T>>) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(value),
                subscribers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                start: RefCell::new(start),
                stop: RefCell::new(None),
                live: Cell::new(false),
            }),
        }
    }

    /// Replace the value, notifying subscribers if it is observably
    /// different.
    pub fn set(&self, value: T) {
        self.inner.set(value);
    }

    /// Set the value to `f(&current)`.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.inner.update(f);
    }

    /// Mutate a copy of the value in place, then [`set`](Self::set) it.
    pub fn modify(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.inner.value.borrow().clone();
        f(&mut next);
        self.inner.set(next);
    }

    /// Register `on_change`; it receives the current value immediately.
    pub fn subscribe(&self, on_change: impl FnMut(&T) + 'static) -> Subscription {
        self.inner.subscribe(Subscriber::new(on_change))
    }

    /// Register a full [`Subscriber`]; it receives the current value
    /// immediately.
    pub fn subscribe_with(&self, subscriber: Subscriber<T>) -> Subscription {
        self.inner.subscribe(subscriber)
    }

    /// Current value.
    ///
    /// On a cell that has a start hook but no subscribers, this subscribes
    /// and unsubscribes once so the hook can bring the value up to date.
    #[must_use]
    pub fn get(&self) -> T {
        if self.inner.live.get() || self.inner.start.borrow().is_none() {
            return self.inner.value.borrow().clone();
        }
        let probe = self.subscribe(|_| {});
        let value = self.inner.value.borrow().clone();
        probe.unsubscribe();
        value
    }

    /// Access the stored value by reference without running lifecycle
    /// hooks.
    ///
    /// # Panics
    ///
    /// Panics if the closure writes to the same cell.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Handle that can write this cell without keeping it alive.
    #[must_use]
    pub fn setter(&self) -> Setter<T> {
        Setter {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Read-only view of this cell.
    #[must_use]
    pub fn read_only(&self) -> ReadOnly<T> {
        ReadOnly { cell: self.clone() }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Whether the cell has been started and not yet stopped.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.live.get()
    }
}

/// Write access to a cell, handed to start hooks and manual derivations.
///
/// Holds a weak reference: once the cell is dropped, writes are ignored.
pub struct Setter<T> {
    inner: Weak<Inner<T>>,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("attached", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl<T: Clone + SafeEq + 'static> Setter<T> {
    pub fn set(&self, value: T) {
        if let Some(inner) = self.inner.upgrade() {
            inner.set(value);
        }
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        if let Some(inner) = self.inner.upgrade() {
            inner.update(f);
        }
    }
}

/// Guard for a registered subscriber.
///
/// Unsubscribes when [`unsubscribe`](Self::unsubscribe) is called or when the
/// guard is dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Anything a subscriber can listen to, and a derived cell can read from.
pub trait Readable<T> {
    fn subscribe_with(&self, subscriber: Subscriber<T>) -> Subscription;

    fn get(&self) -> T;

    fn subscribe(&self, on_change: impl FnMut(&T) + 'static) -> Subscription
    where
        Self: Sized,
    {
        self.subscribe_with(Subscriber::new(on_change))
    }
}

impl<T: Clone + SafeEq + 'static> Readable<T> for Observable<T> {
    fn subscribe_with(&self, subscriber: Subscriber<T>) -> Subscription {
        Observable::subscribe_with(self, subscriber)
    }

    fn get(&self) -> T {
        Observable::get(self)
    }
}

/// A cell without its write surface.
pub struct ReadOnly<T> {
    cell: Observable<T>,
}

impl<T> Clone for ReadOnly<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadOnly<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadOnly").field(&self.cell).finish()
    }
}

impl<T: Clone + SafeEq + 'static> ReadOnly<T> {
    pub fn subscribe(&self, on_change: impl FnMut(&T) + 'static) -> Subscription {
        self.cell.subscribe(on_change)
    }

    pub fn subscribe_with(&self, subscriber: Subscriber<T>) -> Subscription {
        self.cell.subscribe_with(subscriber)
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.cell.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with(f)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.cell.subscriber_count()
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.cell.is_live()
    }
}

impl<T: Clone + SafeEq + 'static> Readable<T> for ReadOnly<T> {
    fn subscribe_with(&self, subscriber: Subscriber<T>) -> Subscription {
        self.cell.subscribe_with(subscriber)
    }

    fn get(&self) -> T {
        self.cell.get()
    }
}

/// A read-only cell whose value is only written by its own start hook.
pub fn readable<T: Clone + SafeEq + 'static>(
    value: T,
    start: impl FnMut(Setter<T>) -> Option<StopHook> + 'static,
) -> ReadOnly<T> {
    Observable::with_start(value, start).read_only()
}

/// Subscribe to a cell that may be absent.
///
/// With no cell the callback receives `None` once and the returned
/// subscription releases nothing.
pub fn subscribe_to<T, R>(
    store: Option<&R>,
    mut on_change: impl FnMut(Option<&T>) + 'static,
) -> Subscription
where
    T: 'static,
    R: Readable<T>,
{
    match store {
        Some(store) => store.subscribe_with(Subscriber::new(move |value: &T| on_change(Some(value)))),
        None => {
            on_change(None);
            Subscription::noop()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
