#![forbid(unsafe_code)]

//! Single-flight notification queue.
//!
//! Every delivery of a value to a subscriber on this thread passes through
//! one FIFO queue. The first caller to find the queue idle becomes the owner
//! of the current notify cycle: it marks the queue in flight, runs its work,
//! then drains whatever was appended meanwhile. Callers that find a cycle
//! already in flight only append; their deliveries run after everything
//! queued ahead of them, on the owner's stack.
//!
//! # Invariants
//!
//! 1. At most one drain loop runs per thread at any time.
//! 2. Deliveries run in the order they were enqueued.
//! 3. When the owning call returns, the queue is empty and idle.
//! 4. A replayable delivery cut off by a panic runs at the start of the next
//!    cycle, before that cycle's own work.
//!
//! # Failure Modes
//!
//! - **Callback panics**: the in-flight flag is cleared while unwinding.
//!   Ordinary deliveries still queued are dropped. Replayable ones (derived
//!   cells listening to their sources) are kept and replayed by the next
//!   owner, so no derived cell is left waiting on a source value that never
//!   arrives.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// A pending `on_change` call with its value already bound.
pub(crate) struct Delivery {
    run: Box<dyn FnOnce()>,
    replay: bool,
}

impl Delivery {
    pub(crate) fn new(run: impl FnOnce() + 'static) -> Self {
        Self {
            run: Box::new(run),
            replay: false,
        }
    }

    /// Delivery that survives an abandoned cycle.
    pub(crate) fn replayable(run: impl FnOnce() + 'static) -> Self {
        Self {
            run: Box::new(run),
            replay: true,
        }
    }

    fn run(self) {
        (self.run)();
    }
}

#[derive(Default)]
struct NotifyQueue {
    in_flight: Cell<bool>,
    tail: RefCell<VecDeque<Delivery>>,
    /// Replayable deliveries left over from a cycle that panicked.
    abandoned: RefCell<Vec<Delivery>>,
}

thread_local! {
    static QUEUE: NotifyQueue = NotifyQueue::default();
}

/// Clears the in-flight flag when the owning call leaves, including by
/// unwinding.
struct CycleOwner;

impl Drop for CycleOwner {
    fn drop(&mut self) {
        let cut_off = QUEUE.with(|q| {
            q.in_flight.set(false);
            if std::thread::panicking() {
                std::mem::take(&mut *q.tail.borrow_mut())
            } else {
                VecDeque::new()
            }
        });
        if cut_off.is_empty() {
            return;
        }
        let (kept, dropped): (Vec<Delivery>, Vec<Delivery>) =
            cut_off.into_iter().partition(|delivery| delivery.replay);
        QUEUE.with(|q| q.abandoned.borrow_mut().extend(kept));
        // Dropped outside the borrow: releasing captured handles may
        // unsubscribe and re-enter the queue.
        drop(dropped);
    }
}

/// Run `work` inside a notify cycle.
///
/// If no cycle is in flight, this call owns one: deliveries abandoned by a
/// panicking cycle are replayed first, then `work` runs, then the queue is
/// drained before returning. Otherwise `work` runs immediately and any
/// deliveries it enqueues are left for the current owner.
pub(crate) fn exclusive<R>(work: impl FnOnce() -> R) -> R {
    if QUEUE.with(|q| q.in_flight.replace(true)) {
        return work();
    }
    let owner = CycleOwner;
    replay_abandoned();
    let out = work();
    drain();
    drop(owner);
    out
}

/// Append `deliveries` to the queue, draining it if no cycle was in flight.
pub(crate) fn enqueue(deliveries: Vec<Delivery>) {
    if deliveries.is_empty() {
        return;
    }
    exclusive(move || QUEUE.with(|q| q.tail.borrow_mut().extend(deliveries)));
}

/// Whether a notify cycle is currently being delivered on this thread.
pub(crate) fn in_flight() -> bool {
    QUEUE.with(|q| q.in_flight.get())
}

fn replay_abandoned() {
    let abandoned = QUEUE.with(|q| std::mem::take(&mut *q.abandoned.borrow_mut()));
    if abandoned.is_empty() {
        return;
    }
    tracing::debug!(message = "reactive.replay", deliveries = abandoned.len());
    QUEUE.with(|q| q.tail.borrow_mut().extend(abandoned));
    drain();
}

fn drain() {
    let mut delivered = 0usize;
    while let Some(delivery) = QUEUE.with(|q| q.tail.borrow_mut().pop_front()) {
        delivery.run();
        delivered += 1;
    }
    tracing::trace!(message = "reactive.drain", delivered);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn push_log(log: &Rc<RefCell<Vec<&'static str>>>, entry: &'static str) -> Delivery {
        let log = Rc::clone(log);
        Delivery::new(move || log.borrow_mut().push(entry))
    }

    #[test]
    fn idle_enqueue_drains_immediately() {
        let log = Rc::new(RefCell::new(Vec::new()));
        enqueue(vec![push_log(&log, "a"), push_log(&log, "b")]);
        assert_eq!(*log.borrow(), vec!["a", "b"]);
        assert!(!in_flight());
    }

    #[test]
    fn nested_enqueue_runs_after_current_batch() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let inner_log = Rc::clone(&log);
        let nested = Delivery::new(move || {
            inner_log.borrow_mut().push("outer-1");
            enqueue(vec![push_log(&inner_log, "nested")]);
            inner_log.borrow_mut().push("outer-1-done");
        });
        enqueue(vec![nested, push_log(&log, "outer-2")]);
        assert_eq!(
            *log.borrow(),
            vec!["outer-1", "outer-1-done", "outer-2", "nested"]
        );
    }

    #[test]
    fn exclusive_defers_work_enqueued_inside() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let inner_log = Rc::clone(&log);
        exclusive(|| {
            enqueue(vec![push_log(&inner_log, "queued")]);
            inner_log.borrow_mut().push("work");
            assert!(in_flight());
        });
        assert_eq!(*log.borrow(), vec!["work", "queued"]);
        assert!(!in_flight());
    }

    #[test]
    fn panic_resets_queue() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let boom = Delivery::new(|| panic!("callback failure"));
        let leftover = push_log(&log, "never");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            enqueue(vec![boom, leftover]);
        }));
        assert!(result.is_err());
        assert!(!in_flight());

        enqueue(vec![push_log(&log, "fresh")]);
        assert_eq!(*log.borrow(), vec!["fresh"]);
    }

    #[test]
    fn replayable_deliveries_survive_a_panic() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let boom = Delivery::new(|| panic!("callback failure"));
        let replayed_log = Rc::clone(&log);
        let kept = Delivery::replayable(move || replayed_log.borrow_mut().push("kept"));
        let dropped = push_log(&log, "dropped");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            enqueue(vec![boom, kept, dropped]);
        }));
        assert!(result.is_err());
        assert!(log.borrow().is_empty());

        enqueue(vec![push_log(&log, "fresh")]);
        assert_eq!(*log.borrow(), vec!["kept", "fresh"]);

        enqueue(vec![push_log(&log, "again")]);
        assert_eq!(*log.borrow(), vec!["kept", "fresh", "again"]);
    }
}
