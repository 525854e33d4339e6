//! Deferred Reactions
//!
//! A deferred reaction is a reaction whose real work runs on a later turn
//! of the runtime's [`TaskQueue`](crate::tasks::TaskQueue).
//!
//! # How Deferred Reactions Work
//!
//! The installed subscriber reads nothing itself. Each of its runs:
//!
//! 1. Schedules a task that will resume the *same* subscriber and call the
//!    user callback under its identity, so reads inside the callback become
//!    the subscriber's dependencies.
//! 2. Registers a cleanup that cancels that task if it has not fired.
//!
//! A write to one of those dependencies re-runs the subscriber, whose
//! teardown cancels the pending task and whose body schedules a new one. A
//! burst of writes before the next turn therefore fires the callback once,
//! observing the final values. The first call of the callback is always at
//! least one turn after construction.
//!
//! While a task is pending the subscriber is held, so it is not retired for
//! having no dependencies between scheduling and firing.

use std::rc::Rc;

use tracing::trace;

use super::Runtime;
use crate::error::ReactiveError;
use crate::graph::SubscriberId;
use crate::tasks::TaskHandle;

impl Runtime {
    /// Install a deferred reaction. `callback` first runs on the next turn
    /// of the task queue, then once per burst of writes to the signals it
    /// read on its latest call.
    pub fn create_deferred_reaction(&self, callback: impl Fn() + 'static) -> SubscriberId {
        let callback: Rc<dyn Fn()> = Rc::new(callback);
        let weak = self.downgrade();

        self.create_reaction(move || {
            let Some(rt) = weak.upgrade() else { return };
            let Some(owner) = rt.current_subscriber() else {
                return;
            };

            let handle = rt.schedule_deferred(owner, Rc::clone(&callback));
            let weak = rt.downgrade();
            rt.on_cleanup(move || {
                if let Some(rt) = weak.upgrade() {
                    rt.cancel_deferred(owner, handle);
                }
            });
        })
    }

    fn schedule_deferred(&self, owner: SubscriberId, callback: Rc<dyn Fn()>) -> TaskHandle {
        self.graph_mut().hold(owner);

        let weak = self.downgrade();
        let handle = self.queue().schedule(Box::new(move || {
            if let Some(rt) = weak.upgrade() {
                rt.fire_deferred(owner, &*callback);
            }
        }));
        trace!(?owner, ?handle, "deferred task scheduled");
        handle
    }

    fn cancel_deferred(&self, owner: SubscriberId, handle: TaskHandle) {
        if self.queue().cancel(handle) {
            trace!(?owner, ?handle, "deferred task cancelled");
            self.graph_mut().release(owner);
        }
    }

    fn fire_deferred(&self, owner: SubscriberId, callback: &dyn Fn()) {
        trace!(?owner, "deferred task firing");
        let result = self.resume_subscriber(owner, callback);

        self.graph_mut().release(owner);
        self.retire_if_unreachable(owner);
        self.collect_garbage();

        match result {
            Ok(()) => {}
            Err(ReactiveError::StaleSubscriber(_)) => {
                trace!(?owner, "deferred task outlived its subscriber");
            }
            Err(err) => self.settle(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::MacrotaskQueue;
    use std::cell::Cell;

    fn runtime() -> (Runtime, Rc<MacrotaskQueue>) {
        let queue = Rc::new(MacrotaskQueue::new());
        (Runtime::with_queue(queue.clone()), queue)
    }

    #[test]
    fn first_call_is_never_inline() {
        let (rt, queue) = runtime();
        let calls = Rc::new(Cell::new(0));

        let c = calls.clone();
        let id = rt.create_deferred_reaction(move || c.set(c.get() + 1));

        assert_eq!(calls.get(), 0);
        assert_eq!(queue.pending(), 1);
        assert!(rt.is_alive(id));

        queue.run_turn();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn reads_in_the_callback_become_dependencies() {
        let (rt, queue) = runtime();
        let count = rt.create_signal(0);
        let seen = Rc::new(Cell::new(-1));

        let (s, out) = (count.clone(), seen.clone());
        let id = rt.create_deferred_reaction(move || out.set(s.get()));
        assert_eq!(count.subscriber_count(), 0);

        queue.run_turn();
        assert_eq!(seen.get(), 0);
        assert_eq!(rt.dependencies_of(id), vec![count.id()]);

        count.set(5);
        // Teardown dropped the edge; the rescheduled task re-reads.
        assert_eq!(count.subscriber_count(), 0);
        assert_eq!(seen.get(), 0);

        queue.run_turn();
        assert_eq!(seen.get(), 5);
        assert_eq!(count.subscriber_count(), 1);
    }

    #[test]
    fn burst_of_writes_fires_once() {
        let (rt, queue) = runtime();
        let count = rt.create_signal(0);
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::new(Cell::new(0));

        let (s, c, out) = (count.clone(), calls.clone(), seen.clone());
        rt.create_deferred_reaction(move || {
            c.set(c.get() + 1);
            out.set(s.get());
        });
        queue.run_turn();

        // Only the first write reaches the subscriber: its teardown drops
        // the edge, and nothing re-reads until the task fires.
        count.set(1);
        count.set(2);
        count.set(3);
        assert_eq!(queue.pending(), 1);

        queue.run_until_idle();
        assert_eq!(calls.get(), 2);
        assert_eq!(seen.get(), 3);
    }

    #[test]
    fn writes_after_teardown_reach_nobody() {
        let (rt, queue) = runtime();
        let a = rt.create_signal(0);
        let b = rt.create_signal(0);
        let calls = Rc::new(Cell::new(0));

        let (ra, rb, c) = (a.clone(), b.clone(), calls.clone());
        rt.create_deferred_reaction(move || {
            c.set(c.get() + 1);
            ra.get();
            rb.get();
        });
        queue.run_turn();

        // `a` re-runs the subscriber, whose teardown also drops the edge
        // from `b`, so the second write reaches nobody.
        a.set(1);
        b.set(1);
        assert_eq!(queue.pending(), 1);

        queue.run_turn();
        assert_eq!(calls.get(), 2);
        assert_eq!(a.subscriber_count(), 1);
        assert_eq!(b.subscriber_count(), 1);
    }

    #[test]
    fn rerun_cancels_the_pending_task() {
        let (rt, queue) = runtime();
        let calls = Rc::new(Cell::new(0));

        let c = calls.clone();
        let id = rt.create_deferred_reaction(move || c.set(c.get() + 1));

        rt.run_subscriber(id).unwrap();
        assert_eq!(queue.pending(), 1);

        queue.run_until_idle();
        assert_eq!(calls.get(), 1);
        // The cancelled task gave back its hold, so firing the only live
        // task leaves nothing keeping the subscriber.
        assert!(!rt.is_alive(id));
    }

    #[test]
    fn callback_that_reads_nothing_retires_after_firing() {
        let (rt, queue) = runtime();
        let calls = Rc::new(Cell::new(0));

        let c = calls.clone();
        let id = rt.create_deferred_reaction(move || c.set(c.get() + 1));
        assert!(rt.is_alive(id));

        queue.run_turn();
        assert!(!rt.is_alive(id));
        assert_eq!(rt.stats().subscribers, 0);
    }

    #[test]
    fn callback_can_register_cleanups() {
        let (rt, queue) = runtime();
        let count = rt.create_signal(0);
        let cleaned = Rc::new(Cell::new(0));

        let weak = rt.downgrade();
        let (s, cl) = (count.clone(), cleaned.clone());
        rt.create_deferred_reaction(move || {
            s.get();
            let cl = cl.clone();
            if let Some(rt) = weak.upgrade() {
                rt.on_cleanup(move || cl.set(cl.get() + 1));
            }
        });
        queue.run_turn();
        assert_eq!(cleaned.get(), 0);

        count.set(1);
        assert_eq!(cleaned.get(), 1);
    }

    #[test]
    fn task_outliving_the_runtime_does_nothing() {
        let (rt, queue) = runtime();
        let calls = Rc::new(Cell::new(0));

        let c = calls.clone();
        rt.create_deferred_reaction(move || c.set(c.get() + 1));
        drop(rt);

        queue.run_turn();
        assert_eq!(calls.get(), 0);
    }
}
