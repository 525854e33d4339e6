//! Thread-local default runtime and free functions.
//!
//! Each thread lazily gets one [`Runtime`] backed by a [`MacrotaskQueue`].
//! The free functions below operate on it, so small programs never have to
//! pass a runtime around:
//!
//! ```rust,ignore
//! use reaper_core::reactive::{create_reaction, create_state};
//!
//! let (count, set_count) = create_state(0);
//! create_reaction(move || println!("count = {}", count.get()));
//! set_count.set(1);
//! ```
//!
//! Deferred reactions created here only fire when the thread drives the
//! queue with [`run_deferred_turn`] or [`run_deferred_until_idle`].

use std::rc::Rc;

use super::memo::Memo;
use super::signal::{ReadSignal, Signal, WriteSignal};
use super::Runtime;
use crate::graph::SubscriberId;
use crate::tasks::MacrotaskQueue;

thread_local! {
    static DEFAULT: (Runtime, Rc<MacrotaskQueue>) = {
        let queue = Rc::new(MacrotaskQueue::new());
        (Runtime::with_queue(queue.clone()), queue)
    };
}

impl Runtime {
    /// This thread's default runtime.
    pub fn current() -> Runtime {
        DEFAULT.with(|(runtime, _)| runtime.clone())
    }
}

fn with_queue<R>(f: impl FnOnce(&MacrotaskQueue) -> R) -> R {
    let queue = DEFAULT.with(|(_, queue)| Rc::clone(queue));
    f(&queue)
}

pub fn create_signal<T: 'static>(value: T) -> Signal<T> {
    Runtime::current().create_signal(value)
}

/// Create a signal on the default runtime and return its getter and setter.
pub fn create_state<T: 'static>(value: T) -> (ReadSignal<T>, WriteSignal<T>) {
    Runtime::current().create_state(value)
}

pub fn create_state_default<T: Default + 'static>() -> (ReadSignal<T>, WriteSignal<T>) {
    Runtime::current().create_state_default()
}

/// See [`Runtime::create_reaction`].
pub fn create_reaction(body: impl Fn() + 'static) -> SubscriberId {
    Runtime::current().create_reaction(body)
}

/// See [`Runtime::create_memo`].
pub fn create_memo<T: 'static>(compute: impl Fn() -> T + 'static) -> Memo<T> {
    Runtime::current().create_memo(compute)
}

/// See [`Runtime::create_deferred_reaction`].
pub fn create_deferred_reaction(callback: impl Fn() + 'static) -> SubscriberId {
    Runtime::current().create_deferred_reaction(callback)
}

/// Register a cleanup with the subscriber running on the default runtime.
/// A no-op outside a running subscriber.
pub fn on_cleanup(cleanup: impl FnOnce() + 'static) {
    Runtime::current().on_cleanup(cleanup)
}

pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    Runtime::current().untrack(f)
}

/// Run one turn of the default runtime's task queue. Returns the number of
/// deferred tasks that ran.
pub fn run_deferred_turn() -> usize {
    with_queue(MacrotaskQueue::run_turn)
}

pub fn run_deferred_until_idle() -> usize {
    with_queue(MacrotaskQueue::run_until_idle)
}

/// Number of deferred tasks waiting on the default runtime's queue.
pub fn pending_deferred() -> usize {
    with_queue(MacrotaskQueue::pending)
}
