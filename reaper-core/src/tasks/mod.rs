//! Deferred Task Queues
//!
//! Deferred reactions push their real work to a later turn of a host task
//! queue. This module models that queue as an explicit, cancellable
//! abstraction: scheduling returns a [`TaskHandle`], and cancelling by
//! handle guarantees the task never runs.
//!
//! Two queues are provided:
//!
//! - [`MacrotaskQueue`]: driven by the host, one turn at a time. This is the
//!   default and what tests use to step time deterministically.
//! - [`LocalTaskQueue`]: hands tasks to tokio's `spawn_local`, for hosts that
//!   already run a `LocalSet`.

mod local;
mod macrotask;

use slotmap::new_key_type;

pub use local::LocalTaskQueue;
pub use macrotask::MacrotaskQueue;

new_key_type! {
    /// Handle to a scheduled task. Handles are never reused, so cancelling
    /// with the handle of a task that already fired is a harmless no-op.
    pub struct TaskHandle;
}

/// A one-shot unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// A host task queue with cancellation.
pub trait TaskQueue {
    /// Schedule `task` to run on a later turn. It never runs inline.
    fn schedule(&self, task: Task) -> TaskHandle;

    /// Cancel a task.
    ///
    /// Returns `true` if the task had not run yet and now never will;
    /// `false` if it already ran, was already cancelled, or is running.
    fn cancel(&self, handle: TaskHandle) -> bool;
}
