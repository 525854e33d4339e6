//! Host-driven macrotask queue.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;

use slotmap::SlotMap;
use tracing::trace;

use super::{Task, TaskHandle, TaskQueue};

/// A FIFO task queue that only advances when the host calls
/// [`run_turn`](Self::run_turn).
///
/// A turn runs the tasks that were pending when it started. Tasks scheduled
/// while the turn is running wait for the next turn, so a task can never
/// observe its own scheduling turn.
#[derive(Default)]
pub struct MacrotaskQueue {
    state: RefCell<QueueState>,
}

#[derive(Default)]
struct QueueState {
    tasks: SlotMap<TaskHandle, Task>,
    order: VecDeque<TaskHandle>,
}

impl MacrotaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks scheduled and not yet run or cancelled.
    pub fn pending(&self) -> usize {
        self.state.borrow().tasks.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Run one turn. Returns the number of tasks that ran.
    ///
    /// If a task panics, the tasks after it in this turn stay queued.
    pub fn run_turn(&self) -> usize {
        let mut turn = Turn {
            queue: self,
            batch: std::mem::take(&mut self.state.borrow_mut().order),
        };
        let mut ran = 0;

        while let Some(handle) = turn.batch.pop_front() {
            // Bind first so the borrow ends before the task runs.
            let task = self.state.borrow_mut().tasks.remove(handle);
            if let Some(task) = task {
                task();
                ran += 1;
            }
        }

        trace!(ran, pending = self.pending(), "macrotask turn finished");
        ran
    }

    /// Run turns until nothing is pending. Returns the total number of
    /// tasks that ran. Does not return if tasks keep rescheduling themselves.
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        while !self.state.borrow().order.is_empty() {
            total += self.run_turn();
        }
        total
    }
}

impl TaskQueue for MacrotaskQueue {
    fn schedule(&self, task: Task) -> TaskHandle {
        let mut state = self.state.borrow_mut();
        let handle = state.tasks.insert(task);
        state.order.push_back(handle);
        handle
    }

    fn cancel(&self, handle: TaskHandle) -> bool {
        // Bind first so the task is dropped after the borrow ends.
        let removed = {
            let mut state = self.state.borrow_mut();
            let removed = state.tasks.remove(handle);
            if removed.is_some() {
                if let Some(pos) = state.order.iter().rposition(|h| *h == handle) {
                    state.order.remove(pos);
                }
            }
            removed
        };
        removed.is_some()
    }
}

/// The handles taken out of the queue by a running turn. Whatever is left
/// when it drops (a task panicked) goes back to the front of the queue.
struct Turn<'a> {
    queue: &'a MacrotaskQueue,
    batch: VecDeque<TaskHandle>,
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        if let Ok(mut state) = self.queue.state.try_borrow_mut() {
            let later = std::mem::replace(&mut state.order, std::mem::take(&mut self.batch));
            state.order.extend(later);
        }
    }
}

impl fmt::Debug for MacrotaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacrotaskQueue")
            .field("pending", &self.pending())
            .finish()
    }
}
