//! Tokio-backed task queue.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use slotmap::SlotMap;
use tokio::task::AbortHandle;
use tracing::trace;

use super::{Task, TaskHandle, TaskQueue};

type Registry = Rc<RefCell<SlotMap<TaskHandle, Option<AbortHandle>>>>;

/// A task queue that spawns each task onto the current tokio `LocalSet`.
///
/// Reactive state is `!Send`, so tasks go through
/// [`tokio::task::spawn_local`]; scheduling must therefore happen from
/// inside `LocalSet::run_until` (or a task spawned on one). A task runs no
/// earlier than the next time the local executor gets control.
///
/// The registry entry, not the abort, is what guarantees a cancelled task
/// never runs: a task only executes if it can still remove its own entry.
#[derive(Default)]
pub struct LocalTaskQueue {
    registry: Registry,
}

impl LocalTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks scheduled and not yet run or cancelled.
    pub fn pending(&self) -> usize {
        self.registry.borrow().len()
    }
}

impl TaskQueue for LocalTaskQueue {
    fn schedule(&self, task: Task) -> TaskHandle {
        let handle = self.registry.borrow_mut().insert(None);

        let registry = Rc::clone(&self.registry);
        let join = tokio::task::spawn_local(async move {
            let live = registry.borrow_mut().remove(handle).is_some();
            if live {
                task();
            } else {
                trace!(?handle, "local task cancelled before it ran");
            }
        });

        if let Some(slot) = self.registry.borrow_mut().get_mut(handle) {
            *slot = Some(join.abort_handle());
        }
        handle
    }

    fn cancel(&self, handle: TaskHandle) -> bool {
        let removed = self.registry.borrow_mut().remove(handle);
        match removed {
            Some(abort) => {
                if let Some(abort) = abort {
                    abort.abort();
                }
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for LocalTaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTaskQueue")
            .field("pending", &self.pending())
            .finish()
    }
}
