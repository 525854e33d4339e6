//! Reactive Context
//!
//! The context stack records which subscriber is currently running. This
//! enables automatic dependency tracking: when a signal is read, the
//! subscriber on top of the stack is registered as a dependent.
//!
//! # Implementation
//!
//! The stack lives inside the runtime's graph rather than in a global, so
//! independent runtimes never see each other's frames. Entering a context
//! pushes a frame and returns a guard; dropping the guard pops it. Because
//! the pop happens in `Drop`, it also runs when the body panics, which keeps
//! the stack strictly nested.
//!
//! Nested contexts are the normal case: a write inside a reaction re-runs
//! other subscribers on top of the writer's frame.

use tracing::warn;

use super::Runtime;
use crate::graph::SubscriberId;

/// Guard that pops its context frame when dropped.
pub(crate) struct ContextGuard<'rt> {
    runtime: &'rt Runtime,
    frame: Option<SubscriberId>,
}

impl<'rt> ContextGuard<'rt> {
    /// Enter a tracking context for `subscriber`. Reads until the guard is
    /// dropped attribute to it.
    pub(crate) fn enter(runtime: &'rt Runtime, subscriber: SubscriberId) -> Self {
        Self::push(runtime, Some(subscriber))
    }

    /// Enter an untracked region. Reads until the guard is dropped
    /// attribute to nobody, and `on_cleanup` is a no-op.
    pub(crate) fn untracked(runtime: &'rt Runtime) -> Self {
        Self::push(runtime, None)
    }

    fn push(runtime: &'rt Runtime, frame: Option<SubscriberId>) -> Self {
        runtime.graph_mut().push(frame);
        Self { runtime, frame }
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        let popped = self.runtime.graph_mut().pop();

        // A mismatch means some frame was pushed without a guard.
        debug_assert_eq!(
            popped,
            Some(self.frame),
            "ContextGuard mismatch: expected {:?}, got {:?}",
            self.frame,
            popped
        );
        if popped != Some(self.frame) {
            warn!(expected = ?self.frame, got = ?popped, "context stack out of order");
        }
    }
}
