//! Subscriber execution.
//!
//! A subscriber is any computation that depends on reactive values:
//! reactions, the recompute step of a memo, and the scheduling step of a
//! deferred reaction. Every run follows the same protocol:
//!
//! 1. Teardown: unregister from every source read last time, then call the
//!    cleanups registered last time.
//! 2. Push the subscriber onto the context stack.
//! 3. Run the body. Reads register fresh edges, `on_cleanup` registers
//!    fresh cleanups.
//! 4. Pop the stack, on every exit path.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use tracing::{debug, trace};

use super::context::ContextGuard;
use super::Runtime;
use crate::error::{ReactiveError, Result};
use crate::graph::{Cleanup, SubscriberId};

impl Runtime {
    /// Add a subscriber to the graph without running it.
    pub(crate) fn insert_subscriber(&self, body: impl Fn() + 'static) -> SubscriberId {
        self.graph_mut().insert_subscriber(Rc::new(body))
    }

    /// Run a subscriber through teardown, re-track, run and release.
    ///
    /// Panics in cleanups or the body are caught and returned as errors.
    /// The run is refused before teardown if it would exceed `max_depth`.
    pub(crate) fn run_subscriber(&self, id: SubscriberId) -> Result<()> {
        let limit = self.config().max_depth;
        let cleanups = {
            let mut graph = self.graph_mut();
            if !graph.contains_subscriber(id) {
                return Err(ReactiveError::StaleSubscriber(id));
            }
            let depth = graph.depth() + 1;
            if depth > limit {
                return Err(ReactiveError::RecursionLimit { depth, limit });
            }
            graph.hold(id);
            graph.take_edges(id).unwrap_or_default()
        };
        trace!(?id, cleanups = cleanups.len(), "subscriber teardown");

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            for cleanup in cleanups {
                cleanup();
            }

            let body = self.graph().body(id);
            if let Some(body) = body {
                let _ctx = ContextGuard::enter(self, id);
                body();
            }
        }));

        {
            let mut graph = self.graph_mut();
            graph.record_run(id);
            graph.release(id);
        }
        self.retire_if_unreachable(id);
        self.collect_garbage();

        outcome.map_err(|payload| ReactiveError::from_panic(id, payload))
    }

    /// Run `callback` under the identity of an existing subscriber without
    /// tearing it down first. Reads inside `callback` add to the
    /// subscriber's current edges.
    pub(crate) fn resume_subscriber(&self, id: SubscriberId, callback: &dyn Fn()) -> Result<()> {
        let limit = self.config().max_depth;
        {
            let graph = self.graph();
            if !graph.contains_subscriber(id) {
                return Err(ReactiveError::StaleSubscriber(id));
            }
            let depth = graph.depth() + 1;
            if depth > limit {
                return Err(ReactiveError::RecursionLimit { depth, limit });
            }
        }

        catch_unwind(AssertUnwindSafe(|| {
            let _ctx = ContextGuard::enter(self, id);
            callback();
        }))
        .map_err(|payload| ReactiveError::from_panic(id, payload))
    }

    /// Retire `id` if nothing can trigger it any more. Its body and any
    /// cleanups are dropped without being called.
    pub(crate) fn retire_if_unreachable(&self, id: SubscriberId) {
        let retired = self.graph_mut().retire(id);
        if let Some(node) = retired {
            debug!(?id, runs = node.runs, "subscriber retired");
            drop(node);
        }
    }

    /// Register `cleanup` with the running subscriber. It is called once,
    /// right before that subscriber's next run.
    ///
    /// Outside a running subscriber this does nothing.
    pub fn on_cleanup(&self, cleanup: impl FnOnce() + 'static) {
        let rejected = {
            let mut graph = self.graph_mut();
            match graph.current() {
                Some(id) => graph.add_cleanup(id, Box::new(cleanup)).err(),
                None => Some(Box::new(cleanup) as Cleanup),
            }
        };

        if rejected.is_some() {
            trace!("on_cleanup outside a running subscriber ignored");
        }
    }
}
