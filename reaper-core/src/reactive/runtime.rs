//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, reactions,
//! memos and deferred reactions. It owns the dependency graph, the context
//! stack, the configuration and the task queue used for deferred work.
//!
//! # How It Works
//!
//! 1. Creating a signal registers a source in the graph.
//!
//! 2. Reading a signal while a subscriber is on top of the context stack
//!    records an edge between the two.
//!
//! 3. Writing a signal snapshots the source's subscriber set and re-runs
//!    every subscriber in it, synchronously and in insertion order. Each run
//!    tears down the subscriber's previous edges and cleanups first, so its
//!    edge set always reflects its most recent run.
//!
//! # Ownership
//!
//! `Runtime` is a cheap handle around an `Rc`. Signal handles and scheduled
//! tasks hold a weak reference, so user state captured by subscriber bodies
//! never keeps the runtime itself alive. Once the runtime is gone, signal
//! handles still read and write their value but track and notify nothing.
//!
//! # Threading
//!
//! Everything here is single-threaded (`Rc`/`RefCell`). The danger is
//! reentrancy, not data races: a write inside a subscriber body re-enters
//! the runtime before the outer run returns. The graph is therefore never
//! borrowed while user code runs.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, error, trace, warn};

use super::context::ContextGuard;
use crate::config::{FailurePolicy, RuntimeConfig};
use crate::error::{ReactiveError, Result};
use crate::graph::{Graph, GraphStats, SourceId, SubscriberId};
use crate::tasks::{MacrotaskQueue, TaskQueue};

/// Handle to a reactive runtime. Clones share the same graph.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

struct RuntimeInner {
    graph: RefCell<Graph>,
    config: RuntimeConfig,
    queue: Rc<dyn TaskQueue>,

    /// Sources whose last handle was dropped while the graph was borrowed.
    graveyard: RefCell<Vec<SourceId>>,
}

/// Non-owning runtime reference held by signal cells and scheduled tasks.
#[derive(Clone)]
pub(crate) struct WeakRuntime(Weak<RuntimeInner>);

impl WeakRuntime {
    pub(crate) fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(|inner| Runtime { inner })
    }
}

/// Builder for a [`Runtime`] with a custom configuration or task queue.
#[derive(Default)]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    queue: Option<Rc<dyn TaskQueue>>,
}

impl RuntimeBuilder {
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    /// Task queue for deferred reactions. Defaults to a fresh
    /// [`MacrotaskQueue`].
    pub fn queue(mut self, queue: Rc<dyn TaskQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn build(self) -> Result<Runtime> {
        self.config.validate()?;
        let queue = self
            .queue
            .unwrap_or_else(|| Rc::new(MacrotaskQueue::new()) as Rc<dyn TaskQueue>);
        Ok(Runtime::from_parts(self.config, queue))
    }
}

impl Runtime {
    /// Create a runtime with the default configuration and a private
    /// [`MacrotaskQueue`].
    pub fn new() -> Self {
        Self::from_parts(RuntimeConfig::default(), Rc::new(MacrotaskQueue::new()))
    }

    /// Create a runtime with the default configuration that schedules
    /// deferred work on `queue`.
    pub fn with_queue(queue: Rc<dyn TaskQueue>) -> Self {
        Self::from_parts(RuntimeConfig::default(), queue)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    fn from_parts(config: RuntimeConfig, queue: Rc<dyn TaskQueue>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                graph: RefCell::new(Graph::new()),
                config,
                queue,
                graveyard: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Whether two handles refer to the same runtime.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakRuntime {
        WeakRuntime(Rc::downgrade(&self.inner))
    }

    pub(crate) fn queue(&self) -> &Rc<dyn TaskQueue> {
        &self.inner.queue
    }

    pub(crate) fn graph(&self) -> Ref<'_, Graph> {
        self.inner.graph.borrow()
    }

    pub(crate) fn graph_mut(&self) -> RefMut<'_, Graph> {
        self.inner.graph.borrow_mut()
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Whether reads right now would be attributed to a subscriber.
    pub fn is_tracking(&self) -> bool {
        self.current_subscriber().is_some()
    }

    /// The subscriber currently on top of the context stack, if any.
    pub fn current_subscriber(&self) -> Option<SubscriberId> {
        self.graph().current()
    }

    /// Current context-stack depth (nesting of subscriber runs).
    pub fn depth(&self) -> usize {
        self.graph().depth()
    }

    pub fn stats(&self) -> GraphStats {
        self.graph().stats()
    }

    /// Whether `subscriber` is still in the graph (not retired).
    pub fn is_alive(&self, subscriber: SubscriberId) -> bool {
        self.graph().contains_subscriber(subscriber)
    }

    /// Number of completed runs of `subscriber`, or `None` once retired.
    pub fn run_count(&self, subscriber: SubscriberId) -> Option<u64> {
        self.graph().runs_of(subscriber)
    }

    /// Sources `subscriber` read since its last teardown.
    pub fn dependencies_of(&self, subscriber: SubscriberId) -> Vec<SourceId> {
        self.graph().deps_of(subscriber)
    }

    /// Run `f` with dependency tracking suspended. Reads inside `f` create
    /// no edges and `on_cleanup` is a no-op.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        let _ctx = ContextGuard::untracked(self);
        f()
    }

    // ------------------------------------------------------------------
    // Sources
    // ------------------------------------------------------------------

    pub(crate) fn register_source(&self) -> SourceId {
        self.graph_mut().insert_source()
    }

    /// Called when the last handle to a signal cell is dropped.
    pub(crate) fn release_source(&self, source: SourceId) {
        let orphaned = match self.inner.graph.try_borrow_mut() {
            Ok(mut graph) => graph.remove_source(source),
            Err(_) => {
                self.inner.graveyard.borrow_mut().push(source);
                return;
            }
        };

        debug!(?source, orphaned = orphaned.len(), "source released");
        for subscriber in orphaned {
            self.retire_if_unreachable(subscriber);
        }
    }

    pub(crate) fn collect_garbage(&self) {
        let buried = std::mem::take(&mut *self.inner.graveyard.borrow_mut());
        for source in buried {
            self.release_source(source);
        }
    }

    /// Record a read of `source` by the current subscriber, if any.
    pub(crate) fn track(&self, source: SourceId) {
        let mut graph = self.graph_mut();
        if let Some(subscriber) = graph.current() {
            if graph.add_edge(source, subscriber) {
                trace!(?source, ?subscriber, "edge registered");
            }
        }
    }

    pub(crate) fn subscriber_count_of(&self, source: SourceId) -> usize {
        self.graph().subscriber_count_of(source)
    }

    /// Re-run every subscriber of `source`.
    ///
    /// The subscriber set is snapshotted first: subscribers that join during
    /// the pass only affect later writes, and subscribers that leave still
    /// run in this one. Every member is held until the pass ends, so a
    /// member re-run and torn down by a sibling is not retired before its
    /// turn.
    pub(crate) fn notify(&self, source: SourceId) -> Result<()> {
        let snapshot = self.graph().snapshot(source);
        if snapshot.is_empty() {
            return Ok(());
        }
        trace!(?source, subscribers = snapshot.len(), "notifying");

        {
            let mut graph = self.graph_mut();
            for &subscriber in &snapshot {
                graph.hold(subscriber);
            }
        }

        let outcome = self.run_snapshot(&snapshot);

        {
            let mut graph = self.graph_mut();
            for &subscriber in &snapshot {
                graph.release(subscriber);
            }
        }
        for &subscriber in &snapshot {
            self.retire_if_unreachable(subscriber);
        }
        self.collect_garbage();

        outcome
    }

    fn run_snapshot(&self, snapshot: &[SubscriberId]) -> Result<()> {
        let mut first_failure = None;
        for &subscriber in snapshot {
            match self.run_subscriber(subscriber) {
                Ok(()) => {}
                Err(ReactiveError::StaleSubscriber(_)) => {
                    trace!(?subscriber, "skipping retired subscriber");
                }
                Err(err) => match self.inner.config.failure_policy {
                    FailurePolicy::Isolate => {
                        self.report(&err);
                        first_failure.get_or_insert(err);
                    }
                    FailurePolicy::Propagate => return Err(err),
                },
            }
        }

        first_failure.map_or(Ok(()), Err)
    }

    // ------------------------------------------------------------------
    // Failures
    // ------------------------------------------------------------------

    fn report(&self, err: &ReactiveError) {
        match err {
            ReactiveError::RecursionLimit { .. } => warn!(%err, "subscriber run refused"),
            _ => error!(%err, "subscriber failed; notification continues"),
        }
    }

    /// Deal with a failure that has no caller to return it to (the first
    /// run of a reaction, a deferred task).
    pub(crate) fn settle(&self, err: ReactiveError) {
        match self.inner.config.failure_policy {
            FailurePolicy::Isolate => self.report(&err),
            FailurePolicy::Propagate => std::panic::panic_any(err),
        }
    }

    /// Deal with the outcome of an infallible write. Under `Isolate` the
    /// failures were already reported by the notification pass.
    pub(crate) fn settle_write(&self, err: ReactiveError) {
        if self.inner.config.failure_policy == FailurePolicy::Propagate {
            std::panic::panic_any(err);
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Runtime");
        s.field("config", &self.inner.config);
        match self.inner.graph.try_borrow() {
            Ok(graph) => s.field("stats", &graph.stats()),
            Err(_) => s.field("stats", &"<busy>"),
        };
        s.finish()
    }
}
