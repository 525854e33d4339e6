//! Graph Nodes
//!
//! This module defines the two node types that live in the reactive graph:
//! sources (one per signal cell) and subscribers (one per reaction, memo or
//! deferred reaction).

use std::fmt;
use std::rc::Rc;

use indexmap::IndexSet;
use slotmap::new_key_type;
use smallvec::SmallVec;

new_key_type! {
    /// Identifier of a source (signal cell) in the graph arena.
    pub struct SourceId;

    /// Identifier of a subscriber in the graph arena.
    ///
    /// The id is stable across re-runs of the subscriber. Once the
    /// subscriber has been retired the id is stale, and the arena's
    /// generation check makes every lookup with it miss.
    pub struct SubscriberId;
}

/// The runner of a subscriber. Shared so it can be invoked without
/// holding a borrow of the graph.
pub(crate) type Body = Rc<dyn Fn()>;

/// A callback registered with `on_cleanup` during a subscriber run.
pub(crate) type Cleanup = Box<dyn FnOnce()>;

/// Cleanups accumulated during one run, in registration order.
pub(crate) type Cleanups = SmallVec<[Cleanup; 2]>;

/// A source node.
///
/// Holds the ordered set of subscribers that read the source during their
/// most recent run. Insertion order is notification order.
#[derive(Debug, Default)]
pub(crate) struct SourceNode {
    pub(crate) subscribers: IndexSet<SubscriberId>,
}

/// A subscriber node.
pub(crate) struct SubscriberNode {
    /// What to run on every notification.
    pub(crate) body: Body,

    /// Sources read since the last teardown.
    pub(crate) deps: IndexSet<SourceId>,

    /// Cleanups registered since the last teardown.
    pub(crate) cleanups: Cleanups,

    /// Reasons to stay alive besides edges: an in-progress run or a
    /// pending deferred task each hold the subscriber once.
    pub(crate) holds: u32,

    /// Completed runs, including the first one.
    pub(crate) runs: u64,
}

impl SubscriberNode {
    pub(crate) fn new(body: Body) -> Self {
        Self {
            body,
            deps: IndexSet::new(),
            cleanups: SmallVec::new(),
            holds: 0,
            runs: 0,
        }
    }
}

impl fmt::Debug for SubscriberNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberNode")
            .field("deps", &self.deps)
            .field("cleanups", &self.cleanups.len())
            .field("holds", &self.holds)
            .field("runs", &self.runs)
            .finish()
    }
}
