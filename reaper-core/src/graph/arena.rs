//! Graph Arena
//!
//! The arena owns every source and subscriber node plus the context stack.
//! Edges are stored on both sides as ids: a source keeps the set of its
//! subscribers, a subscriber keeps the set of sources it read. Teardown
//! clears both sides in one pass.
//!
//! Nothing in here calls user code. Methods that remove user data (bodies,
//! cleanups) hand it back to the caller so it can be dropped or invoked
//! after the arena borrow is released.

use serde::Serialize;
use slotmap::SlotMap;
use smallvec::SmallVec;

use super::node::{Body, Cleanup, Cleanups, SourceId, SourceNode, SubscriberId, SubscriberNode};

/// Counters describing the current shape of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GraphStats {
    /// Live sources.
    pub sources: usize,
    /// Live subscribers.
    pub subscribers: usize,
    /// Source-to-subscriber edges.
    pub edges: usize,
}

/// The reactive graph: sources, subscribers and the context stack.
#[derive(Debug, Default)]
pub(crate) struct Graph {
    sources: SlotMap<SourceId, SourceNode>,
    subscribers: SlotMap<SubscriberId, SubscriberNode>,

    /// Currently executing subscribers, innermost last. A `None` frame is an
    /// untracked region: reads inside it attribute to nobody.
    stack: Vec<Option<SubscriberId>>,
}

impl Graph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Sources
    // ------------------------------------------------------------------

    pub(crate) fn insert_source(&mut self) -> SourceId {
        self.sources.insert(SourceNode::default())
    }

    /// Remove a source and every edge pointing at it.
    ///
    /// Returns the subscribers that lost their last dependency; they are
    /// candidates for retirement.
    pub(crate) fn remove_source(&mut self, id: SourceId) -> SmallVec<[SubscriberId; 4]> {
        let mut orphaned = SmallVec::new();
        let Some(node) = self.sources.remove(id) else {
            return orphaned;
        };

        for subscriber_id in node.subscribers {
            if let Some(subscriber) = self.subscribers.get_mut(subscriber_id) {
                subscriber.deps.shift_remove(&id);
                if subscriber.deps.is_empty() {
                    orphaned.push(subscriber_id);
                }
            }
        }
        orphaned
    }

    #[cfg(test)]
    pub(crate) fn contains_source(&self, id: SourceId) -> bool {
        self.sources.contains_key(id)
    }

    /// Copy of a source's subscriber set, in notification order.
    pub(crate) fn snapshot(&self, id: SourceId) -> SmallVec<[SubscriberId; 4]> {
        self.sources
            .get(id)
            .map(|node| node.subscribers.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn subscriber_count_of(&self, id: SourceId) -> usize {
        self.sources
            .get(id)
            .map(|node| node.subscribers.len())
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Subscribers
    // ------------------------------------------------------------------

    pub(crate) fn insert_subscriber(&mut self, body: Body) -> SubscriberId {
        self.subscribers.insert(SubscriberNode::new(body))
    }

    pub(crate) fn contains_subscriber(&self, id: SubscriberId) -> bool {
        self.subscribers.contains_key(id)
    }

    pub(crate) fn body(&self, id: SubscriberId) -> Option<Body> {
        self.subscribers.get(id).map(|node| Body::clone(&node.body))
    }

    pub(crate) fn deps_of(&self, id: SubscriberId) -> Vec<SourceId> {
        self.subscribers
            .get(id)
            .map(|node| node.deps.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn runs_of(&self, id: SubscriberId) -> Option<u64> {
        self.subscribers.get(id).map(|node| node.runs)
    }

    pub(crate) fn record_run(&mut self, id: SubscriberId) {
        if let Some(node) = self.subscribers.get_mut(id) {
            node.runs += 1;
        }
    }

    /// Register an edge between `source` and `subscriber`.
    ///
    /// Idempotent on both sides. Returns `true` if the edge is new.
    pub(crate) fn add_edge(&mut self, source: SourceId, subscriber: SubscriberId) -> bool {
        let (Some(source_node), Some(subscriber_node)) = (
            self.sources.get_mut(source),
            self.subscribers.get_mut(subscriber),
        ) else {
            return false;
        };

        let added = source_node.subscribers.insert(subscriber);
        subscriber_node.deps.insert(source);
        added
    }

    /// Teardown: remove `subscriber` from every source it depends on and
    /// hand back the cleanups registered during its last run.
    ///
    /// Returns `None` if the subscriber is stale.
    pub(crate) fn take_edges(&mut self, subscriber: SubscriberId) -> Option<Cleanups> {
        let node = self.subscribers.get_mut(subscriber)?;

        for source in node.deps.drain(..) {
            if let Some(source_node) = self.sources.get_mut(source) {
                source_node.subscribers.shift_remove(&subscriber);
            }
        }
        Some(std::mem::take(&mut node.cleanups))
    }

    /// Append a cleanup to a subscriber. A stale subscriber gives the
    /// cleanup back.
    pub(crate) fn add_cleanup(
        &mut self,
        subscriber: SubscriberId,
        cleanup: Cleanup,
    ) -> Result<(), Cleanup> {
        match self.subscribers.get_mut(subscriber) {
            Some(node) => {
                node.cleanups.push(cleanup);
                Ok(())
            }
            None => Err(cleanup),
        }
    }

    pub(crate) fn hold(&mut self, id: SubscriberId) {
        if let Some(node) = self.subscribers.get_mut(id) {
            node.holds += 1;
        }
    }

    pub(crate) fn release(&mut self, id: SubscriberId) {
        if let Some(node) = self.subscribers.get_mut(id) {
            node.holds = node.holds.saturating_sub(1);
        }
    }

    /// A subscriber nothing can reach any more: no edges, no holds, not
    /// executing.
    pub(crate) fn is_unreachable(&self, id: SubscriberId) -> bool {
        self.subscribers.get(id).is_some_and(|node| {
            node.deps.is_empty() && node.holds == 0 && !self.stack.contains(&Some(id))
        })
    }

    /// Remove an unreachable subscriber. The node is returned so its body
    /// and cleanups are dropped outside the arena borrow.
    pub(crate) fn retire(&mut self, id: SubscriberId) -> Option<SubscriberNode> {
        if self.is_unreachable(id) {
            self.subscribers.remove(id)
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Context stack
    // ------------------------------------------------------------------

    pub(crate) fn push(&mut self, frame: Option<SubscriberId>) {
        self.stack.push(frame);
    }

    pub(crate) fn pop(&mut self) -> Option<Option<SubscriberId>> {
        self.stack.pop()
    }

    /// The subscriber reads are currently attributed to.
    pub(crate) fn current(&self) -> Option<SubscriberId> {
        self.stack.last().copied().flatten()
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub(crate) fn stats(&self) -> GraphStats {
        GraphStats {
            sources: self.sources.len(),
            subscribers: self.subscribers.len(),
            edges: self.sources.values().map(|s| s.subscribers.len()).sum(),
        }
    }
}
