//! Dependency Graph
//!
//! This module stores the edges between signal cells and the computations
//! that read them.
//!
//! # Overview
//!
//! The graph is bipartite:
//!
//! - Sources represent signal cells (including the cell behind a memo)
//! - Subscribers represent reactions, memos and deferred reactions
//! - An edge exists between a source and a subscriber iff the subscriber
//!   read the source during its most recent run
//!
//! # Design Decisions
//!
//! 1. Both node kinds live in generational arenas (`slotmap`) and refer to
//!    each other by id, so the mutual reference between a signal's
//!    subscriber set and a subscriber's dependency set needs no reference
//!    counting and cannot dangle.
//!
//! 2. Edge sets are `IndexSet`s: membership is deduplicated and iteration
//!    follows insertion order, which is the notification order.
//!
//! 3. The context stack lives next to the arenas so pushing a frame and
//!    registering an edge share one borrow.

mod arena;
mod node;

pub use arena::GraphStats;
pub use node::{SourceId, SubscriberId};

pub(crate) use arena::Graph;
pub(crate) use node::Cleanup;
