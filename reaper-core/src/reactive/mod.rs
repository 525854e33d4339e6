//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, reactions,
//! memos and deferred reactions. These primitives form the foundation of
//! Reaper's fine-grained reactivity.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! while a subscriber is running, the signal registers that subscriber as a
//! dependent. When the signal is written, every dependent re-runs before the
//! write returns.
//!
//! ## Reactions
//!
//! A Reaction is a side-effecting computation that runs once when created
//! and again whenever a signal it read on its latest run is written.
//!
//! ## Memos
//!
//! A Memo is a signal kept current by a reaction. It recomputes eagerly,
//! once per change to its dependencies, and is itself a dependency for
//! other subscribers.
//!
//! ## Deferred Reactions
//!
//! A Deferred Reaction runs its work on a later turn of a task queue, under
//! the identity of its subscriber. Bursts of writes before that turn
//! collapse into a single run.
//!
//! # Implementation Notes
//!
//! Dependencies are discovered automatically: a context stack records which
//! subscriber is running, and a read attributes to the top of that stack.
//! Every run first tears down the edges and cleanups of the previous run,
//! so a subscriber's dependencies always reflect what its latest run read.

mod context;
mod deferred;
mod global;
mod memo;
mod reaction;
mod runtime;
mod signal;
mod subscriber;

pub use global::{
    create_deferred_reaction, create_memo, create_reaction, create_signal, create_state,
    create_state_default, on_cleanup, pending_deferred, run_deferred_turn,
    run_deferred_until_idle, untrack,
};
pub use memo::Memo;
pub use runtime::{Runtime, RuntimeBuilder};
pub use signal::{ReadSignal, Signal, WriteSignal};
