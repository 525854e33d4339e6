//! Reaper Core
//!
//! This crate provides the core runtime for the Reaper fine-grained reactive
//! state engine. It implements:
//!
//! - Reactive primitives (signals, reactions, memos, deferred reactions)
//! - A dependency graph discovered by observing reads, rebuilt on every run
//! - Cancellable task queues for deferred work
//! - Bindings for view layers that accept either values or derivations
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: the runtime and its primitives
//! - `graph`: generational arenas of sources and subscribers, and the
//!   context stack
//! - `tasks`: the task queue abstraction and its implementations
//! - `binding`: `Literal | Derived` bindings for view layers
//! - `config` / `error`: runtime configuration and error types
//!
//! # Example
//!
//! ```rust,ignore
//! use reaper_core::reactive::{create_memo, create_reaction, create_state};
//!
//! // Create a signal
//! let (count, set_count) = create_state(0);
//!
//! // Create a derived value
//! let c = count.clone();
//! let doubled = create_memo(move || c.get() * 2);
//!
//! // Create a reaction
//! create_reaction(move || {
//!     println!("Count: {}, Doubled: {}", count.get(), doubled.get());
//! });
//!
//! // Update the signal
//! set_count.set(5);
//! // Reaction runs before `set` returns, prints: "Count: 5, Doubled: 10"
//! ```
//!
//! `Memo::get` panics when the computation has never completed (its first
//! run failed, or the memo is read inside its own computation). Reach for
//! `Memo::try_get` where that can happen.

pub mod binding;
pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod tasks;

pub use binding::{bind_two_way, Binding};
pub use config::{FailurePolicy, RuntimeConfig};
pub use error::{ReactiveError, Result};
pub use graph::{GraphStats, SourceId, SubscriberId};
pub use reactive::{Memo, ReadSignal, Runtime, RuntimeBuilder, Signal, WriteSignal};
pub use tasks::{LocalTaskQueue, MacrotaskQueue, TaskHandle, TaskQueue};
