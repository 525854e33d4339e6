//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which subscribers depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read while a subscriber is running, the signal
//!    registers that subscriber as a dependent. Every read while a
//!    subscriber is running is tracked; reading the same signal again in
//!    the same run is a no-op for the graph.
//!
//! 2. When a signal is written, the value is overwritten unconditionally
//!    (there is no equality check) and every current subscriber re-runs,
//!    synchronously, before the write returns.
//!
//! # Handles
//!
//! - [`Signal<T>`]: read and write
//! - [`ReadSignal<T>`]: the getter half
//! - [`WriteSignal<T>`]: the setter half
//!
//! All three are clones of one shared cell. The cell's source node is
//! removed from the graph when the last handle is dropped.
//!
//! # Memory Layout
//!
//! Each cell consists of:
//! - A source id into the runtime's graph (8 bytes)
//! - A weak runtime reference
//! - The value, behind a `RefCell`

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::runtime::WeakRuntime;
use super::Runtime;
use crate::error::Result;
use crate::graph::SourceId;

/// The shared state behind every handle of one signal.
struct SignalCell<T> {
    source: SourceId,
    runtime: WeakRuntime,
    value: RefCell<T>,
}

impl<T> SignalCell<T> {
    fn track(&self) {
        if let Some(rt) = self.runtime.upgrade() {
            rt.track(self.source);
        }
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        self.with_untracked(f)
    }

    fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    fn notify(&self) -> Result<()> {
        match self.runtime.upgrade() {
            Some(rt) => rt.notify(self.source),
            None => Ok(()),
        }
    }

    fn try_set(&self, value: T) -> Result<()> {
        // Bind the old value so it is dropped after the borrow ends.
        let previous = std::mem::replace(&mut *self.value.borrow_mut(), value);
        drop(previous);
        self.notify()
    }

    fn try_update(&self, f: impl FnOnce(&mut T)) -> Result<()> {
        f(&mut self.value.borrow_mut());
        self.notify()
    }

    fn settle(&self, result: Result<()>) {
        if let Err(err) = result {
            if let Some(rt) = self.runtime.upgrade() {
                rt.settle_write(err);
            }
        }
    }

    fn subscriber_count(&self) -> usize {
        self.runtime
            .upgrade()
            .map(|rt| rt.subscriber_count_of(self.source))
            .unwrap_or(0)
    }
}

impl<T> Drop for SignalCell<T> {
    fn drop(&mut self) {
        if let Some(rt) = self.runtime.upgrade() {
            rt.release_source(self.source);
        }
    }
}

/// A reactive signal holding a value of type `T`.
///
/// # Example
///
/// ```rust,ignore
/// let count = runtime.create_signal(0);
///
/// // Read the value
/// let value = count.get();
///
/// // Update the value (re-runs subscribers)
/// count.set(5);
/// ```
pub struct Signal<T> {
    cell: Rc<SignalCell<T>>,
}

/// The read half of a signal.
pub struct ReadSignal<T> {
    cell: Rc<SignalCell<T>>,
}

/// The write half of a signal.
pub struct WriteSignal<T> {
    cell: Rc<SignalCell<T>>,
}

impl<T: 'static> Signal<T> {
    pub(crate) fn new(runtime: &Runtime, value: T) -> Self {
        Self {
            cell: Rc::new(SignalCell {
                source: runtime.register_source(),
                runtime: runtime.downgrade(),
                value: RefCell::new(value),
            }),
        }
    }

    /// The signal's source id in the graph.
    pub fn id(&self) -> SourceId {
        self.cell.source
    }

    /// Get the current value.
    ///
    /// If called while a subscriber is running, also registers that
    /// subscriber as a dependent.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.cell.with(T::clone)
    }

    /// Borrow the current value. Tracked like [`get`](Self::get).
    ///
    /// Writing this signal from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with(f)
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.cell.with_untracked(T::clone)
    }

    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with_untracked(f)
    }

    /// Set a new value and re-run every subscriber.
    ///
    /// Subscriber failures are handled per the runtime's `FailurePolicy`.
    pub fn set(&self, value: T) {
        self.cell.settle(self.cell.try_set(value));
    }

    /// Set a new value, returning the first subscriber failure.
    pub fn try_set(&self, value: T) -> Result<()> {
        self.cell.try_set(value)
    }

    /// Mutate the value in place, then re-run every subscriber.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.cell.settle(self.cell.try_update(f));
    }

    pub fn try_update(&self, f: impl FnOnce(&mut T)) -> Result<()> {
        self.cell.try_update(f)
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.cell.subscriber_count()
    }

    /// Split into getter and setter halves sharing this cell.
    pub fn split(self) -> (ReadSignal<T>, WriteSignal<T>) {
        (
            ReadSignal {
                cell: Rc::clone(&self.cell),
            },
            WriteSignal { cell: self.cell },
        )
    }

    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            cell: Rc::clone(&self.cell),
        }
    }

    pub fn write_only(&self) -> WriteSignal<T> {
        WriteSignal {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: 'static> ReadSignal<T> {
    pub fn id(&self) -> SourceId {
        self.cell.source
    }

    /// Get the current value, tracked.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.cell.with(T::clone)
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with(f)
    }

    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.cell.with_untracked(T::clone)
    }

    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with_untracked(f)
    }

    pub fn subscriber_count(&self) -> usize {
        self.cell.subscriber_count()
    }
}

impl<T: 'static> WriteSignal<T> {
    pub fn id(&self) -> SourceId {
        self.cell.source
    }

    /// Overwrite the value and re-run every subscriber.
    pub fn set(&self, value: T) {
        self.cell.settle(self.cell.try_set(value));
    }

    pub fn try_set(&self, value: T) -> Result<()> {
        self.cell.try_set(value)
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.cell.settle(self.cell.try_update(f));
    }

    pub fn try_update(&self, f: impl FnOnce(&mut T)) -> Result<()> {
        self.cell.try_update(f)
    }
}

impl Signal<bool> {
    /// Flip the value.
    pub fn toggle(&self) {
        self.update(|v| *v = !*v);
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.cell.source)
            .field("value", &self.cell.value.try_borrow().ok())
            .field("subscriber_count", &self.cell.subscriber_count())
            .finish()
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadSignal")
            .field("id", &self.cell.source)
            .field("value", &self.cell.value.try_borrow().ok())
            .finish()
    }
}

impl<T> fmt::Debug for WriteSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteSignal")
            .field("id", &self.cell.source)
            .finish()
    }
}

impl Runtime {
    /// Create a signal with the given initial value.
    pub fn create_signal<T: 'static>(&self, value: T) -> Signal<T> {
        Signal::new(self, value)
    }

    /// Create a signal and return its getter and setter halves.
    pub fn create_state<T: 'static>(&self, value: T) -> (ReadSignal<T>, WriteSignal<T>) {
        self.create_signal(value).split()
    }

    /// Create a signal holding `T::default()`. This is the "no initial
    /// value" form; use `Option<T>` when absence must be observable.
    pub fn create_state_default<T: Default + 'static>(&self) -> (ReadSignal<T>, WriteSignal<T>) {
        self.create_state(T::default())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
